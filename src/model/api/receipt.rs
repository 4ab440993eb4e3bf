use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{candidate::CandidateId, vote::Vote};

use super::ApiId;

/// What a voter gets back for a successful cast. Deliberately carries no
/// voter identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub candidate_id: CandidateId,
    pub term_id: ApiId,
    pub cast_at: DateTime<Utc>,
}

impl From<Vote> for Receipt {
    fn from(vote: Vote) -> Self {
        Self {
            candidate_id: vote.candidate_id.clone(),
            term_id: vote.term_id.into(),
            cast_at: vote.cast_at,
        }
    }
}
