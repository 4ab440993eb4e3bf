use serde::{Deserialize, Serialize};

use crate::model::candidate::{Candidate, CandidateId};

use super::ApiId;

/// API-friendly representation of a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDesc {
    pub id: CandidateId,
    pub name: String,
    pub district_id: ApiId,
    pub term_id: ApiId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<Candidate> for CandidateDesc {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id,
            name: candidate.name,
            district_id: candidate.district_id.into(),
            term_id: candidate.term_id.into(),
            description: candidate.description,
        }
    }
}
