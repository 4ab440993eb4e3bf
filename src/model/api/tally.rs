use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::candidate::CandidateId;
use crate::voting::DistrictTally;

use super::ApiId;

/// Votes for a single candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTallyDesc {
    pub candidate_id: CandidateId,
    pub votes: u64,
}

/// Votes for every candidate of a district in one term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictTallyDesc {
    pub district_id: ApiId,
    pub term_id: ApiId,
    pub counts: BTreeMap<CandidateId, u64>,
}

impl From<DistrictTally> for DistrictTallyDesc {
    fn from(tally: DistrictTally) -> Self {
        Self {
            district_id: tally.district_id.into(),
            term_id: tally.term_id.into(),
            counts: tally.counts,
        }
    }
}
