use serde::{Deserialize, Serialize};

use crate::model::user::UserId;
use crate::voting::VoterStatus;

use super::ApiId;

/// API-friendly view of the calling user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterDesc {
    pub id: UserId,
    pub name: String,
    pub district_id: ApiId,
    pub has_voted: bool,
    /// Read from the ledger, unlike `has_voted`.
    pub voted_in_active_term: bool,
}

impl From<VoterStatus> for VoterDesc {
    fn from(status: VoterStatus) -> Self {
        Self {
            id: status.user.id,
            name: status.user.name,
            district_id: status.user.district_id.into(),
            has_voted: status.user.has_voted,
            voted_in_active_term: status.voted_in_active_term,
        }
    }
}
