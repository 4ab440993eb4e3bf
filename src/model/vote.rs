use std::fmt::{Display, Formatter};
use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{candidate::CandidateId, mongodb::Id};

/// How a voter is identified inside the ledger.
///
/// Depending on configuration this is either the plain user ID or a keyed
/// digest of it; the ledger never needs to know which.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoterKey(String);

impl VoterKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for VoterKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Core vote data, as appended to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub voter: VoterKey,
    pub candidate_id: CandidateId,
    pub term_id: Id,
    /// Set when the vote is created, never updated.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

impl VoteCore {
    /// Create a vote stamped with the current time.
    ///
    /// The timestamp is truncated to milliseconds, the resolution the ledger
    /// persists.
    pub fn new(voter: VoterKey, candidate_id: CandidateId, term_id: Id) -> Self {
        let now = Utc::now();
        let cast_at = DateTime::<Utc>::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);
        Self {
            voter,
            candidate_id,
            term_id,
            cast_at,
        }
    }
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the ledger, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Vote {
    pub fn from_new(id: Id, vote: NewVote) -> Self {
        Self { id, vote }
    }
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}
