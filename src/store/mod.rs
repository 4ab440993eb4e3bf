//! Storage seams of the voting core.
//!
//! The identity directory and candidate registry are read-only from the core's
//! point of view. The vote ledger is the only shared mutable resource, and the
//! only way to write to it is through a [`CastTransaction`], which also carries
//! the single permitted write path to a user's `has_voted` flag.

use chrono::NaiveDate;

use crate::error::Result;
use crate::model::{
    candidate::{Candidate, CandidateId},
    district::District,
    mongodb::Id,
    term::Term,
    user::{User, UserId},
    vote::{NewVote, Vote, VoterKey},
};

mod memory;
mod mongo;

pub use memory::{MemoryStore, MemoryTransaction};
pub use mongo::{MongoStore, MongoTransaction};

/// Lookups served by the identity collaborator.
#[rocket::async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;
}

/// Lookups served by the candidate/reference-data collaborator.
#[rocket::async_trait]
pub trait CandidateRegistry: Send + Sync {
    async fn get_candidate(&self, id: &CandidateId) -> Result<Option<Candidate>>;

    async fn get_district(&self, id: Id) -> Result<Option<District>>;

    async fn get_term(&self, id: Id) -> Result<Option<Term>>;

    /// The term active on the given day, if any.
    async fn active_term(&self, day: NaiveDate) -> Result<Option<Term>>;

    /// Candidates standing in a district for a term, ordered by candidate ID.
    async fn candidates_in_district(&self, district: Id, term: Id) -> Result<Vec<Candidate>>;
}

/// Raw ledger counts for one candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerCount {
    /// Number of ledger rows naming the candidate.
    pub rows: u64,
    /// Number of distinct voters among those rows.
    pub distinct_voters: u64,
}

/// Append-only store of cast votes.
#[rocket::async_trait]
pub trait VoteLedger: Send + Sync {
    type Transaction: CastTransaction;

    /// Open a unit of work. Nothing it does is visible until
    /// [`CastTransaction::commit`]; dropping it discards everything.
    async fn begin(&self) -> Result<Self::Transaction>;

    async fn exists_vote_for(&self, voter: &VoterKey, term: Id) -> Result<bool>;

    /// Row and distinct-voter counts for a candidate, straight from the ledger.
    async fn count_for(&self, candidate: &CandidateId) -> Result<LedgerCount>;

    async fn count_distinct_voters_for(&self, candidate: &CandidateId) -> Result<u64> {
        Ok(self.count_for(candidate).await?.distinct_voters)
    }

    /// Voters holding more than one ledger row in the given term. Always
    /// empty unless the ledger has been corrupted.
    async fn duplicate_voters(&self, term: Id) -> Result<Vec<VoterKey>>;
}

/// The atomic unit of work behind a vote cast.
#[rocket::async_trait]
pub trait CastTransaction: Send + Sized {
    async fn exists_vote_for(&mut self, voter: &VoterKey, term: Id) -> Result<bool>;

    /// Append a vote. Fails with [`Error::DuplicateVote`] when the storage
    /// engine's `(voter, term)` uniqueness constraint rejects it.
    ///
    /// [`Error::DuplicateVote`]: crate::error::Error::DuplicateVote
    async fn append(&mut self, vote: NewVote) -> Result<Vote>;

    async fn set_has_voted(&mut self, user: &UserId, voted: bool) -> Result<()>;

    async fn commit(self) -> Result<()>;
}

/// Everything the voting core needs from storage.
pub trait Store: IdentityDirectory + CandidateRegistry + VoteLedger + 'static {}

impl<T> Store for T where T: IdentityDirectory + CandidateRegistry + VoteLedger + 'static {}
