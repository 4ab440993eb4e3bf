//! The vote-casting and tallying core.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{Error, Result};
use crate::model::{
    candidate::{Candidate, CandidateId},
    mongodb::Id,
    user::{User, UserId},
    vote::Vote,
};
use crate::store::Store;

mod casting;
mod seal;
mod tally;

pub use casting::CastingService;
pub use seal::{HmacSha256, VoterSeal};
pub use tally::{DistrictTally, TallyCache, TallyEngine};

/// What the presentation layer may ask of the core.
#[rocket::async_trait]
pub trait BallotBox: Send + Sync {
    async fn cast_vote(&self, user: &UserId, candidate: &CandidateId) -> Result<Vote>;

    async fn voter_status(&self, user: &UserId) -> Result<VoterStatus>;

    /// Candidates the user may vote for in the active term.
    async fn candidates_for(&self, user: &UserId) -> Result<Vec<Candidate>>;

    async fn candidate(&self, id: &CandidateId) -> Result<Candidate>;

    async fn count_votes(&self, candidate: &CandidateId) -> Result<u64>;

    /// Tally for a district, in the given term or else the active one.
    async fn counts_by_district(&self, district: Id, term: Option<Id>) -> Result<DistrictTally>;
}

/// A user's standing as seen by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoterStatus {
    pub user: User,
    /// Whether the ledger holds this user's vote for the active term.
    pub voted_in_active_term: bool,
}

/// The casting service and tally engine over one store.
pub struct VotingCore<S> {
    store: Arc<S>,
    casting: CastingService<S>,
    tally: TallyEngine<S>,
}

impl<S: Store> VotingCore<S> {
    pub fn new(store: Arc<S>, seal: VoterSeal, tally_cache: bool) -> Self {
        let cache = tally_cache.then(|| Arc::new(TallyCache::new()));
        Self {
            casting: CastingService::new(store.clone(), seal, cache.clone()),
            tally: TallyEngine::new(store.clone(), cache),
            store,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    async fn user(&self, id: &UserId) -> Result<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| Error::Unauthenticated(format!("Unknown user {id}")))
    }
}

#[rocket::async_trait]
impl<S: Store> BallotBox for VotingCore<S> {
    async fn cast_vote(&self, user: &UserId, candidate: &CandidateId) -> Result<Vote> {
        self.casting.cast_vote(user, candidate).await
    }

    async fn voter_status(&self, id: &UserId) -> Result<VoterStatus> {
        let user = self.user(id).await?;
        let voted_in_active_term = match self.store.active_term(Utc::now().date_naive()).await? {
            Some(term) => {
                self.store
                    .exists_vote_for(&self.casting.voter_key(id), term.id)
                    .await?
            }
            None => false,
        };
        Ok(VoterStatus {
            user,
            voted_in_active_term,
        })
    }

    async fn candidates_for(&self, id: &UserId) -> Result<Vec<Candidate>> {
        let user = self.user(id).await?;
        let term = self
            .store
            .active_term(Utc::now().date_naive())
            .await?
            .ok_or(Error::NoActiveTerm)?;
        self.store
            .candidates_in_district(user.district_id, term.id)
            .await
    }

    async fn candidate(&self, id: &CandidateId) -> Result<Candidate> {
        self.store
            .get_candidate(id)
            .await?
            .ok_or_else(|| Error::CandidateNotFound(id.clone()))
    }

    async fn count_votes(&self, candidate: &CandidateId) -> Result<u64> {
        self.tally.count_votes(candidate).await
    }

    async fn counts_by_district(&self, district: Id, term: Option<Id>) -> Result<DistrictTally> {
        match term {
            Some(term) => self.tally.counts_by_district_in(district, term).await,
            None => self.tally.counts_by_district(district).await,
        }
    }
}
