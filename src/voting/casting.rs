use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{
    candidate::{Candidate, CandidateId},
    mongodb::Id,
    user::{User, UserId},
    vote::{NewVote, Vote, VoterKey},
};
use crate::store::{CastTransaction, Store};

use super::{seal::VoterSeal, tally::TallyCache};

/// Enforces one vote per user per term and records votes in the ledger.
pub struct CastingService<S> {
    store: Arc<S>,
    seal: VoterSeal,
    cache: Option<Arc<TallyCache>>,
}

impl<S: Store> CastingService<S> {
    pub fn new(store: Arc<S>, seal: VoterSeal, cache: Option<Arc<TallyCache>>) -> Self {
        Self { store, seal, cache }
    }

    /// The ledger key for a user.
    pub fn voter_key(&self, user: &UserId) -> VoterKey {
        self.seal.seal(user)
    }

    /// Cast `user_id`'s vote for `candidate_id` in the active term.
    ///
    /// The ledger append and the user's `has_voted` flag are written in one
    /// transaction; on any error neither is. This may block on storage, so
    /// callers must not hold other locks across it. A retry after an
    /// unacknowledged success yields [`Error::AlreadyVoted`].
    ///
    /// Against a store that detects conflicts optimistically, a cast racing
    /// another cast by the same voter may fail with
    /// [`Error::StorageUnavailable`] instead, when the winner has not yet
    /// committed at the time of the re-check. The ledger still holds at most
    /// one vote, and a retry yields [`Error::AlreadyVoted`].
    ///
    /// The district tally is invalidated whenever the transaction may have
    /// reached commit, including when this future is dropped mid-commit.
    pub async fn cast_vote(&self, user_id: &UserId, candidate_id: &CandidateId) -> Result<Vote> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::Unauthenticated(format!("Unknown user {user_id}")))?;
        let candidate = self
            .store
            .get_candidate(candidate_id)
            .await?
            .ok_or_else(|| Error::CandidateNotFound(candidate_id.clone()))?;
        if candidate.district_id != user.district_id {
            debug!("Rejected cast for {candidate_id}: district mismatch");
            return Err(Error::DistrictMismatch {
                candidate: candidate.id,
                candidate_district: candidate.district_id,
                voter_district: user.district_id,
            });
        }
        let term = self
            .store
            .active_term(Utc::now().date_naive())
            .await?
            .ok_or(Error::NoActiveTerm)?;
        if candidate.term_id != term.id {
            debug!("Rejected cast for {candidate_id}: not standing in term {}", term.id);
            return Err(Error::TermMismatch {
                candidate: candidate.id,
                candidate_term: candidate.term_id,
                active_term: term.id,
            });
        }

        let voter = self.voter_key(&user.id);
        let vote = match self.record(&user, &candidate, &voter, term.id).await {
            Ok(vote) => vote,
            Err(Error::AlreadyVoted(term_id) | Error::DuplicateVote(term_id)) => {
                // The vote on record may be one whose commit we never saw.
                self.invalidate(candidate.district_id, term_id);
                return Err(Error::AlreadyVoted(term_id));
            }
            Err(Error::StorageUnavailable(reason)) => {
                self.invalidate(candidate.district_id, term.id);
                // A concurrent cast by the same voter may have won; report that
                // rather than a retryable failure when it is visible.
                if let Ok(true) = self.store.exists_vote_for(&voter, term.id).await {
                    return Err(Error::AlreadyVoted(term.id));
                }
                warn!("Cast for candidate {candidate_id} failed transiently: {reason}");
                return Err(Error::StorageUnavailable(reason));
            }
            Err(e) => return Err(e),
        };

        info!(
            "Vote {} cast for candidate {} in term {}",
            vote.id, vote.candidate_id, vote.term_id
        );
        Ok(vote)
    }

    /// The transactional part of a cast.
    async fn record(
        &self,
        user: &User,
        candidate: &Candidate,
        voter: &VoterKey,
        term: Id,
    ) -> Result<Vote> {
        let mut txn = self.store.begin().await?;
        if txn.exists_vote_for(voter, term).await? {
            debug!("Rejected cast for {}: already voted in term {term}", candidate.id);
            return Err(Error::AlreadyVoted(term));
        }
        let vote = txn
            .append(NewVote::new(voter.clone(), candidate.id.clone(), term))
            .await?;
        txn.set_has_voted(&user.id, true).await?;
        // From here on the vote may land whether or not we see the outcome.
        let _invalidate = InvalidateOnDrop {
            cache: self.cache.as_deref(),
            district: candidate.district_id,
            term,
        };
        txn.commit().await?;
        Ok(vote)
    }

    fn invalidate(&self, district: Id, term: Id) {
        if let Some(cache) = &self.cache {
            cache.invalidate(district, term);
        }
    }
}

/// Drops a cached district tally when it goes out of scope, so a cast that is
/// cancelled while committing still invalidates it.
struct InvalidateOnDrop<'a> {
    cache: Option<&'a TallyCache>,
    district: Id,
    term: Id,
}

impl Drop for InvalidateOnDrop<'_> {
    fn drop(&mut self) {
        if let Some(cache) = self.cache {
            cache.invalidate(self.district, self.term);
        }
    }
}
