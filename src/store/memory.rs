use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use rocket::tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{Error, Result};
use crate::model::{
    candidate::{Candidate, CandidateId},
    district::District,
    mongodb::Id,
    term::Term,
    user::{User, UserId},
    vote::{NewVote, Vote, VoterKey},
};

use super::{CandidateRegistry, CastTransaction, IdentityDirectory, LedgerCount, VoteLedger};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    districts: HashMap<Id, District>,
    terms: Vec<Term>,
    candidates: BTreeMap<CandidateId, Candidate>,
    votes: Vec<Vote>,
    /// The `(voter, term)` uniqueness constraint.
    vote_keys: HashSet<(VoterKey, Id)>,
}

/// A process-local store, for tests and local development.
///
/// A cast transaction holds the store lock from `begin` until commit or drop,
/// so transactions are serializable. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.state.lock().await.users.insert(user.id.clone(), user);
    }

    pub async fn insert_district(&self, district: District) {
        self.state.lock().await.districts.insert(district.id, district);
    }

    pub async fn insert_term(&self, term: Term) {
        self.state.lock().await.terms.push(term);
    }

    pub async fn insert_candidate(&self, candidate: Candidate) {
        self.state
            .lock()
            .await
            .candidates
            .insert(candidate.id.clone(), candidate);
    }

    /// A snapshot of every ledger row, in append order.
    pub async fn votes(&self) -> Vec<Vote> {
        self.state.lock().await.votes.clone()
    }

    /// Write a row while bypassing the uniqueness constraint, to simulate a
    /// corrupted ledger.
    #[cfg(test)]
    pub(crate) async fn append_unchecked(&self, vote: NewVote) {
        self.state
            .lock()
            .await
            .votes
            .push(Vote::from_new(Id::new(), vote));
    }
}

#[rocket::async_trait]
impl IdentityDirectory for MemoryStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.get(id).cloned())
    }
}

#[rocket::async_trait]
impl CandidateRegistry for MemoryStore {
    async fn get_candidate(&self, id: &CandidateId) -> Result<Option<Candidate>> {
        Ok(self.state.lock().await.candidates.get(id).cloned())
    }

    async fn get_district(&self, id: Id) -> Result<Option<District>> {
        Ok(self.state.lock().await.districts.get(&id).cloned())
    }

    async fn get_term(&self, id: Id) -> Result<Option<Term>> {
        let state = self.state.lock().await;
        Ok(state.terms.iter().find(|term| term.id == id).cloned())
    }

    async fn active_term(&self, day: NaiveDate) -> Result<Option<Term>> {
        let state = self.state.lock().await;
        Ok(Term::active_on(&state.terms, day).cloned())
    }

    async fn candidates_in_district(&self, district: Id, term: Id) -> Result<Vec<Candidate>> {
        let state = self.state.lock().await;
        Ok(state
            .candidates
            .values()
            .filter(|c| c.district_id == district && c.term_id == term)
            .cloned()
            .collect())
    }
}

#[rocket::async_trait]
impl VoteLedger for MemoryStore {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction> {
        Ok(MemoryTransaction {
            state: Arc::clone(&self.state).lock_owned().await,
            votes: Vec::new(),
            voted_flags: Vec::new(),
        })
    }

    async fn exists_vote_for(&self, voter: &VoterKey, term: Id) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(state.vote_keys.contains(&(voter.clone(), term)))
    }

    async fn count_for(&self, candidate: &CandidateId) -> Result<LedgerCount> {
        let state = self.state.lock().await;
        let rows = state.votes.iter().filter(|v| &v.candidate_id == candidate);
        let voters = rows.clone().map(|v| &v.voter).collect::<HashSet<_>>();
        Ok(LedgerCount {
            rows: rows.count() as u64,
            distinct_voters: voters.len() as u64,
        })
    }

    async fn duplicate_voters(&self, term: Id) -> Result<Vec<VoterKey>> {
        let state = self.state.lock().await;
        let mut rows_per_voter: BTreeMap<&VoterKey, u64> = BTreeMap::new();
        for vote in state.votes.iter().filter(|v| v.term_id == term) {
            *rows_per_voter.entry(&vote.voter).or_default() += 1;
        }
        Ok(rows_per_voter
            .into_iter()
            .filter(|(_, rows)| *rows > 1)
            .map(|(voter, _)| voter.clone())
            .collect())
    }
}

/// A cast in progress against a [`MemoryStore`]. Writes are staged and only
/// applied on commit.
pub struct MemoryTransaction {
    state: OwnedMutexGuard<MemoryState>,
    votes: Vec<Vote>,
    voted_flags: Vec<(UserId, bool)>,
}

impl MemoryTransaction {
    fn key_taken(&self, voter: &VoterKey, term: Id) -> bool {
        self.state.vote_keys.contains(&(voter.clone(), term))
            || self
                .votes
                .iter()
                .any(|v| &v.voter == voter && v.term_id == term)
    }
}

#[rocket::async_trait]
impl CastTransaction for MemoryTransaction {
    async fn exists_vote_for(&mut self, voter: &VoterKey, term: Id) -> Result<bool> {
        Ok(self.key_taken(voter, term))
    }

    async fn append(&mut self, vote: NewVote) -> Result<Vote> {
        if self.key_taken(&vote.voter, vote.term_id) {
            return Err(Error::DuplicateVote(vote.term_id));
        }
        let vote = Vote::from_new(Id::new(), vote);
        self.votes.push(vote.clone());
        Ok(vote)
    }

    async fn set_has_voted(&mut self, user: &UserId, voted: bool) -> Result<()> {
        if !self.state.users.contains_key(user) {
            return Err(Error::not_found(format!("User {user}")));
        }
        self.voted_flags.push((user.clone(), voted));
        Ok(())
    }

    async fn commit(mut self) -> Result<()> {
        let state = &mut *self.state;
        // Appends are checked as they are staged, so nothing here may clash;
        // check every key anyway before writing any of them.
        let mut staged = HashSet::new();
        for vote in &self.votes {
            let key = (vote.voter.clone(), vote.term_id);
            if state.vote_keys.contains(&key) || !staged.insert(key) {
                return Err(Error::invariant(format!(
                    "transaction staged a second vote by {} in term {}",
                    vote.voter, vote.term_id
                )));
            }
        }
        state.vote_keys.extend(staged);
        state.votes.append(&mut self.votes);
        for (user, voted) in self.voted_flags.drain(..) {
            if let Some(user) = state.users.get_mut(&user) {
                user.has_voted = voted;
            }
        }
        Ok(())
    }
}
