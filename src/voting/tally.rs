use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use log::debug;

use crate::error::{Error, Result};
use crate::model::{
    candidate::{Candidate, CandidateId},
    mongodb::Id,
};
use crate::store::Store;

/// Vote counts for every candidate of a district in one term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistrictTally {
    pub district_id: Id,
    pub term_id: Id,
    /// Distinct voters per candidate, in candidate ID order.
    pub counts: BTreeMap<CandidateId, u64>,
}

#[derive(Debug, Default)]
struct CacheState {
    /// Bumped by every invalidation, so a tally computed across a cast is
    /// never stored.
    generation: u64,
    entries: HashMap<(Id, Id), DistrictTally>,
}

/// Read-through cache of district tallies.
///
/// Entries are only ever replaced by a full recomputation from the ledger,
/// never patched in place.
#[derive(Debug, Default)]
pub struct TallyCache {
    state: Mutex<CacheState>,
}

impl TallyCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        // The state is always left consistent, so a poisoned lock is usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, district: Id, term: Id) -> Option<DistrictTally> {
        self.lock().entries.get(&(district, term)).cloned()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Store a tally computed while the cache was at `generation`. Returns
    /// false, storing nothing, if an invalidation happened in the meantime.
    pub fn insert(&self, generation: u64, tally: DistrictTally) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state
            .entries
            .insert((tally.district_id, tally.term_id), tally);
        true
    }

    /// Drop the cached tally for a district and term.
    pub fn invalidate(&self, district: Id, term: Id) {
        let mut state = self.lock();
        state.generation += 1;
        state.entries.remove(&(district, term));
    }
}

/// Derives vote counts from the ledger.
pub struct TallyEngine<S> {
    store: Arc<S>,
    cache: Option<Arc<TallyCache>>,
}

impl<S: Store> TallyEngine<S> {
    pub fn new(store: Arc<S>, cache: Option<Arc<TallyCache>>) -> Self {
        Self { store, cache }
    }

    /// Number of distinct voters for a candidate.
    pub async fn count_votes(&self, candidate_id: &CandidateId) -> Result<u64> {
        let candidate = self
            .store
            .get_candidate(candidate_id)
            .await?
            .ok_or_else(|| Error::CandidateNotFound(candidate_id.clone()))?;
        self.ensure_term_consistent(candidate.term_id).await?;
        self.count_candidate(&candidate).await
    }

    /// Counts for every candidate of a district in the active term.
    pub async fn counts_by_district(&self, district: Id) -> Result<DistrictTally> {
        let term = self
            .store
            .active_term(Utc::now().date_naive())
            .await?
            .ok_or(Error::NoActiveTerm)?;
        self.counts_by_district_in(district, term.id).await
    }

    /// Counts for every candidate of a district in the given term.
    pub async fn counts_by_district_in(&self, district: Id, term: Id) -> Result<DistrictTally> {
        if let Some(tally) = self.cache.as_ref().and_then(|c| c.get(district, term)) {
            debug!("Tally cache hit for district {district}, term {term}");
            return Ok(tally);
        }
        let generation = self.cache.as_ref().map(|c| c.generation());

        if self.store.get_district(district).await?.is_none() {
            return Err(Error::not_found(format!("District {district}")));
        }
        if self.store.get_term(term).await?.is_none() {
            return Err(Error::not_found(format!("Term {term}")));
        }
        self.ensure_term_consistent(term).await?;

        let mut counts = BTreeMap::new();
        for candidate in self.store.candidates_in_district(district, term).await? {
            let count = self.count_candidate(&candidate).await?;
            counts.insert(candidate.id, count);
        }
        let tally = DistrictTally {
            district_id: district,
            term_id: term,
            counts,
        };

        if let (Some(cache), Some(generation)) = (&self.cache, generation) {
            if !cache.insert(generation, tally.clone()) {
                debug!("Votes were cast while tallying district {district}; not caching");
            }
        }
        Ok(tally)
    }

    async fn count_candidate(&self, candidate: &Candidate) -> Result<u64> {
        let count = self.store.count_for(&candidate.id).await?;
        if count.rows != count.distinct_voters {
            return Err(Error::invariant(format!(
                "candidate {} has {} ledger rows from only {} distinct voters",
                candidate.id, count.rows, count.distinct_voters
            )));
        }
        Ok(count.distinct_voters)
    }

    async fn ensure_term_consistent(&self, term: Id) -> Result<()> {
        let duplicates = self.store.duplicate_voters(term).await?;
        if !duplicates.is_empty() {
            return Err(Error::invariant(format!(
                "{} voter(s) hold more than one vote in term {term}",
                duplicates.len()
            )));
        }
        Ok(())
    }
}
