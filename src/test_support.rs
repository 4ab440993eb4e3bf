//! Shared fixtures for tests.
//!
//! Two districts and one active term. D1 has voters U01 and U03 and
//! candidates C1 and C2; D2 has voter U02 and candidate C3. Candidate C0
//! stood in D1 in a past term.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rocket::{http::Header, local::asynchronous::Client};

use crate::config::Config;
use crate::model::{
    api::auth::AuthToken,
    candidate::Candidate,
    district::District,
    term::Term,
    user::{User, UserId},
};
use crate::store::MemoryStore;
use crate::voting::{VoterSeal, VotingCore};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";

pub mod fixture {
    use crate::model::{candidate::CandidateId, mongodb::Id, user::UserId};

    fn id(hex: &str) -> Id {
        hex.parse().unwrap()
    }

    pub fn d1() -> Id {
        id("650000000000000000000d01")
    }

    pub fn d2() -> Id {
        id("650000000000000000000d02")
    }

    pub fn term() -> Id {
        id("6500000000000000000007e1")
    }

    pub fn past_term() -> Id {
        id("6500000000000000000007e0")
    }

    pub fn u1() -> UserId {
        UserId::new("U01").unwrap()
    }

    pub fn u2() -> UserId {
        UserId::new("U02").unwrap()
    }

    pub fn u3() -> UserId {
        UserId::new("U03").unwrap()
    }

    pub fn c0() -> CandidateId {
        CandidateId::new("C0")
    }

    pub fn c1() -> CandidateId {
        CandidateId::new("C1")
    }

    pub fn c2() -> CandidateId {
        CandidateId::new("C2")
    }

    pub fn c3() -> CandidateId {
        CandidateId::new("C3")
    }
}

/// A memory store holding the fixture data and an empty ledger.
pub async fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    let today = Utc::now().date_naive();

    for (id, short, long) in [
        (fixture::d1(), "D1", "First District"),
        (fixture::d2(), "D2", "Second District"),
    ] {
        let mut district = District::new(short, long);
        district.id = id;
        store.insert_district(district).await;
    }

    let mut term = Term::new(Some(today - Duration::days(30)), Some(today + Duration::days(30)));
    term.id = fixture::term();
    store.insert_term(term).await;
    let mut past = Term::new(
        Some(today - Duration::days(400)),
        Some(today - Duration::days(31)),
    );
    past.id = fixture::past_term();
    store.insert_term(past).await;

    for (id, district) in [
        (fixture::u1(), fixture::d1()),
        (fixture::u2(), fixture::d2()),
        (fixture::u3(), fixture::d1()),
    ] {
        let name = format!("Voter {id}");
        store.insert_user(User::new(id, name, district)).await;
    }

    for (id, district, term) in [
        (fixture::c0(), fixture::d1(), fixture::past_term()),
        (fixture::c1(), fixture::d1(), fixture::term()),
        (fixture::c2(), fixture::d1(), fixture::term()),
        (fixture::c3(), fixture::d2(), fixture::term()),
    ] {
        let name = format!("Candidate {id}");
        store
            .insert_candidate(Candidate::new(id, name, district, term))
            .await;
    }

    store
}

pub fn test_config() -> Config {
    Config::new(TEST_JWT_SECRET, 3600, 10)
}

/// A voting core over the fixture data, with the tally cache on.
pub async fn seeded_core() -> (VotingCore<MemoryStore>, MemoryStore) {
    let store = seeded_store().await;
    let core = VotingCore::new(Arc::new(store.clone()), VoterSeal::Plain, true);
    (core, store)
}

/// A local Rocket client over the fixture data. The returned store shares
/// state with the server.
pub async fn client_and_store() -> (Client, MemoryStore) {
    log4rs_test_utils::test_logging::init_logging_once_for(["district_vote_backend"], None, None);

    let (core, store) = seeded_core().await;
    let figment = rocket::Config::figment()
        .merge(("jwt_secret", TEST_JWT_SECRET))
        .merge(("log_level", "off"));
    let rocket = crate::rocket_for_core(rocket::custom(figment), Arc::new(core));
    let client = Client::tracked(rocket).await.unwrap();
    (client, store)
}

/// An `Authorization` header carrying a valid token for the user.
pub fn bearer(user: &UserId) -> Header<'static> {
    let token = AuthToken::new(user.clone()).encode(&test_config()).unwrap();
    Header::new("Authorization", format!("Bearer {token}"))
}
