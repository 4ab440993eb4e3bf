use std::sync::Arc;

use rocket::{serde::json::Json, tokio::time::timeout, Route, State};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::{auth::AuthToken, receipt::Receipt, voter::VoterDesc},
    candidate::CandidateId,
};
use crate::voting::BallotBox;

pub fn routes() -> Vec<Route> {
    routes![cast_vote, voter]
}

#[post("/votes/<candidate_id>")]
async fn cast_vote(
    token: AuthToken,
    candidate_id: CandidateId,
    core: &State<Arc<dyn BallotBox>>,
    config: &State<Config>,
) -> Result<Json<Receipt>> {
    // Dropping the cast on expiry rolls back its transaction.
    let vote = match timeout(config.cast_timeout(), core.cast_vote(token.user(), &candidate_id)).await
    {
        Ok(vote) => vote?,
        Err(_) => {
            warn!("Cast for candidate {candidate_id} timed out");
            return Err(Error::StorageUnavailable(format!(
                "Cast did not complete within {}s",
                config.cast_timeout().as_secs()
            )));
        }
    };
    Ok(Json(vote.into()))
}

#[get("/voter")]
async fn voter(token: AuthToken, core: &State<Arc<dyn BallotBox>>) -> Result<Json<VoterDesc>> {
    let status = core.voter_status(token.user()).await?;
    Ok(Json(status.into()))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{Cookie, Header, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::Value,
    };

    use super::*;
    use crate::model::{api::auth::AUTH_TOKEN_COOKIE, user::UserId};
    use crate::store::{IdentityDirectory, MemoryStore};
    use crate::test_support::{bearer, fixture, test_config};

    async fn reason(response: LocalResponse<'_>) -> String {
        let body = response.into_json::<Value>().await.unwrap();
        body["reason"].as_str().unwrap().to_string()
    }

    #[backend_test]
    async fn cast_returns_a_receipt(client: Client, store: MemoryStore) {
        let response = client
            .post("/votes/C1")
            .header(bearer(&fixture::u1()))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let receipt = response.into_json::<Receipt>().await.unwrap();
        assert_eq!(receipt.candidate_id, fixture::c1());
        assert_eq!(*receipt.term_id, fixture::term());

        let votes = store.votes().await;
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].cast_at, receipt.cast_at);
        assert!(store.get_user(&fixture::u1()).await.unwrap().unwrap().has_voted);
    }

    #[backend_test]
    async fn cast_accepts_the_cookie(client: Client, store: MemoryStore) {
        let token = AuthToken::new(fixture::u3()).encode(&test_config()).unwrap();
        let response = client
            .post("/votes/C2")
            .cookie(Cookie::new(AUTH_TOKEN_COOKIE, token))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(store.votes().await.len(), 1);
    }

    #[backend_test]
    async fn cast_falls_back_to_the_cookie_past_a_non_bearer_header(
        client: Client,
        store: MemoryStore,
    ) {
        let token = AuthToken::new(fixture::u3()).encode(&test_config()).unwrap();
        let response = client
            .post("/votes/C2")
            .header(Header::new("Authorization", "Basic dm90ZXI6c2VjcmV0"))
            .cookie(Cookie::new(AUTH_TOKEN_COOKIE, token))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(store.votes().await.len(), 1);
    }

    #[backend_test]
    async fn cast_without_token_is_unauthorized(client: Client, store: MemoryStore) {
        let response = client.post("/votes/C1").dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(reason(response).await, "unauthenticated");
        assert!(store.votes().await.is_empty());
    }

    #[backend_test]
    async fn cast_with_garbage_token_is_unauthorized(client: Client) {
        let response = client
            .post("/votes/C1")
            .header(Header::new("Authorization", "Bearer not.a.token"))
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test]
    async fn cast_for_unknown_user_is_unauthorized(client: Client) {
        let response = client
            .post("/votes/C1")
            .header(bearer(&UserId::new("ghost").unwrap()))
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(reason(response).await, "unauthenticated");
    }

    #[backend_test]
    async fn cast_in_another_district_is_forbidden(client: Client, store: MemoryStore) {
        let response = client
            .post("/votes/C1")
            .header(bearer(&fixture::u2()))
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
        assert_eq!(reason(response).await, "district_mismatch");
        assert!(store.votes().await.is_empty());
    }

    #[backend_test]
    async fn second_cast_conflicts(client: Client, store: MemoryStore) {
        let first = client
            .post("/votes/C1")
            .header(bearer(&fixture::u1()))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, first.status());

        let second = client
            .post("/votes/C2")
            .header(bearer(&fixture::u1()))
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, second.status());
        assert_eq!(reason(second).await, "already_voted");
        assert_eq!(store.votes().await.len(), 1);
    }

    #[backend_test]
    async fn cast_for_unknown_candidate_is_not_found(client: Client) {
        let response = client
            .post("/votes/nobody")
            .header(bearer(&fixture::u1()))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
        assert_eq!(reason(response).await, "candidate_not_found");
    }

    #[backend_test]
    async fn cast_for_past_candidate_conflicts(client: Client) {
        let response = client
            .post("/votes/C0")
            .header(bearer(&fixture::u1()))
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());
        assert_eq!(reason(response).await, "term_mismatch");
    }

    #[backend_test]
    async fn voter_view_tracks_the_cast(client: Client) {
        let before = client
            .get("/voter")
            .header(bearer(&fixture::u1()))
            .dispatch()
            .await
            .into_json::<VoterDesc>()
            .await
            .unwrap();
        assert_eq!(before.id, fixture::u1());
        assert_eq!(*before.district_id, fixture::d1());
        assert!(!before.has_voted);
        assert!(!before.voted_in_active_term);

        client
            .post("/votes/C1")
            .header(bearer(&fixture::u1()))
            .dispatch()
            .await;

        let after = client
            .get("/voter")
            .header(bearer(&fixture::u1()))
            .dispatch()
            .await
            .into_json::<VoterDesc>()
            .await
            .unwrap();
        assert!(after.has_voted);
        assert!(after.voted_in_active_term);
    }
}
