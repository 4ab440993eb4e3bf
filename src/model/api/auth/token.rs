use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use log::{debug, error};
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::user::UserId;

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

const BEARER_PREFIX: &str = "Bearer ";

/// An authentication token naming the user a request acts for.
///
/// Tokens are issued by the identity service; this backend only checks them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    #[serde(rename = "sub")]
    user: UserId,
}

impl AuthToken {
    pub fn new(user: UserId) -> Self {
        Self { user }
    }

    /// The user this token was issued to.
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Sign this token, valid for the configured `auth_ttl`.
    pub fn encode(self, config: &Config) -> Result<String> {
        self.encode_expiring_at(config, Utc::now() + config.auth_ttl())
    }

    fn encode_expiring_at(self, config: &Config, expire_at: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            token: self,
            expire_at,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?;
        Ok(token)
    }

    /// Verify and decode a signed token.
    pub fn decode(token: &str, config: &Config) -> Result<Self> {
        let token = jsonwebtoken::decode(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims>| claims.claims.token)?;
        Ok(token)
    }
}

/// Token claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    token: AuthToken,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// The raw token from the `Authorization` header, falling back to the cookie.
fn raw_token(req: &Request<'_>) -> Option<String> {
    let bearer = req
        .headers()
        .get_one("Authorization")
        .and_then(|header| header.strip_prefix(BEARER_PREFIX));
    if let Some(token) = bearer {
        return Some(token.to_string());
    }
    req.cookies()
        .get(AUTH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthToken {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(config) = req.rocket().state::<Config>() else {
            error!("Auth token checked before the config was loaded");
            return Outcome::Failure((
                Status::InternalServerError,
                Error::Internal("Token validation is not configured".to_string()),
            ));
        };

        let Some(raw) = raw_token(req) else {
            return Outcome::Failure((
                Status::Unauthorized,
                Error::Unauthenticated("Missing auth token".to_string()),
            ));
        };

        match Self::decode(&raw, config) {
            Ok(token) => Outcome::Success(token),
            Err(e) => {
                debug!("Rejected auth token: {e}");
                Outcome::Failure((Status::Unauthorized, e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use rocket::{local::asynchronous::Client, serde::json::Value};

    use super::*;
    use crate::test_support::{bearer, fixture, seeded_core, test_config};
    use crate::voting::BallotBox;

    fn user() -> UserId {
        UserId::new("U01").unwrap()
    }

    #[test]
    fn token_round_trips() {
        let config = test_config();
        let raw = AuthToken::new(user()).encode(&config).unwrap();
        let token = AuthToken::decode(&raw, &config).unwrap();
        assert_eq!(token.user(), &user());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let raw = AuthToken::new(user()).encode(&test_config()).unwrap();
        let other = Config::new("another-secret", 3600, 10);
        assert!(matches!(AuthToken::decode(&raw, &other), Err(Error::Jwt(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = test_config();
        let raw = AuthToken::new(user())
            .encode_expiring_at(&config, Utc::now() - Duration::hours(1))
            .unwrap();
        assert!(matches!(AuthToken::decode(&raw, &config), Err(Error::Jwt(_))));
    }

    #[test]
    fn short_subject_is_rejected() {
        let config = test_config();
        let claims = claims_for("ab");
        let raw = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .unwrap();
        assert!(AuthToken::decode(&raw, &config).is_err());
    }

    fn claims_for(sub: &str) -> rocket::serde::json::Value {
        rocket::serde::json::json!({
            "sub": sub,
            "exp": (Utc::now() + Duration::hours(1)).timestamp(),
        })
    }

    #[rocket::async_test]
    async fn unconfigured_server_fails_as_internal() {
        let (core, _) = seeded_core().await;
        let core: Arc<dyn BallotBox> = Arc::new(core);
        let figment = rocket::Config::figment().merge(("log_level", "off"));
        let rocket = rocket::custom(figment)
            .manage(core)
            .mount("/", crate::api::routes())
            .register("/", crate::api::catchers());
        let client = Client::tracked(rocket).await.unwrap();

        let response = client
            .get("/voter")
            .header(bearer(&fixture::u1()))
            .dispatch()
            .await;
        assert_eq!(Status::InternalServerError, response.status());
        let body = response.into_json::<Value>().await.unwrap();
        assert_eq!(body["reason"], "internal");
    }
}
