use std::sync::Arc;

use chrono::Duration;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::store::MongoStore;
use crate::voting::{BallotBox, VoterSeal, VotingCore};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    #[serde(default = "default_auth_ttl")]
    auth_ttl: u32,
    #[serde(default = "default_cast_timeout")]
    cast_timeout: u32,
    // secrets
    jwt_secret: String,
}

fn default_auth_ttl() -> u32 {
    3600
}

fn default_cast_timeout() -> u32 {
    10
}

impl Config {
    pub fn new(jwt_secret: impl Into<String>, auth_ttl: u32, cast_timeout: u32) -> Self {
        Self {
            auth_ttl,
            cast_timeout,
            jwt_secret: jwt_secret.into(),
        }
    }

    /// Valid lifetime of minted auth tokens.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Upper bound on a single cast, as seen by the HTTP layer.
    pub fn cast_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cast_timeout.into())
    }

    /// Secret key used to sign and verify JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the ledger database.
#[derive(Deserialize)]
struct LedgerConfig {
    // non-secrets
    #[serde(default = "default_db_name")]
    db_name: String,
    #[serde(default = "default_tally_cache")]
    tally_cache: bool,
    // secrets
    db_uri: String,
    voter_seal_secret: Option<String>,
}

fn default_db_name() -> String {
    "voting".to_string()
}

fn default_tally_cache() -> bool {
    true
}

/// A fairing that loads the ledger config, connects to MongoDB, and places
/// the voting core into managed state as an `Arc<dyn BallotBox>`.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<LedgerConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        let seal = match VoterSeal::from_secret(config.voter_seal_secret.as_deref()) {
            Ok(seal) => seal,
            Err(e) => {
                error!("Failed to load database config: {e}");
                return Err(rocket);
            }
        };

        info!("Loaded database config, connecting...");
        let store = match MongoStore::connect(&config.db_uri, &config.db_name).await {
            Ok(store) => store,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        info!("...database connection online!");
        if !config.tally_cache {
            info!("Tally cache disabled");
        }

        let core: Arc<dyn BallotBox> =
            Arc::new(VotingCore::new(Arc::new(store), seal, config.tally_cache));
        rocket = rocket.manage(core);
        Ok(rocket)
    }
}

#[cfg(test)]
mod tests {
    use rocket::figment::Figment;

    use super::*;

    #[test]
    fn defaults_fill_optional_settings() {
        let figment = Figment::new().merge(("jwt_secret", "secret"));
        let config: Config = figment.extract().unwrap();
        assert_eq!(config.auth_ttl(), Duration::seconds(3600));
        assert_eq!(config.cast_timeout(), std::time::Duration::from_secs(10));
        assert_eq!(config.jwt_secret(), b"secret");
    }

    #[test]
    fn jwt_secret_is_required() {
        let figment = Figment::new().merge(("auth_ttl", 60));
        assert!(figment.extract::<Config>().is_err());
    }

    #[test]
    fn ledger_config_defaults() {
        let figment = Figment::new().merge(("db_uri", "mongodb://localhost"));
        let config: LedgerConfig = figment.extract().unwrap();
        assert_eq!(config.db_name, "voting");
        assert!(config.tally_cache);
        assert!(config.voter_seal_secret.is_none());
    }
}
