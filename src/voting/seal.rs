//! Encoding of voter identities at rest.
//!
//! The ledger stores a [`VoterKey`] rather than a user ID. With a secret
//! configured the key is an HMAC of the user ID, so a copy of the ledger does
//! not reveal who voted for whom without the secret. Keys must be
//! deterministic: the ledger's one-vote-per-term constraint is keyed on them.

use data_encoding::HEXLOWER;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{Error, Result};
use crate::model::{user::UserId, vote::VoterKey};

pub type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub enum VoterSeal {
    /// Store user IDs as-is.
    Plain,
    /// Store the hex HMAC-SHA256 of the user ID.
    Hmac(HmacSha256),
}

impl VoterSeal {
    /// Build the seal from the optional configured secret.
    pub fn from_secret(secret: Option<&str>) -> Result<Self> {
        match secret {
            None => Ok(Self::Plain),
            Some("") => Err(Error::BadRequest(
                "voter_seal_secret must not be empty".to_string(),
            )),
            Some(secret) => HmacSha256::new_from_slice(secret.as_bytes())
                .map(Self::Hmac)
                .map_err(|e| Error::BadRequest(format!("Unusable voter_seal_secret: {e}"))),
        }
    }

    /// The ledger key for this user.
    pub fn seal(&self, user: &UserId) -> VoterKey {
        match self {
            Self::Plain => VoterKey::new(user.as_str()),
            Self::Hmac(mac) => {
                let mut mac = mac.clone();
                mac.update(user.as_str().as_bytes());
                VoterKey::new(HEXLOWER.encode(&mac.finalize().into_bytes()))
            }
        }
    }
}

impl std::fmt::Debug for VoterSeal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => f.write_str("VoterSeal::Plain"),
            Self::Hmac(_) => f.write_str("VoterSeal::Hmac(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn plain_seal_is_identity() {
        let seal = VoterSeal::from_secret(None).unwrap();
        assert_eq!(seal.seal(&user("U01")).as_str(), "U01");
    }

    #[test]
    fn hmac_seal_is_deterministic_and_hides_the_id() {
        let seal = VoterSeal::from_secret(Some("pepper")).unwrap();
        let first = seal.seal(&user("U01"));
        assert_eq!(first, seal.seal(&user("U01")));
        assert_ne!(first, seal.seal(&user("U02")));
        assert!(!first.as_str().contains("U01"));
        assert_eq!(first.as_str().len(), 64);
    }

    #[test]
    fn different_secrets_give_different_keys() {
        let a = VoterSeal::from_secret(Some("a")).unwrap();
        let b = VoterSeal::from_secret(Some("b")).unwrap();
        assert_ne!(a.seal(&user("U01")), b.seal(&user("U01")));
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(VoterSeal::from_secret(Some("")).is_err());
    }
}
