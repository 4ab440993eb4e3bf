use std::fmt::{Display, Formatter};

use rocket::request::FromParam;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::Id;

/// Minimum length of a user identifier.
pub const MIN_USER_ID_LEN: usize = 3;

/// A registered user's identifier, as chosen at registration.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and wrap a raw identifier.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.chars().count() < MIN_USER_ID_LEN {
            return Err(Error::BadRequest(format!(
                "User ID must be at least {MIN_USER_ID_LEN} characters long"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = Error;

    fn try_from(id: String) -> Result<Self> {
        Self::new(id)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl<'a> FromParam<'a> for UserId {
    type Error = Error;

    fn from_param(param: &'a str) -> Result<Self> {
        Self::new(param)
    }
}

/// A user record, owned by the identity directory.
///
/// The core only ever reads users, apart from flipping `has_voted` inside the
/// casting transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub district_id: Id,
    #[serde(default)]
    pub has_voted: bool,
}

impl User {
    /// Create a user who has not voted yet.
    pub fn new(id: UserId, name: impl Into<String>, district_id: Id) -> Self {
        Self {
            id,
            name: name.into(),
            district_id,
            has_voted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_ids_are_rejected() {
        assert!(matches!(UserId::new("ab"), Err(Error::BadRequest(_))));
        assert!(UserId::new("abc").is_ok());
    }

    #[test]
    fn id_length_counts_characters_not_bytes() {
        assert!(UserId::new("éé").is_err());
        assert!(UserId::new("ééé").is_ok());
    }

    #[test]
    fn deserializing_validates() {
        let json = r#"{"_id":"u1","name":"x","district_id":{"$oid":"64b7f0c2a1b2c3d4e5f60718"}}"#;
        assert!(rocket::serde::json::serde_json::from_str::<User>(json).is_err());
    }
}
