use std::fmt::{Display, Formatter};

use rocket::request::FromParam;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::mongodb::Id;

/// A candidate's public identifier.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(String);

impl CandidateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CandidateId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'a> FromParam<'a> for CandidateId {
    type Error = Error;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        if param.is_empty() {
            return Err(Error::BadRequest("Empty candidate ID".to_string()));
        }
        Ok(Self::new(param))
    }
}

/// A candidate standing in one district for one term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: CandidateId,
    pub name: String,
    pub district_id: Id,
    pub term_id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Candidate {
    pub fn new(id: CandidateId, name: impl Into<String>, district_id: Id, term_id: Id) -> Self {
        Self {
            id,
            name: name.into(),
            district_id,
            term_id,
            description: None,
        }
    }
}
