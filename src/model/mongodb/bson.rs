use std::fmt::{Display, Formatter};
use std::{ops::Deref, str::FromStr};

use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use rocket::{
    http::{
        impl_from_uri_param_identity,
        uri::fmt::{Path, UriDisplay},
    },
    request::FromParam,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A MongoDB object ID, used for districts, terms, and ledger rows.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id(ObjectId);

impl Id {
    /// Generate a fresh ID.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    /// A filter document matching this ID.
    pub fn as_doc(&self) -> Document {
        doc! { "_id": self.0 }
    }
}

impl Deref for Id {
    type Target = ObjectId;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

impl FromStr for Id {
    type Err = mongodb::bson::oid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse::<ObjectId>()?))
    }
}

impl From<ObjectId> for Id {
    fn from(id: ObjectId) -> Self {
        Self(id)
    }
}

impl From<Id> for Bson {
    fn from(id: Id) -> Self {
        Bson::ObjectId(id.0)
    }
}

impl<'a> FromParam<'a> for Id {
    type Error = Error;

    fn from_param(param: &'a str) -> std::result::Result<Self, Self::Error> {
        param
            .parse::<Id>()
            .map_err(|_| Error::BadRequest(format!("Malformed ID '{param}'")))
    }
}

impl UriDisplay<Path> for Id {
    fn fmt(&self, formatter: &mut rocket::http::uri::fmt::Formatter<'_, Path>) -> std::fmt::Result {
        formatter.write_value(self.to_string())
    }
}

impl_from_uri_param_identity!([Path] Id);

/// Read a counter produced by an aggregation `$sum`, which may come back as
/// either a 32- or 64-bit integer depending on its magnitude.
pub fn count_field(document: &Document, key: &str) -> Result<u64> {
    let count = match document.get(key) {
        Some(Bson::Int32(n)) => i64::from(*n),
        Some(Bson::Int64(n)) => *n,
        None => 0,
        Some(other) => {
            return Err(Error::invariant(format!(
                "aggregation field '{key}' has unexpected type {:?}",
                other.element_type()
            )))
        }
    };
    u64::try_from(count).map_err(|_| {
        Error::invariant(format!("aggregation field '{key}' is negative: {count}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_round_trips_through_hex() {
        let id = Id::new();
        let parsed: Id = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn malformed_id_param_is_bad_request() {
        assert!(matches!(
            Id::from_param("not-an-object-id"),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn count_field_accepts_both_integer_widths() {
        let document = doc! { "small": 3_i32, "large": 5_000_000_000_i64 };
        assert_eq!(count_field(&document, "small").unwrap(), 3);
        assert_eq!(count_field(&document, "large").unwrap(), 5_000_000_000);
        assert_eq!(count_field(&document, "missing").unwrap(), 0);
    }

    #[test]
    fn count_field_rejects_other_types() {
        let document = doc! { "rows": "three" };
        assert!(matches!(
            count_field(&document, "rows"),
            Err(Error::InvariantViolation(_))
        ));
    }

    #[test]
    fn count_field_rejects_negative_counts() {
        let document = doc! { "voters": -1_i64 };
        assert!(matches!(
            count_field(&document, "voters"),
            Err(Error::InvariantViolation(msg)) if msg.contains("negative")
        ));
    }
}
