use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::{
    candidate::Candidate,
    district::District,
    term::Term,
    user::User,
    vote::Vote,
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Identity directory
impl MongoCollection for User {
    const NAME: &'static str = "users";
}

// Reference data
impl MongoCollection for District {
    const NAME: &'static str = "districts";
}
impl MongoCollection for Term {
    const NAME: &'static str = "terms";
}
impl MongoCollection for Candidate {
    const NAME: &'static str = "candidates";
}

// Vote ledger
impl MongoCollection for Vote {
    const NAME: &'static str = "votes";
}

/// Ensure that all the required indexes exist on the given database.
///
/// The unique `(voter, term_id)` index is what makes a second cast in the same
/// term fail inside the storage engine, whatever the application checked first.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Ledger: one vote per voter per term.
    let one_vote_per_term = IndexModel::builder()
        .keys(doc! {"voter": 1, "term_id": 1})
        .options(unique)
        .build();
    let by_candidate = IndexModel::builder()
        .keys(doc! {"candidate_id": 1, "voter": 1})
        .build();
    Coll::<Vote>::from_db(db)
        .create_indexes([one_vote_per_term, by_candidate], None)
        .await?;

    // Candidates are listed per district and term.
    let candidate_index = IndexModel::builder()
        .keys(doc! {"district_id": 1, "term_id": 1})
        .build();
    Coll::<Candidate>::from_db(db)
        .create_index(candidate_index, None)
        .await?;

    Ok(())
}
