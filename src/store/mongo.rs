use chrono::NaiveDate;
use log::info;
use mongodb::{
    bson::{doc, Bson, Document},
    options::{Acknowledgment, FindOptions, ReadConcern, TransactionOptions, WriteConcern},
    Client, ClientSession, Database,
};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    candidate::{Candidate, CandidateId},
    district::District,
    mongodb::{classify, count_field, ensure_indexes_exist, is_duplicate_key_error, Coll, Id},
    term::Term,
    user::{User, UserId},
    vote::{NewVote, Vote, VoterKey},
};

use super::{CandidateRegistry, CastTransaction, IdentityDirectory, LedgerCount, VoteLedger};

/// The production store, backed by a MongoDB replica set.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub fn new(client: Client, db: Database) -> Self {
        Self { client, db }
    }

    /// Connect to the database and make sure the ledger's indexes exist.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await.map_err(classify)?;
        let db = client.database(db_name);
        ensure_indexes_exist(&db).await.map_err(classify)?;
        info!("Connected to database {db_name}");
        Ok(Self::new(client, db))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    fn votes(&self) -> Coll<Vote> {
        Coll::from_db(&self.db)
    }
}

#[rocket::async_trait]
impl IdentityDirectory for MongoStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        Coll::<User>::from_db(&self.db)
            .find_one(doc! { "_id": id.as_str() }, None)
            .await
            .map_err(classify)
    }
}

#[rocket::async_trait]
impl CandidateRegistry for MongoStore {
    async fn get_candidate(&self, id: &CandidateId) -> Result<Option<Candidate>> {
        Coll::<Candidate>::from_db(&self.db)
            .find_one(doc! { "_id": id.as_str() }, None)
            .await
            .map_err(classify)
    }

    async fn get_district(&self, id: Id) -> Result<Option<District>> {
        Coll::<District>::from_db(&self.db)
            .find_one(id.as_doc(), None)
            .await
            .map_err(classify)
    }

    async fn get_term(&self, id: Id) -> Result<Option<Term>> {
        Coll::<Term>::from_db(&self.db)
            .find_one(id.as_doc(), None)
            .await
            .map_err(classify)
    }

    async fn active_term(&self, day: NaiveDate) -> Result<Option<Term>> {
        // Terms are few; resolve overlaps the same way everywhere.
        let terms: Vec<Term> = Coll::<Term>::from_db(&self.db)
            .find(None, None)
            .await
            .map_err(classify)?
            .try_collect()
            .await
            .map_err(classify)?;
        Ok(Term::active_on(&terms, day).cloned())
    }

    async fn candidates_in_district(&self, district: Id, term: Id) -> Result<Vec<Candidate>> {
        let filter = doc! {
            "district_id": district,
            "term_id": term,
        };
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        Coll::<Candidate>::from_db(&self.db)
            .find(filter, options)
            .await
            .map_err(classify)?
            .try_collect()
            .await
            .map_err(classify)
    }
}

/// Filter matching a voter's ledger row for a term.
fn vote_key_filter(voter: &VoterKey, term: Id) -> Document {
    doc! {
        "voter": voter.as_str(),
        "term_id": term,
    }
}

#[rocket::async_trait]
impl VoteLedger for MongoStore {
    type Transaction = MongoTransaction;

    async fn begin(&self) -> Result<MongoTransaction> {
        let mut session = self.client.start_session(None).await.map_err(classify)?;
        let options = TransactionOptions::builder()
            .read_concern(ReadConcern::snapshot())
            .write_concern(WriteConcern::builder().w(Acknowledgment::Majority).build())
            .build();
        session.start_transaction(options).await.map_err(classify)?;
        Ok(MongoTransaction {
            session,
            db: self.db.clone(),
        })
    }

    async fn exists_vote_for(&self, voter: &VoterKey, term: Id) -> Result<bool> {
        let count = self
            .votes()
            .count_documents(vote_key_filter(voter, term), None)
            .await
            .map_err(classify)?;
        Ok(count > 0)
    }

    async fn count_for(&self, candidate: &CandidateId) -> Result<LedgerCount> {
        let pipeline = [
            doc! { "$match": { "candidate_id": candidate.as_str() } },
            doc! { "$group": { "_id": "$voter", "rows": { "$sum": 1 } } },
            doc! { "$group": {
                "_id": Bson::Null,
                "distinct_voters": { "$sum": 1 },
                "rows": { "$sum": "$rows" },
            } },
        ];
        let mut cursor = self.votes().aggregate(pipeline, None).await.map_err(classify)?;
        match cursor.try_next().await.map_err(classify)? {
            Some(totals) => Ok(LedgerCount {
                rows: count_field(&totals, "rows")?,
                distinct_voters: count_field(&totals, "distinct_voters")?,
            }),
            None => Ok(LedgerCount::default()),
        }
    }

    async fn duplicate_voters(&self, term: Id) -> Result<Vec<VoterKey>> {
        let pipeline = [
            doc! { "$match": { "term_id": term } },
            doc! { "$group": { "_id": "$voter", "rows": { "$sum": 1 } } },
            doc! { "$match": { "rows": { "$gt": 1 } } },
            doc! { "$sort": { "_id": 1 } },
        ];
        let groups: Vec<Document> = self
            .votes()
            .aggregate(pipeline, None)
            .await
            .map_err(classify)?
            .try_collect()
            .await
            .map_err(classify)?;
        groups
            .iter()
            .map(|group| {
                group
                    .get_str("_id")
                    .map(VoterKey::new)
                    .map_err(|e| Error::invariant(format!("malformed voter key in ledger: {e}")))
            })
            .collect()
    }
}

/// A cast in progress inside a MongoDB transaction. Dropping it without
/// committing aborts the transaction.
pub struct MongoTransaction {
    session: ClientSession,
    db: Database,
}

#[rocket::async_trait]
impl CastTransaction for MongoTransaction {
    async fn exists_vote_for(&mut self, voter: &VoterKey, term: Id) -> Result<bool> {
        let count = Coll::<Vote>::from_db(&self.db)
            .count_documents_with_session(vote_key_filter(voter, term), None, &mut self.session)
            .await
            .map_err(classify)?;
        Ok(count > 0)
    }

    async fn append(&mut self, vote: NewVote) -> Result<Vote> {
        let vote = Vote::from_new(Id::new(), vote);
        match Coll::<Vote>::from_db(&self.db)
            .insert_one_with_session(&vote, None, &mut self.session)
            .await
        {
            Ok(_) => Ok(vote),
            Err(e) if is_duplicate_key_error(&e) => Err(Error::DuplicateVote(vote.term_id)),
            Err(e) => Err(classify(e)),
        }
    }

    async fn set_has_voted(&mut self, user: &UserId, voted: bool) -> Result<()> {
        let result = Coll::<User>::from_db(&self.db)
            .update_one_with_session(
                doc! { "_id": user.as_str() },
                doc! { "$set": { "has_voted": voted } },
                None,
                &mut self.session,
            )
            .await
            .map_err(classify)?;
        if result.matched_count == 0 {
            return Err(Error::not_found(format!("User {user}")));
        }
        Ok(())
    }

    async fn commit(mut self) -> Result<()> {
        self.session.commit_transaction().await.map_err(classify)
    }
}
