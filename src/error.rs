use jsonwebtoken::errors::Error as JwtError;
use log::error;
use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    response::{status::Custom, Responder},
    serde::json::Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::model::{candidate::CandidateId, mongodb::Id};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The caller has no valid session, or it names a user that does not exist.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("Candidate not found: {0}")]
    CandidateNotFound(CandidateId),
    #[error("Candidate {candidate} stands in district {candidate_district}, not the voter's district {voter_district}")]
    DistrictMismatch {
        candidate: CandidateId,
        candidate_district: Id,
        voter_district: Id,
    },
    /// The voter already has a ledger entry for this term.
    #[error("Already voted in term {0}")]
    AlreadyVoted(Id),
    /// The ledger's uniqueness constraint rejected an append.
    #[error("Duplicate vote for term {0}")]
    DuplicateVote(Id),
    #[error("No election term is currently active")]
    NoActiveTerm,
    #[error("Candidate {candidate} stands in term {candidate_term}, but the active term is {active_term}")]
    TermMismatch {
        candidate: CandidateId,
        candidate_term: Id,
        active_term: Id,
    },
    /// Transient storage failure; the caller may retry.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    /// The ledger contradicts itself. Needs an operator.
    #[error("Ledger invariant violated: {0}")]
    InvariantViolation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// The server itself is misconfigured.
    #[error("Internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Raise an invariant violation, making sure an operator hears about it.
    pub fn invariant(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        error!("LEDGER INVARIANT VIOLATED: {msg}");
        Self::InvariantViolation(msg)
    }

    /// Short machine-readable reason, surfaced to the presentation layer.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) | Self::Jwt(_) => "unauthenticated",
            Self::CandidateNotFound(_) => "candidate_not_found",
            Self::DistrictMismatch { .. } => "district_mismatch",
            Self::AlreadyVoted(_) | Self::DuplicateVote(_) => "already_voted",
            Self::NoActiveTerm => "no_active_term",
            Self::TermMismatch { .. } => "term_mismatch",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Internal(_) | Self::Db(_) => "internal",
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Unauthenticated(_) | Self::Jwt(_) => Status::Unauthorized,
            Self::CandidateNotFound(_) | Self::NotFound(_) => Status::NotFound,
            Self::DistrictMismatch { .. } => Status::Forbidden,
            Self::AlreadyVoted(_)
            | Self::DuplicateVote(_)
            | Self::NoActiveTerm
            | Self::TermMismatch { .. } => Status::Conflict,
            Self::BadRequest(_) => Status::BadRequest,
            Self::StorageUnavailable(_) => Status::ServiceUnavailable,
            Self::InvariantViolation(_) | Self::Internal(_) | Self::Db(_) => {
                Status::InternalServerError
            }
        }
    }
}

/// Error body sent to clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub reason: &'static str,
    pub message: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        // Don't leak database internals to clients.
        let message = match self {
            Self::Db(ref e) => {
                error!("Database error: {e}");
                "Internal server error".to_string()
            }
            ref other => other.to_string(),
        };
        let body = ErrorBody {
            reason: self.reason(),
            message,
        };
        Custom(status, Json(body)).respond_to(req)
    }
}
