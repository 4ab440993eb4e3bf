//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way: IDs are
//! hex strings rather than nested BSON documents.

pub mod auth;
pub mod candidate;
pub mod id;
pub mod receipt;
pub mod tally;
pub mod voter;

pub use id::ApiId;
