mod bson;
mod collection;
mod errors;

pub use bson::{count_field, Id};
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use errors::{classify, is_duplicate_key_error, is_transient_error};
