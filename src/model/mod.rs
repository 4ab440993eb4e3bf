pub mod api;
pub mod candidate;
pub mod district;
pub mod mongodb;
pub mod term;
pub mod user;
pub mod vote;
