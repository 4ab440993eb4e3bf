use rocket::{Catcher, Request, Route};

use crate::error::Error;

mod public;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(public::routes());
    routes.extend(voting::routes());
    routes
}

/// Catchers that render guard failures and unmatched routes with the same
/// JSON error body as route errors.
pub fn catchers() -> Vec<Catcher> {
    catchers![unauthorized, not_found, internal]
}

#[catch(401)]
fn unauthorized() -> Error {
    Error::Unauthenticated("Missing or invalid auth token".to_string())
}

#[catch(404)]
fn not_found(req: &Request<'_>) -> Error {
    Error::not_found(format!("No route for {} {}", req.method(), req.uri()))
}

#[catch(500)]
fn internal() -> Error {
    Error::Internal("Internal server error".to_string())
}
