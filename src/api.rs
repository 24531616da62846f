use rocket::{
    http::{Status, StatusClass},
    serde::json::Json,
    Catcher, Request, Route,
};

use crate::error::ErrorBody;

pub mod auth;
pub mod public;
pub mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(public::routes());
    routes.extend(voting::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

/// Failures raised by Rocket itself (no matching route, unreadable body)
/// get the same JSON shape as our own errors.
#[catch(default)]
fn default_catcher(status: Status, _req: &Request<'_>) -> (Status, Json<ErrorBody>) {
    let error = match (status.code, status.class()) {
        (404, _) => "notFound",
        (_, StatusClass::ServerError) => "internal",
        _ => "badRequest",
    };
    let body = ErrorBody {
        error,
        message: status.reason().unwrap_or("Unknown error").to_string(),
    };
    (status, Json(body))
}
