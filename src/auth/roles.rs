use axum::{
    extract::{OriginalUri, Request},
    http::{header::LOCATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use super::claims::Identity;
use crate::error::AppError;

/// Prefix of the account collection; only paths under it are gated.
pub const USERS_PREFIX: &str = "/users";

#[derive(Debug, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Redirect(String),
}

pub fn in_users_namespace(path: &str) -> bool {
    path == USERS_PREFIX
        || path
            .strip_prefix(USERS_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Admins and Managers may browse the collection; everyone else is sent to
/// their own record. Paths outside the collection are not gated.
pub fn decide(identity: &Identity, path: &str) -> Decision {
    if !in_users_namespace(path) || identity.role.can_list_users() {
        return Decision::Proceed;
    }
    Decision::Redirect(format!("{USERS_PREFIX}/{}", identity.id))
}

/// Must run after the access guard.
pub async fn authorize(req: Request, next: Next) -> Result<Response, AppError> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .ok_or(AppError::AccessCheck)?;

    // nested routers strip their prefix from `uri()`
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.path())
        .unwrap_or_else(|| req.uri().path());

    match decide(identity, path) {
        Decision::Proceed => Ok(next.run(req).await),
        Decision::Redirect(target) => {
            debug!(user_id = %identity.id, role = ?identity.role, %target, "redirecting to own record");
            Ok((StatusCode::FOUND, [(LOCATION, target)]).into_response())
        }
    }
}
