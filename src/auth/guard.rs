use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::{claims::Identity, jwt::JwtKeys};
use crate::{error::AppError, state::AppState};

/// Resolves, verifies and attaches the caller's identity.
///
/// The shared token cache is consulted first when the override policy is on;
/// an unreachable cache is logged and skipped. Otherwise the bearer token from
/// the `Authorization` header is used. No token halts with 401, a bad or
/// expired one with 403.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = resolve_token(&state, req.headers()).await else {
        debug!("no session token presented");
        return Err(AppError::Unauthorized);
    };

    let claims = JwtKeys::from_ref(&state).verify(&token).map_err(|e| {
        warn!(error = %e, "session token rejected");
        AppError::Forbidden
    })?;

    debug!(user_id = %claims.identity.id, role = ?claims.identity.role, "caller authenticated");
    req.extensions_mut().insert(claims.identity);
    Ok(next.run(req).await)
}

async fn resolve_token(state: &AppState, headers: &HeaderMap) -> Option<String> {
    if state.config.token_cache.override_enabled {
        match state.token_cache.get().await {
            Ok(Some(token)) => {
                debug!("using cached session token");
                return Some(token);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "token cache lookup failed; using header"),
        }
    }
    bearer_token(headers).map(str::to_owned)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

/// Identity attached by [`authenticate`]. Missing means the route was wired
/// without the guard in front of it.
pub struct CurrentUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentUser)
            .ok_or(AppError::AccessCheck)
    }
}
