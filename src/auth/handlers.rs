use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use super::{
    claims::Identity,
    dto::{LoginRequest, LoginResponse, SignupRequest, SignupResponse},
    jwt::JwtKeys,
    password,
};
use crate::{
    error::AppError,
    state::AppState,
    users::repo_types::NewUser,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let Json(mut payload) = payload?;
    payload.email = payload.email.trim().to_lowercase();
    payload.name = payload.name.trim().to_string();

    if payload.name.is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::AccountExists);
    }

    let password_hash = password::hash_new(&payload.password)?;
    let user = state
        .users
        .insert(NewUser {
            name: payload.name,
            email: payload.email,
            password_hash,
            role: payload.role.unwrap_or_default(),
        })
        .await?;

    info!(user_id = %user.id, role = ?user.role, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created successfully",
            data: user,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(mut payload) = payload?;
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }

    let Some(user) = state.users.find_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(AppError::Credentials("Authentication failed. User not found."));
    };

    if !password::verify(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Credentials("Authentication failed. Wrong password."));
    }

    let token = JwtKeys::from_ref(&state).sign(&Identity::from(&user))?;

    let cache_cfg = &state.config.token_cache;
    if cache_cfg.override_enabled {
        let ttl = Duration::from_secs(cache_cfg.ttl_seconds);
        if let Err(e) = state.token_cache.set(&token, ttl).await {
            warn!(error = %e, "could not publish session token to cache");
        }
    }

    info!(user_id = %user.id, "user logged in");
    Ok(Json(LoginResponse {
        message: "Logged in successfully!",
        token,
    }))
}
