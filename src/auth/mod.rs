use crate::state::AppState;
use axum::Router;

pub mod cache;
pub mod claims;
mod dto;
pub mod guard;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod roles;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
