use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::convert::Infallible;
use tower::ServiceBuilder;

use crate::{
    auth::{guard::authenticate, roles::authorize},
    state::AppState,
};

mod dto;
pub mod handlers;
pub mod pagination;
pub mod repo;
pub mod repo_types;
pub mod stats;

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Account routes, mounted under `/users`.
///
/// The listing runs guard, role authorizer and paginator in that order.
pub fn router(state: AppState) -> Router<AppState> {
    let listing = get(handlers::index).layer(
        ServiceBuilder::new()
            .layer(from_fn_with_state(state.clone(), authenticate))
            .layer(from_fn(authorize))
            .layer(from_fn_with_state(state.clone(), pagination::paginate)),
    );

    let upload = post(handlers::upload)
        .layer::<_, Infallible>(from_fn_with_state(state, authenticate))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    Router::new()
        .route("/", listing)
        .route("/upload", upload)
        .route("/month/:month", get(handlers::by_month))
        .route(
            "/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
}
