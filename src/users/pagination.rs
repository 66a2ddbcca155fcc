//! Page-window pagination over the account collection.
//!
//! [`paginate`] runs as middleware in front of the listing handler: it counts
//! the collection, fetches the requested slice, and leaves a [`UserPage`] in
//! the request extensions for the handler to render.

use axum::{
    extract::{rejection::QueryRejection, Query, Request, State},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{repo::UserStore, repo_types::User};
use crate::{error::AppError, state::AppState};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 5;

/// Raw query; values are parsed leniently so junk falls back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub limit: i64,
    pub start_index: i64,
    pub end_index: i64,
}

impl PageWindow {
    pub fn new(page: i64, limit: i64) -> Self {
        let page = if page < 1 { DEFAULT_PAGE } else { page };
        let limit = if limit < 1 { DEFAULT_LIMIT } else { limit };
        Self {
            page,
            limit,
            start_index: (page - 1).saturating_mul(limit),
            end_index: page.saturating_mul(limit),
        }
    }

    pub fn from_query(q: &PageQuery) -> Self {
        Self::new(
            positive(q.page.as_deref()).unwrap_or(DEFAULT_PAGE),
            positive(q.limit.as_deref()).unwrap_or(DEFAULT_LIMIT),
        )
    }

    pub fn next(&self, count: i64) -> Option<PageRef> {
        (self.end_index < count).then(|| PageRef {
            page: self.page + 1,
            limit: self.limit,
        })
    }

    pub fn previous(&self) -> Option<PageRef> {
        (self.start_index > 0).then(|| PageRef {
            page: self.page - 1,
            limit: self.limit,
        })
    }
}

fn positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
}

/// One page of accounts plus navigation links.
#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub page: i64,
    pub limit: i64,
    pub results: Vec<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<PageRef>,
}

pub async fn load_page(users: &dyn UserStore, window: PageWindow) -> Result<UserPage, AppError> {
    let count = users.count().await?;
    let results = users.page(window.start_index, window.limit).await?;
    Ok(UserPage {
        page: window.page,
        limit: window.limit,
        results,
        next: window.next(count),
        previous: window.previous(),
    })
}

pub async fn paginate(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let window = PageWindow::from_query(&query);
    let page = load_page(state.users.as_ref(), window).await?;
    debug!(page = page.page, limit = page.limit, returned = page.results.len(), "page loaded");
    req.extensions_mut().insert(page);
    Ok(next.run(req).await)
}
