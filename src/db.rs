use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

/// Failures of the record store, shared by every repository.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
    #[error("email already registered")]
    DuplicateEmail,
}

impl StoreError {
    /// Maps a unique-constraint violation to `DuplicateEmail`, anything else to `Unavailable`.
    pub fn from_write(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateEmail,
            _ => StoreError::Unavailable(err),
        }
    }
}

pub async fn connect(url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("connect to database")
}

/// The cache pool connects on first use so a missing cache never blocks startup.
pub fn connect_lazy(url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(4)
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy(url)
        .context("configure token cache pool")
}
