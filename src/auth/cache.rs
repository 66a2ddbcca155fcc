//! Single-slot side cache holding the most recently issued session token.
//!
//! The slot is keyed by a fixed logical name and carries its own expiry,
//! independent of the token's embedded `exp`. Every write replaces the slot
//! wholesale, so concurrent logins resolve as last-writer-wins.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

#[derive(Debug, thiserror::Error)]
pub enum TokenCacheError {
    #[error("token cache unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Overwrites the slot; the value disappears after `ttl`.
    async fn set(&self, token: &str, ttl: Duration) -> Result<(), TokenCacheError>;
    /// The current token, or `None` if the slot is empty or expired.
    async fn get(&self) -> Result<Option<String>, TokenCacheError>;
}

/// Postgres-backed slot, usually on its own connection string.
#[derive(Clone)]
pub struct PgTokenCache {
    db: PgPool,
    key: String,
}

impl PgTokenCache {
    pub fn new(db: PgPool, key: impl Into<String>) -> Self {
        Self { db, key: key.into() }
    }

    pub async fn ensure_schema(&self) -> Result<(), TokenCacheError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS token_cache (
                key        TEXT PRIMARY KEY,
                token      TEXT NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl TokenCache for PgTokenCache {
    async fn set(&self, token: &str, ttl: Duration) -> Result<(), TokenCacheError> {
        let expires_at = OffsetDateTime::now_utc() + ttl;
        sqlx::query(
            r#"
            INSERT INTO token_cache (key, token, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE
               SET token = EXCLUDED.token,
                   expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(&self.key)
        .bind(token)
        .bind(expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get(&self) -> Result<Option<String>, TokenCacheError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT token FROM token_cache WHERE key = $1 AND expires_at > now()",
        )
        .bind(&self.key)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(|(token,)| token))
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::memory::MemoryTokenCache;
    use super::*;

    const TTL: Duration = Duration::from_secs(120);

    #[tokio::test]
    async fn empty_cache_has_no_token() {
        let cache = MemoryTokenCache::default();
        assert_eq!(cache.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn later_set_replaces_earlier() {
        let cache = MemoryTokenCache::default();
        cache.set("first", TTL).await.unwrap();
        cache.set("second", TTL).await.unwrap();
        assert_eq!(cache.get().await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn last_write_wins_after_concurrent_logins() {
        let cache = Arc::new(MemoryTokenCache::default());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.set(&format!("token-{i}"), TTL).await })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }
        let raced = cache.get().await.unwrap().expect("some token present");
        assert!(raced.starts_with("token-"));

        cache.set("final", TTL).await.unwrap();
        assert_eq!(cache.get().await.unwrap().as_deref(), Some("final"));
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_after_its_own_ttl() {
        let cache = MemoryTokenCache::default();
        cache.set("short-lived", Duration::from_secs(2)).await.unwrap();
        assert!(cache.get().await.unwrap().is_some());
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(cache.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn offline_cache_reports_unavailable() {
        let cache = MemoryTokenCache::default();
        cache.set_offline(true);
        assert!(matches!(
            cache.get().await,
            Err(TokenCacheError::Unavailable(_))
        ));
    }
}
