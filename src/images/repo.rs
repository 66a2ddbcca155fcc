use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::StoreError;

/// Link between an account and an uploaded profile image.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn insert(&self, id: Uuid, user_id: Uuid, image_url: &str)
        -> Result<ProfileRecord, StoreError>;
}

#[derive(Clone)]
pub struct PgProfileStore {
    db: PgPool,
}

impl PgProfileStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn insert(
        &self,
        id: Uuid,
        user_id: Uuid,
        image_url: &str,
    ) -> Result<ProfileRecord, StoreError> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            r#"
            INSERT INTO user_profiles (id, user_id, image_url)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, image_url, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(image_url)
        .fetch_one(&self.db)
        .await?;
        Ok(record)
    }
}
