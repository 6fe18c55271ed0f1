use std::sync::RwLock;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StoreError;

/// Metadata row for one stored blob.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct Image {
    pub id: Uuid,
    pub filename: String, // storage key under the upload dir
    pub user_id: Uuid,    // owner, taken from the uploader's token
    #[serde(with = "time::serde::rfc3339")]
    pub upload_time: OffsetDateTime,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn insert(&self, image: &Image) -> Result<(), StoreError>;
    async fn list_all(&self) -> Result<Vec<Image>, StoreError>;
    async fn find(&self, id: Uuid) -> Result<Option<Image>, StoreError>;
    /// Removes the row and hands it back, or `None` if it was already gone.
    async fn delete(&self, id: Uuid) -> Result<Option<Image>, StoreError>;
}

#[derive(Clone)]
pub struct PgImageStore {
    db: PgPool,
}

impl PgImageStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ImageStore for PgImageStore {
    async fn insert(&self, image: &Image) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO images (id, filename, user_id, upload_time)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(image.id)
        .bind(&image.filename)
        .bind(image.user_id)
        .bind(image.upload_time)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Image>, StoreError> {
        let rows = sqlx::query_as::<_, Image>(
            r#"
            SELECT id, filename, user_id, upload_time
              FROM images
             ORDER BY upload_time ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list images")?;
        Ok(rows)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Image>, StoreError> {
        let row = sqlx::query_as::<_, Image>(
            r#"
            SELECT id, filename, user_id, upload_time
              FROM images
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find image")?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Image>, StoreError> {
        let row = sqlx::query_as::<_, Image>(
            r#"
            DELETE FROM images
             WHERE id = $1
            RETURNING id, filename, user_id, upload_time
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("delete image")?;
        Ok(row)
    }
}

#[derive(Default)]
pub struct MemoryImageStore {
    images: RwLock<Vec<Image>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Other(anyhow::anyhow!("image store lock poisoned"))
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn insert(&self, image: &Image) -> Result<(), StoreError> {
        let mut images = self.images.write().map_err(poisoned)?;
        if images.iter().any(|i| i.id == image.id) {
            return Err(StoreError::Conflict);
        }
        images.push(image.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Image>, StoreError> {
        let mut rows = self.images.read().map_err(poisoned)?.clone();
        rows.sort_by_key(|i| i.upload_time);
        Ok(rows)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Image>, StoreError> {
        let images = self.images.read().map_err(poisoned)?;
        Ok(images.iter().find(|i| i.id == id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Image>, StoreError> {
        let mut images = self.images.write().map_err(poisoned)?;
        Ok(images
            .iter()
            .position(|i| i.id == id)
            .map(|idx| images.remove(idx)))
    }
}
