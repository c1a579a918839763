use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    error::{ServiceError, ServiceResult},
    models::collection::{
        Collection, CollectionItem, CreateCollectionRequest, UpdateCollectionRequest,
    },
};

pub struct CollectionService;

impl CollectionService {
    pub async fn list(pool: &SqlitePool) -> ServiceResult<Vec<Collection>> {
        let items = sqlx::query_as::<_, Collection>("SELECT * FROM collections ORDER BY updated_at DESC")
            .fetch_all(pool)
            .await?;
        Ok(items)
    }

    pub async fn get(pool: &SqlitePool, id: &str) -> ServiceResult<Collection> {
        sqlx::query_as::<_, Collection>("SELECT * FROM collections WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(ServiceError::NotFound("Collection"))
    }

    pub async fn create(pool: &SqlitePool, req: CreateCollectionRequest) -> ServiceResult<Collection> {
        if req.name.is_empty() {
            return Err(ServiceError::invalid("Name is required"));
        }
        let items = sorted_items(req.items);
        let now = Utc::now();

        let collection = sqlx::query_as::<_, Collection>(
            "INSERT INTO collections
             (id, museum_id, name, description, collection_type, items, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(req.museum_id.filter(|s| !s.is_empty()))
        .bind(Json(&req.name))
        .bind(Json(&req.description))
        .bind(req.collection_type)
        .bind(Json(&items))
        .bind(now)
        .fetch_one(pool)
        .await?;
        Ok(collection)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: &str,
        req: UpdateCollectionRequest,
    ) -> ServiceResult<Collection> {
        let mut collection = Self::get(pool, id).await?;
        if let Some(name) = req.name {
            if name.is_empty() {
                return Err(ServiceError::invalid("Name is required"));
            }
            collection.name = name;
        }
        if let Some(description) = req.description {
            collection.description = description;
        }
        if let Some(kind) = req.collection_type {
            collection.collection_type = kind;
        }
        if let Some(items) = req.items {
            collection.items = sorted_items(items);
        }

        let collection = sqlx::query_as::<_, Collection>(
            "UPDATE collections SET name = ?2, description = ?3, collection_type = ?4, items = ?5,
                updated_at = ?6
             WHERE id = ?1
             RETURNING *",
        )
        .bind(&collection.id)
        .bind(Json(&collection.name))
        .bind(Json(&collection.description))
        .bind(collection.collection_type)
        .bind(Json(&collection.items))
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;
        Ok(collection)
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> ServiceResult<()> {
        let result = sqlx::query("DELETE FROM collections WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("Collection"));
        }
        Ok(())
    }
}

/// Items sorted by `order`, renumbered from 0.
fn sorted_items(mut items: Vec<CollectionItem>) -> Vec<CollectionItem> {
    items.sort_by_key(|i| i.order);
    for (n, item) in items.iter_mut().enumerate() {
        item.order = n as i64;
    }
    items
}
