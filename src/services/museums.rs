use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    error::{ServiceError, ServiceResult},
    models::museum::{CreateTemplateRequest, Museum, MuseumRequest, Template},
    services::slug::{slugify, unique_slug},
};

const BLOCK_TYPES: &[&str] = &[
    "text", "image", "gallery", "audio", "video", "quote", "positioning", "map", "tour",
];

pub struct MuseumService;

impl MuseumService {
    pub async fn list(pool: &SqlitePool) -> ServiceResult<Vec<Museum>> {
        let museums = sqlx::query_as::<_, Museum>("SELECT * FROM museums ORDER BY name ASC")
            .fetch_all(pool)
            .await?;
        Ok(museums)
    }

    pub async fn get(pool: &SqlitePool, id: &str) -> ServiceResult<Museum> {
        sqlx::query_as::<_, Museum>("SELECT * FROM museums WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(ServiceError::NotFound("Museum"))
    }

    pub async fn create(pool: &SqlitePool, req: MuseumRequest) -> ServiceResult<Museum> {
        if req.name.trim().is_empty() {
            return Err(ServiceError::invalid("Name is required"));
        }
        let now = Utc::now();
        let museum = sqlx::query_as::<_, Museum>(
            "INSERT INTO museums (id, name, description, logo, website, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(req.name.trim())
        .bind(Json(&req.description))
        .bind(req.logo.filter(|s| !s.is_empty()))
        .bind(req.website.filter(|s| !s.is_empty()))
        .bind(now)
        .fetch_one(pool)
        .await?;
        Ok(museum)
    }

    pub async fn update(pool: &SqlitePool, id: &str, req: MuseumRequest) -> ServiceResult<Museum> {
        if req.name.trim().is_empty() {
            return Err(ServiceError::invalid("Name is required"));
        }
        sqlx::query_as::<_, Museum>(
            "UPDATE museums SET name = ?2, description = ?3, logo = ?4, website = ?5, updated_at = ?6
             WHERE id = ?1
             RETURNING *",
        )
        .bind(id)
        .bind(req.name.trim())
        .bind(Json(&req.description))
        .bind(req.logo.filter(|s| !s.is_empty()))
        .bind(req.website.filter(|s| !s.is_empty()))
        .bind(Utc::now())
        .fetch_optional(pool)
        .await?
        .ok_or(ServiceError::NotFound("Museum"))
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> ServiceResult<()> {
        let result = sqlx::query("DELETE FROM museums WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("Museum"));
        }
        Ok(())
    }
}

pub struct TemplateService;

impl TemplateService {
    /// Built-ins first, then custom templates by name.
    pub async fn list(pool: &SqlitePool) -> ServiceResult<Vec<Template>> {
        let templates = sqlx::query_as::<_, Template>(
            "SELECT * FROM templates ORDER BY built_in DESC, name ASC",
        )
        .fetch_all(pool)
        .await?;
        Ok(templates)
    }

    pub async fn get(pool: &SqlitePool, id: &str) -> ServiceResult<Template> {
        sqlx::query_as::<_, Template>("SELECT * FROM templates WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(ServiceError::NotFound("Template"))
    }

    /// Custom templates get a slug id derived from the name.
    pub async fn create(pool: &SqlitePool, req: CreateTemplateRequest) -> ServiceResult<Template> {
        if req.name.trim().is_empty() {
            return Err(ServiceError::invalid("Name is required"));
        }
        if let Some(bad) = req
            .default_blocks
            .iter()
            .find(|b| !BLOCK_TYPES.contains(&b.as_str()))
        {
            return Err(ServiceError::invalid(format!("Unknown block type: {bad}")));
        }

        let existing: Vec<String> = sqlx::query_scalar("SELECT id FROM templates")
            .fetch_all(pool)
            .await?;
        let id = unique_slug(&slugify(&req.name), |s| existing.iter().any(|e| e == s));

        let template = sqlx::query_as::<_, Template>(
            "INSERT INTO templates (id, name, description, built_in, default_blocks)
             VALUES (?1, ?2, ?3, 0, ?4)
             RETURNING *",
        )
        .bind(&id)
        .bind(req.name.trim())
        .bind(&req.description)
        .bind(Json(&req.default_blocks))
        .fetch_one(pool)
        .await?;
        Ok(template)
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> ServiceResult<()> {
        let template = Self::get(pool, id).await?;
        if template.built_in {
            return Err(ServiceError::invalid("Built-in templates cannot be deleted"));
        }
        sqlx::query("DELETE FROM templates WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn built_in_templates_are_seeded_and_protected() {
        let pool = db::create_memory_pool().await.unwrap();
        let templates = TemplateService::list(&pool).await.unwrap();
        assert_eq!(templates.len(), 5);
        assert!(templates.iter().all(|t| t.built_in));

        let err = TemplateService::delete(&pool, "artwork").await.unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
    }

    #[tokio::test]
    async fn custom_templates_get_unique_ids_and_can_be_deleted() {
        let pool = db::create_memory_pool().await.unwrap();
        let req = || CreateTemplateRequest {
            name: "Artwork".into(),
            description: String::new(),
            default_blocks: vec!["image".into(), "text".into()],
        };
        let custom = TemplateService::create(&pool, req()).await.unwrap();
        assert_eq!(custom.id, "artwork-1");
        assert!(!custom.built_in);

        TemplateService::delete(&pool, &custom.id).await.unwrap();
        assert!(TemplateService::get(&pool, &custom.id).await.is_err());
    }

    #[tokio::test]
    async fn unknown_block_types_are_rejected() {
        let pool = db::create_memory_pool().await.unwrap();
        let err = TemplateService::create(
            &pool,
            CreateTemplateRequest {
                name: "Odd".into(),
                description: String::new(),
                default_blocks: vec!["hologram".into()],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
    }
}
