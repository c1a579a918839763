use std::collections::HashSet;

use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    error::{ServiceError, ServiceResult},
    models::{
        content::{update_qr_blocks, validate_blocks, ContentBlock, PositioningConfig},
        stop::{CreateStopRequest, QrCodeInfo, Stop, UpdateStopRequest},
    },
    services::{
        slug::{self, slugify},
        tours::TourService,
    },
};

/// Point the QR positioning (blocks and primary config) at a stop's short URL.
pub fn apply_qr_code(
    content: &mut [ContentBlock],
    primary: Option<&mut PositioningConfig>,
    url: &str,
    short_code: &str,
) {
    update_qr_blocks(content, url, short_code);
    if let Some(PositioningConfig::QrCode { url: u, short_code: c }) = primary {
        *u = url.to_string();
        *c = short_code.to_string();
    }
}

pub struct StopService;

impl StopService {
    pub async fn list_by_tour(pool: &SqlitePool, tour_id: &str) -> ServiceResult<Vec<Stop>> {
        let stops = sqlx::query_as::<_, Stop>(
            "SELECT * FROM stops WHERE tour_id = ?1 ORDER BY position ASC, created_at ASC",
        )
        .bind(tour_id)
        .fetch_all(pool)
        .await?;
        Ok(stops)
    }

    pub async fn get(pool: &SqlitePool, id: &str) -> ServiceResult<Stop> {
        sqlx::query_as::<_, Stop>("SELECT * FROM stops WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(ServiceError::NotFound("Stop"))
    }

    pub async fn find_in_tour_by_slug(
        pool: &SqlitePool,
        tour_id: &str,
        slug: &str,
    ) -> ServiceResult<Option<Stop>> {
        let stop = sqlx::query_as::<_, Stop>("SELECT * FROM stops WHERE tour_id = ?1 AND slug = ?2")
            .bind(tour_id)
            .bind(slug)
            .fetch_optional(pool)
            .await?;
        Ok(stop)
    }

    pub async fn find_by_short_code(pool: &SqlitePool, code: &str) -> ServiceResult<Option<Stop>> {
        let stop = sqlx::query_as::<_, Stop>("SELECT * FROM stops WHERE short_code = ?1")
            .bind(code.to_lowercase())
            .fetch_optional(pool)
            .await?;
        Ok(stop)
    }

    /// Append a stop to the end of a tour.
    pub async fn create(
        pool: &SqlitePool,
        tour_id: &str,
        req: CreateStopRequest,
        public_base_url: &str,
    ) -> ServiceResult<Stop> {
        let tour = TourService::get(pool, tour_id).await?;
        if req.title.is_empty() {
            return Err(ServiceError::invalid("Title is required"));
        }
        validate_blocks(&req.content).map_err(ServiceError::Invalid)?;

        let base = match req.slug.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(s) => slugify(s),
            None => slugify(
                req.title
                    .resolve(&tour.primary_language, "en")
                    .unwrap_or_default(),
            ),
        };
        let slug = slug::unique_stop_slug(pool, &tour.id, &base, None).await?;
        let short_code = slug::unused_short_code(pool).await?;

        let mut content = req.content;
        let mut positioning = req.primary_positioning;
        apply_qr_code(
            &mut content,
            positioning.as_mut(),
            &slug::short_url(public_base_url, &short_code),
            &short_code,
        );

        let now = Utc::now();
        let stop = sqlx::query_as::<_, Stop>(
            "INSERT INTO stops
             (id, tour_id, position, stop_type, title, description, slug, image, short_code,
              content, primary_positioning, created_at, updated_at)
             VALUES (?1, ?2,
                     (SELECT COALESCE(MAX(position) + 1, 0) FROM stops WHERE tour_id = ?2),
                     ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&tour.id)
        .bind(req.stop_type)
        .bind(Json(&req.title))
        .bind(Json(&req.description))
        .bind(&slug)
        .bind(req.image.filter(|s| !s.is_empty()))
        .bind(&short_code)
        .bind(Json(&content))
        .bind(positioning.as_ref().map(Json))
        .bind(now)
        .fetch_one(pool)
        .await?;

        tracing::info!(stop_id = %stop.id, tour_id = %tour.id, "stop created");
        Ok(stop)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: &str,
        req: UpdateStopRequest,
        public_base_url: &str,
    ) -> ServiceResult<Stop> {
        let mut stop = Self::get(pool, id).await?;

        if let Some(title) = req.title {
            if title.is_empty() {
                return Err(ServiceError::invalid("Title is required"));
            }
            stop.title = title;
        }
        if let Some(description) = req.description {
            stop.description = description;
        }
        if let Some(slug) = req.slug.filter(|s| !s.trim().is_empty()) {
            let base = slugify(&slug);
            if base != stop.slug {
                stop.slug = slug::unique_stop_slug(pool, &stop.tour_id, &base, Some(&stop.id)).await?;
            }
        }
        if let Some(stop_type) = req.stop_type {
            stop.stop_type = stop_type;
        }
        if let Some(image) = req.image {
            stop.image = Some(image).filter(|s| !s.is_empty());
        }
        if let Some(content) = req.content {
            validate_blocks(&content).map_err(ServiceError::Invalid)?;
            stop.content = content;
        }
        if let Some(positioning) = req.primary_positioning {
            stop.primary_positioning = Some(positioning);
        }

        // Incoming QR blocks may carry stale or blank codes; the stored one wins.
        let url = slug::short_url(public_base_url, &stop.short_code);
        apply_qr_code(
            &mut stop.content,
            stop.primary_positioning.as_mut(),
            &url,
            &stop.short_code,
        );

        Self::save(pool, &stop).await
    }

    pub async fn save(pool: &SqlitePool, stop: &Stop) -> ServiceResult<Stop> {
        let saved = sqlx::query_as::<_, Stop>(
            "UPDATE stops SET
                stop_type = ?2, title = ?3, description = ?4, slug = ?5, image = ?6,
                short_code = ?7, content = ?8, primary_positioning = ?9, updated_at = ?10
             WHERE id = ?1
             RETURNING *",
        )
        .bind(&stop.id)
        .bind(stop.stop_type)
        .bind(Json(&stop.title))
        .bind(Json(&stop.description))
        .bind(&stop.slug)
        .bind(&stop.image)
        .bind(&stop.short_code)
        .bind(Json(&stop.content))
        .bind(stop.primary_positioning.as_ref().map(Json))
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;
        Ok(saved)
    }

    /// Delete a stop and close the gap it leaves in the tour's ordering.
    pub async fn delete(pool: &SqlitePool, id: &str) -> ServiceResult<()> {
        let stop = Self::get(pool, id).await?;

        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM stops WHERE id = ?1")
            .bind(&stop.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE stops SET position = position - 1 WHERE tour_id = ?1 AND position > ?2")
            .bind(&stop.tour_id)
            .bind(stop.position)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(stop_id = %id, tour_id = %stop.tour_id, "stop deleted");
        Ok(())
    }

    /// Apply a new order. `stop_ids` must be a permutation of the tour's stops.
    pub async fn reorder(
        pool: &SqlitePool,
        tour_id: &str,
        stop_ids: &[String],
    ) -> ServiceResult<Vec<Stop>> {
        TourService::get(pool, tour_id).await?;
        let current: Vec<String> = sqlx::query_scalar("SELECT id FROM stops WHERE tour_id = ?1")
            .bind(tour_id)
            .fetch_all(pool)
            .await?;

        let current_set: HashSet<&str> = current.iter().map(String::as_str).collect();
        let requested_set: HashSet<&str> = stop_ids.iter().map(String::as_str).collect();
        if requested_set.len() != stop_ids.len() || current_set != requested_set {
            return Err(ServiceError::invalid(
                "stopIds must list every stop of the tour exactly once",
            ));
        }

        let mut tx = pool.begin().await?;
        let now = Utc::now();
        for (position, stop_id) in stop_ids.iter().enumerate() {
            sqlx::query("UPDATE stops SET position = ?1, updated_at = ?2 WHERE id = ?3")
                .bind(position as i64)
                .bind(now)
                .bind(stop_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Self::list_by_tour(pool, tour_id).await
    }

    /// Issue a fresh short code for a stop and rewrite its QR positioning.
    /// Previously printed QR codes stop resolving.
    pub async fn regenerate_qr(
        pool: &SqlitePool,
        id: &str,
        public_base_url: &str,
    ) -> ServiceResult<QrCodeInfo> {
        let mut stop = Self::get(pool, id).await?;
        let tour = TourService::get(pool, &stop.tour_id).await?;

        stop.short_code = slug::unused_short_code(pool).await?;
        let url = slug::short_url(public_base_url, &stop.short_code);
        let mut positioning = stop
            .primary_positioning
            .take()
            .unwrap_or_else(|| PositioningConfig::QrCode {
                url: String::new(),
                short_code: String::new(),
            });
        apply_qr_code(&mut stop.content, Some(&mut positioning), &url, &stop.short_code);
        stop.primary_positioning = Some(positioning);

        let stop = Self::save(pool, &stop).await?;
        tracing::info!(stop_id = %stop.id, short_code = %stop.short_code, "QR code regenerated");

        Ok(QrCodeInfo {
            stop_id: stop.id,
            visitor_url: slug::visitor_url(public_base_url, &tour.slug, &stop.slug),
            short_code: stop.short_code,
            url,
        })
    }
}
