use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    error::{ServiceError, ServiceResult},
    models::{
        i18n::normalize_languages,
        stop::Stop,
        tour::{CreateTourRequest, Tour, TourQuery, TourStatus, TourWithStops, UpdateTourRequest},
    },
    services::{
        slug::{self, slugify},
        stops::{apply_qr_code, StopService},
    },
};

pub struct TourService;

impl TourService {
    pub async fn list(pool: &SqlitePool, query: &TourQuery) -> ServiceResult<Vec<Tour>> {
        let tours = sqlx::query_as::<_, Tour>(
            "SELECT * FROM tours
             WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR museum_id = ?2)
             ORDER BY updated_at DESC",
        )
        .bind(query.status)
        .bind(&query.museum_id)
        .fetch_all(pool)
        .await?;
        Ok(tours)
    }

    pub async fn get(pool: &SqlitePool, id: &str) -> ServiceResult<Tour> {
        sqlx::query_as::<_, Tour>("SELECT * FROM tours WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(ServiceError::NotFound("Tour"))
    }

    pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> ServiceResult<Option<Tour>> {
        let tour = sqlx::query_as::<_, Tour>("SELECT * FROM tours WHERE slug = ?1")
            .bind(slug)
            .fetch_optional(pool)
            .await?;
        Ok(tour)
    }

    pub async fn get_with_stops(pool: &SqlitePool, id: &str) -> ServiceResult<TourWithStops> {
        let tour = Self::get(pool, id).await?;
        let stops = StopService::list_by_tour(pool, &tour.id).await?;
        Ok(TourWithStops { tour, stops })
    }

    /// New tours always start as version 1 drafts.
    pub async fn create(pool: &SqlitePool, req: CreateTourRequest) -> ServiceResult<Tour> {
        if req.title.is_empty() {
            return Err(ServiceError::invalid("Title is required"));
        }

        let primary = req
            .primary_language
            .as_deref()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| "en".into());
        let languages = normalize_languages(&primary, &req.languages);

        let base = match req.slug.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(s) => slugify(s),
            None => slugify(req.title.resolve(&primary, "en").unwrap_or_default()),
        };
        let slug = slug::unique_tour_slug(pool, &base, None).await?;

        let now = Utc::now();
        let tour = sqlx::query_as::<_, Tour>(
            "INSERT INTO tours
             (id, museum_id, template_id, title, slug, description, hero_image, languages,
              primary_language, duration, difficulty, status, version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 1, ?13, ?13)
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&req.museum_id)
        .bind(&req.template_id)
        .bind(Json(&req.title))
        .bind(&slug)
        .bind(Json(&req.description))
        .bind(req.hero_image.filter(|s| !s.is_empty()))
        .bind(Json(&languages))
        .bind(&primary)
        .bind(req.duration.unwrap_or(30).max(0))
        .bind(req.difficulty)
        .bind(TourStatus::Draft)
        .bind(now)
        .fetch_one(pool)
        .await?;

        tracing::info!(tour_id = %tour.id, slug = %tour.slug, "tour created");
        Ok(tour)
    }

    /// Merge a partial update. Every successful update bumps `version`.
    pub async fn update(pool: &SqlitePool, id: &str, req: UpdateTourRequest) -> ServiceResult<Tour> {
        let mut tour = Self::get(pool, id).await?;

        if let Some(title) = req.title {
            if title.is_empty() {
                return Err(ServiceError::invalid("Title is required"));
            }
            tour.title = title;
        }
        if let Some(description) = req.description {
            tour.description = description;
        }
        if let Some(slug) = req.slug.filter(|s| !s.trim().is_empty()) {
            let base = slugify(&slug);
            if base != tour.slug {
                tour.slug = slug::unique_tour_slug(pool, &base, Some(&tour.id)).await?;
            }
        }
        if let Some(hero) = req.hero_image {
            tour.hero_image = Some(hero).filter(|s| !s.is_empty());
        }
        if let Some(primary) = req.primary_language {
            let primary = primary.trim().to_lowercase();
            if primary.is_empty() {
                return Err(ServiceError::invalid("primaryLanguage cannot be empty"));
            }
            tour.primary_language = primary;
        }
        if let Some(languages) = req.languages {
            tour.languages = languages;
        }
        tour.languages = normalize_languages(&tour.primary_language, &tour.languages);
        if let Some(duration) = req.duration {
            tour.duration = duration.max(0);
        }
        if let Some(difficulty) = req.difficulty {
            tour.difficulty = difficulty;
        }
        if let Some(status) = req.status {
            if status == TourStatus::Published && tour.status != TourStatus::Published {
                tour.published_at = Some(Utc::now());
            }
            tour.status = status;
        }
        if let Some(museum_id) = req.museum_id {
            tour.museum_id = Some(museum_id).filter(|s| !s.is_empty());
        }
        if let Some(template_id) = req.template_id {
            tour.template_id = Some(template_id).filter(|s| !s.is_empty());
        }

        let updated = sqlx::query_as::<_, Tour>(
            "UPDATE tours SET
                museum_id = ?2, template_id = ?3, title = ?4, slug = ?5, description = ?6,
                hero_image = ?7, languages = ?8, primary_language = ?9, duration = ?10,
                difficulty = ?11, status = ?12, version = version + 1, updated_at = ?13,
                published_at = ?14
             WHERE id = ?1
             RETURNING *",
        )
        .bind(&tour.id)
        .bind(&tour.museum_id)
        .bind(&tour.template_id)
        .bind(Json(&tour.title))
        .bind(&tour.slug)
        .bind(Json(&tour.description))
        .bind(&tour.hero_image)
        .bind(Json(&tour.languages))
        .bind(&tour.primary_language)
        .bind(tour.duration)
        .bind(tour.difficulty)
        .bind(tour.status)
        .bind(Utc::now())
        .bind(tour.published_at)
        .fetch_one(pool)
        .await?;

        Ok(updated)
    }

    pub async fn set_status(pool: &SqlitePool, id: &str, status: TourStatus) -> ServiceResult<Tour> {
        Self::update(
            pool,
            id,
            UpdateTourRequest {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    /// Delete a tour; its stops go with it through the foreign-key cascade.
    pub async fn delete(pool: &SqlitePool, id: &str) -> ServiceResult<()> {
        let result = sqlx::query("DELETE FROM tours WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("Tour"));
        }
        tracing::info!(tour_id = %id, "tour deleted");
        Ok(())
    }

    /// Copy a tour and its stops. The copy is a fresh version 1 draft with its own
    /// slug; stops keep their slugs (scoped per tour) but get new ids and short codes.
    pub async fn duplicate(
        pool: &SqlitePool,
        id: &str,
        public_base_url: &str,
    ) -> ServiceResult<TourWithStops> {
        let source = Self::get_with_stops(pool, id).await?;
        let slug = slug::unique_tour_slug(pool, &source.tour.slug, None).await?;
        let now = Utc::now();
        let new_id = Uuid::new_v4().to_string();

        // Codes are drawn before the transaction opens so no second connection is needed.
        let mut codes: Vec<String> = Vec::with_capacity(source.stops.len());
        while codes.len() < source.stops.len() {
            let code = slug::unused_short_code(pool).await?;
            if !codes.contains(&code) {
                codes.push(code);
            }
        }

        let mut tx = pool.begin().await?;

        let tour = sqlx::query_as::<_, Tour>(
            "INSERT INTO tours
             (id, museum_id, template_id, title, slug, description, hero_image, languages,
              primary_language, duration, difficulty, status, version, created_at, updated_at)
             SELECT ?2, museum_id, template_id, title, ?3, description, hero_image, languages,
                    primary_language, duration, difficulty, 'draft', 1, ?4, ?4
             FROM tours WHERE id = ?1
             RETURNING *",
        )
        .bind(&source.tour.id)
        .bind(&new_id)
        .bind(&slug)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let mut stops = Vec::with_capacity(source.stops.len());
        for (stop, short_code) in source.stops.into_iter().zip(codes) {
            let mut content = stop.content;
            let mut positioning = stop.primary_positioning;
            apply_qr_code(
                &mut content,
                positioning.as_mut(),
                &slug::short_url(public_base_url, &short_code),
                &short_code,
            );

            let copy = sqlx::query_as::<_, Stop>(
                "INSERT INTO stops
                 (id, tour_id, position, stop_type, title, description, slug, image, short_code,
                  content, primary_positioning, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
                 RETURNING *",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&new_id)
            .bind(stop.position)
            .bind(stop.stop_type)
            .bind(Json(&stop.title))
            .bind(Json(&stop.description))
            .bind(&stop.slug)
            .bind(&stop.image)
            .bind(&short_code)
            .bind(Json(&content))
            .bind(positioning.as_ref().map(Json))
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            stops.push(copy);
        }

        tx.commit().await?;
        tracing::info!(source = %id, tour_id = %tour.id, "tour duplicated");
        Ok(TourWithStops { tour, stops })
    }
}
