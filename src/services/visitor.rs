//! Public, read-only resolution of tours and stops for the visitor app.
//!
//! URLs may carry either the human-readable slug or the opaque id; the slug is
//! tried first. Drafts and archived tours are hidden unless `preview` is set.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    error::{ServiceError, ServiceResult},
    models::{
        stop::Stop,
        tour::{Tour, TourStatus, TourWithStops},
    },
    services::{slug, stops::StopService, tours::TourService},
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRef {
    pub id: String,
    pub slug: String,
}

impl From<&Stop> for StopRef {
    fn from(s: &Stop) -> Self {
        Self {
            id: s.id.clone(),
            slug: s.slug.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorStop {
    pub tour: Tour,
    pub stop: Stop,
    pub index: usize,
    pub total: usize,
    pub previous: Option<StopRef>,
    pub next: Option<StopRef>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortCodeTarget {
    pub tour_id: String,
    pub tour_slug: String,
    pub stop_id: String,
    pub stop_slug: String,
    /// Visitor URL to redirect to.
    pub url: String,
}

pub struct VisitorService;

impl VisitorService {
    async fn resolve_tour(pool: &SqlitePool, slug_or_id: &str, preview: bool) -> ServiceResult<Tour> {
        let tour = match TourService::find_by_slug(pool, slug_or_id).await? {
            Some(t) => t,
            None => TourService::get(pool, slug_or_id).await?,
        };
        if !preview && tour.status != TourStatus::Published {
            return Err(ServiceError::NotFound("Tour"));
        }
        Ok(tour)
    }

    pub async fn tour(pool: &SqlitePool, slug_or_id: &str, preview: bool) -> ServiceResult<TourWithStops> {
        let tour = Self::resolve_tour(pool, slug_or_id, preview).await?;
        let stops = StopService::list_by_tour(pool, &tour.id).await?;
        Ok(TourWithStops { tour, stops })
    }

    pub async fn stop(
        pool: &SqlitePool,
        tour_slug_or_id: &str,
        stop_slug_or_id: &str,
        preview: bool,
    ) -> ServiceResult<VisitorStop> {
        let tour = Self::resolve_tour(pool, tour_slug_or_id, preview).await?;
        let stops = StopService::list_by_tour(pool, &tour.id).await?;

        let index = stops
            .iter()
            .position(|s| s.slug == stop_slug_or_id)
            .or_else(|| stops.iter().position(|s| s.id == stop_slug_or_id))
            .ok_or(ServiceError::NotFound("Stop"))?;

        let previous = index.checked_sub(1).map(|i| StopRef::from(&stops[i]));
        let next = stops.get(index + 1).map(StopRef::from);
        let total = stops.len();
        let stop = stops
            .into_iter()
            .nth(index)
            .ok_or(ServiceError::NotFound("Stop"))?;

        Ok(VisitorStop {
            tour,
            stop,
            index,
            total,
            previous,
            next,
        })
    }

    pub async fn short_code(
        pool: &SqlitePool,
        code: &str,
        public_base_url: &str,
        preview: bool,
    ) -> ServiceResult<ShortCodeTarget> {
        let stop = StopService::find_by_short_code(pool, code)
            .await?
            .ok_or(ServiceError::NotFound("Short code"))?;
        let tour = TourService::get(pool, &stop.tour_id).await?;
        if !preview && tour.status != TourStatus::Published {
            return Err(ServiceError::NotFound("Short code"));
        }

        Ok(ShortCodeTarget {
            url: slug::visitor_url(public_base_url, &tour.slug, &stop.slug),
            tour_id: tour.id,
            tour_slug: tour.slug,
            stop_id: stop.id,
            stop_slug: stop.slug,
        })
    }
}
