use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::i18n::LocalizedText;
use super::stop::Stop;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TourStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    General,
    Family,
    Academic,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    pub id: String,
    pub museum_id: Option<String>,
    pub template_id: Option<String>,
    #[sqlx(json)]
    pub title: LocalizedText,
    pub slug: String,
    #[sqlx(json)]
    pub description: LocalizedText,
    pub hero_image: Option<String>,
    #[sqlx(json)]
    pub languages: Vec<String>,
    pub primary_language: String,
    /// Estimated duration in minutes.
    pub duration: i64,
    pub difficulty: Difficulty,
    pub status: TourStatus,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

/// A tour with its ordered stops, as returned by detail and visitor endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TourWithStops {
    #[serde(flatten)]
    pub tour: Tour,
    pub stops: Vec<Stop>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourQuery {
    pub status: Option<TourStatus>,
    pub museum_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTourRequest {
    pub title: LocalizedText,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: LocalizedText,
    pub hero_image: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    pub primary_language: Option<String>,
    pub duration: Option<i64>,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub museum_id: Option<String>,
    pub template_id: Option<String>,
}

/// Partial update; absent fields are left as they are.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTourRequest {
    pub title: Option<LocalizedText>,
    pub slug: Option<String>,
    pub description: Option<LocalizedText>,
    /// Empty string clears the hero image.
    pub hero_image: Option<String>,
    pub languages: Option<Vec<String>>,
    pub primary_language: Option<String>,
    pub duration: Option<i64>,
    pub difficulty: Option<Difficulty>,
    pub status: Option<TourStatus>,
    pub museum_id: Option<String>,
    pub template_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateTourRequest {
    /// Defaults to every language of the tour other than the primary one.
    #[serde(default)]
    pub target_languages: Vec<String>,
    /// Overwrite existing translations instead of only filling gaps.
    #[serde(default)]
    pub overwrite: bool,
}
