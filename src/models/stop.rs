use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::content::{ContentBlock, PositioningConfig};
use super::i18n::LocalizedText;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum StopType {
    #[default]
    Mandatory,
    Optional,
    Bonus,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub id: String,
    pub tour_id: String,
    /// 0-based position within the tour.
    #[serde(rename = "order")]
    pub position: i64,
    #[serde(rename = "type")]
    pub stop_type: StopType,
    #[sqlx(json)]
    pub title: LocalizedText,
    #[sqlx(json)]
    pub description: LocalizedText,
    pub slug: String,
    pub image: Option<String>,
    pub short_code: String,
    #[sqlx(json)]
    pub content: Vec<ContentBlock>,
    #[sqlx(json(nullable))]
    pub primary_positioning: Option<PositioningConfig>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStopRequest {
    pub title: LocalizedText,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: LocalizedText,
    #[serde(default, rename = "type")]
    pub stop_type: StopType,
    pub image: Option<String>,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    pub primary_positioning: Option<PositioningConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStopRequest {
    pub title: Option<LocalizedText>,
    pub slug: Option<String>,
    pub description: Option<LocalizedText>,
    #[serde(rename = "type")]
    pub stop_type: Option<StopType>,
    /// Empty string clears the image.
    pub image: Option<String>,
    pub content: Option<Vec<ContentBlock>>,
    pub primary_positioning: Option<PositioningConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderStopsRequest {
    pub stop_ids: Vec<String>,
}

/// QR payload after regeneration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeInfo {
    pub stop_id: String,
    pub short_code: String,
    /// Short URL encoded in the printed QR code.
    pub url: String,
    /// Long, human-readable visitor URL.
    pub visitor_url: String,
}
