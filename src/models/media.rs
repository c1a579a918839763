use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::i18n::LocalizedText;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Document,
}

impl MediaKind {
    /// Classify an upload by its content type, falling back to the file extension.
    pub fn detect(content_type: &str, filename: &str) -> Self {
        let ct = if content_type.is_empty() || content_type == "application/octet-stream" {
            mime_guess::from_path(filename)
                .first_raw()
                .unwrap_or("application/octet-stream")
        } else {
            content_type
        };
        if ct.starts_with("image/") {
            MediaKind::Image
        } else if ct.starts_with("audio/") {
            MediaKind::Audio
        } else {
            MediaKind::Document
        }
    }

    /// Subdirectory of the uploads root.
    pub fn dir(self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Audio => "audio",
            MediaKind::Document => "documents",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Document => "document",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: String,
    /// Name on disk, `<uuid>.<ext>`.
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub kind: MediaKind,
    pub url: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    #[sqlx(json)]
    pub alt: LocalizedText,
    #[sqlx(json)]
    pub caption: LocalizedText,
    #[sqlx(json)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MediaQuery {
    pub kind: Option<MediaKind>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMediaRequest {
    pub alt: Option<LocalizedText>,
    pub caption: Option<LocalizedText>,
    pub tags: Option<Vec<String>>,
}
