use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::i18n::LocalizedText;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CollectionType {
    #[default]
    Gallery,
    Dataset,
    Objects,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
    pub url: String,
    #[serde(default)]
    pub caption: LocalizedText,
    #[serde(default)]
    pub order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub museum_id: Option<String>,
    #[sqlx(json)]
    pub name: LocalizedText,
    #[sqlx(json)]
    pub description: LocalizedText,
    #[serde(rename = "type")]
    pub collection_type: CollectionType,
    #[sqlx(json)]
    pub items: Vec<CollectionItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionRequest {
    pub name: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    #[serde(default, rename = "type")]
    pub collection_type: CollectionType,
    #[serde(default)]
    pub items: Vec<CollectionItem>,
    pub museum_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCollectionRequest {
    pub name: Option<LocalizedText>,
    pub description: Option<LocalizedText>,
    #[serde(rename = "type")]
    pub collection_type: Option<CollectionType>,
    pub items: Option<Vec<CollectionItem>>,
}
