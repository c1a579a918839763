use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::i18n::LocalizedText;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ConciergeConfig {
    pub id: String,
    pub museum_id: Option<String>,
    /// Set for per-tour overrides; `None` for the global config.
    pub tour_id: Option<String>,
    pub enabled: bool,
    pub persona: String,
    #[sqlx(json)]
    pub welcome_message: LocalizedText,
    pub system_prompt: String,
    #[sqlx(json)]
    pub languages: Vec<String>,
    pub model: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum KnowledgeSource {
    #[default]
    Text,
    Document,
    Url,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ConciergeKnowledge {
    pub id: String,
    pub config_id: String,
    pub title: String,
    pub content: String,
    pub source_type: KnowledgeSource,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ConciergeQuickAction {
    pub id: String,
    pub config_id: String,
    #[sqlx(json)]
    pub question: LocalizedText,
    pub category: String,
    #[serde(rename = "order")]
    pub position: i64,
    pub enabled: bool,
}

/// Config plus its knowledge and quick actions, as served to the admin and visitor apps.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConciergeBundle {
    pub config: ConciergeConfig,
    pub knowledge: Vec<ConciergeKnowledge>,
    pub quick_actions: Vec<ConciergeQuickAction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigScope {
    pub tour_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConciergeConfigRequest {
    pub tour_id: Option<String>,
    pub museum_id: Option<String>,
    pub enabled: Option<bool>,
    pub persona: Option<String>,
    pub welcome_message: Option<LocalizedText>,
    pub system_prompt: Option<String>,
    pub languages: Option<Vec<String>>,
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeRequest {
    pub tour_id: Option<String>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub source_type: KnowledgeSource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickActionRequest {
    pub tour_id: Option<String>,
    pub question: LocalizedText,
    #[serde(default = "default_category")]
    pub category: String,
    pub order: Option<i64>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_category() -> String {
    "general".into()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateQuickActionsRequest {
    pub tour_id: Option<String>,
    pub source_language: Option<String>,
    pub target_languages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_language")]
    pub language: String,
    pub tour_id: Option<String>,
    pub stop_id: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

fn default_language() -> String {
    "en".into()
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}
