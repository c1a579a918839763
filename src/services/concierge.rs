use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    error::{ServiceError, ServiceResult},
    models::{
        concierge::{
            ChatRequest, ChatResponse, ConciergeBundle, ConciergeConfig, ConciergeKnowledge,
            ConciergeQuickAction, KnowledgeRequest, QuickActionRequest,
            TranslateQuickActionsRequest, UpdateConciergeConfigRequest,
        },
        content::BlockBody,
        i18n::LocalizedText,
        tour::TourStatus,
    },
    services::{
        gemini::GeminiClient, stops::StopService, tours::TourService, translate::Translator,
    },
};

/// Fixed id of the museum-wide config row.
const GLOBAL_CONFIG_ID: &str = "global";
/// Only the most recent turns are forwarded to the model.
const MAX_HISTORY_TURNS: usize = 20;

pub struct ConciergeService;

impl ConciergeService {
    /// The global config, created with defaults on first use.
    pub async fn global_config(pool: &SqlitePool, default_model: &str) -> ServiceResult<ConciergeConfig> {
        sqlx::query(
            "INSERT OR IGNORE INTO concierge_configs
             (id, enabled, persona, welcome_message, system_prompt, languages, model, updated_at)
             VALUES (?1, 1, 'friendly', ?2, '', '[\"en\"]', ?3, ?4)",
        )
        .bind(GLOBAL_CONFIG_ID)
        .bind(Json(LocalizedText::single(
            "en",
            "Hello! Ask me anything about the museum and its collection.",
        )))
        .bind(default_model)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        let config = sqlx::query_as::<_, ConciergeConfig>("SELECT * FROM concierge_configs WHERE id = ?1")
            .bind(GLOBAL_CONFIG_ID)
            .fetch_one(pool)
            .await?;
        Ok(config)
    }

    async fn tour_override(pool: &SqlitePool, tour_id: &str) -> ServiceResult<Option<ConciergeConfig>> {
        let config = sqlx::query_as::<_, ConciergeConfig>(
            "SELECT * FROM concierge_configs WHERE tour_id = ?1",
        )
        .bind(tour_id)
        .fetch_optional(pool)
        .await?;
        Ok(config)
    }

    /// Tour override if one exists, otherwise the global config.
    pub async fn resolve_config(
        pool: &SqlitePool,
        tour_id: Option<&str>,
        default_model: &str,
    ) -> ServiceResult<ConciergeConfig> {
        if let Some(tour_id) = tour_id.filter(|t| !t.is_empty()) {
            if let Some(config) = Self::tour_override(pool, tour_id).await? {
                return Ok(config);
            }
        }
        Self::global_config(pool, default_model).await
    }

    pub async fn bundle(
        pool: &SqlitePool,
        tour_id: Option<&str>,
        default_model: &str,
    ) -> ServiceResult<ConciergeBundle> {
        let config = Self::resolve_config(pool, tour_id, default_model).await?;
        let knowledge = Self::list_knowledge(pool, &config.id).await?;
        let quick_actions = Self::list_quick_actions(pool, &config.id).await?;
        Ok(ConciergeBundle {
            config,
            knowledge,
            quick_actions,
        })
    }

    /// Update the global config, or the override for `req.tour_id`
    /// (created from the global one when missing).
    pub async fn update_config(
        pool: &SqlitePool,
        req: UpdateConciergeConfigRequest,
        default_model: &str,
    ) -> ServiceResult<ConciergeConfig> {
        let mut config = match req.tour_id.as_deref().filter(|t| !t.is_empty()) {
            Some(tour_id) => match Self::tour_override(pool, tour_id).await? {
                Some(config) => config,
                None => {
                    TourService::get(pool, tour_id).await?;
                    let global = Self::global_config(pool, default_model).await?;
                    ConciergeConfig {
                        id: Uuid::new_v4().to_string(),
                        tour_id: Some(tour_id.to_string()),
                        ..global
                    }
                }
            },
            None => Self::global_config(pool, default_model).await?,
        };

        if let Some(museum_id) = req.museum_id {
            config.museum_id = Some(museum_id).filter(|s| !s.is_empty());
        }
        if let Some(enabled) = req.enabled {
            config.enabled = enabled;
        }
        if let Some(persona) = req.persona {
            config.persona = persona;
        }
        if let Some(welcome) = req.welcome_message {
            config.welcome_message = welcome;
        }
        if let Some(prompt) = req.system_prompt {
            config.system_prompt = prompt;
        }
        if let Some(languages) = req.languages {
            if languages.is_empty() {
                return Err(ServiceError::invalid("At least one language is required"));
            }
            config.languages = languages;
        }
        if let Some(model) = req.model.filter(|m| !m.trim().is_empty()) {
            config.model = model;
        }

        let saved = sqlx::query_as::<_, ConciergeConfig>(
            "INSERT INTO concierge_configs
             (id, museum_id, tour_id, enabled, persona, welcome_message, system_prompt,
              languages, model, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                museum_id = excluded.museum_id, enabled = excluded.enabled,
                persona = excluded.persona, welcome_message = excluded.welcome_message,
                system_prompt = excluded.system_prompt, languages = excluded.languages,
                model = excluded.model, updated_at = excluded.updated_at
             RETURNING *",
        )
        .bind(&config.id)
        .bind(&config.museum_id)
        .bind(&config.tour_id)
        .bind(config.enabled)
        .bind(&config.persona)
        .bind(Json(&config.welcome_message))
        .bind(&config.system_prompt)
        .bind(Json(&config.languages))
        .bind(&config.model)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        tracing::info!(config_id = %saved.id, tour_id = ?saved.tour_id, "concierge config saved");
        Ok(saved)
    }

    // ── Knowledge ───────────────────────────────────────────────────────────

    pub async fn list_knowledge(pool: &SqlitePool, config_id: &str) -> ServiceResult<Vec<ConciergeKnowledge>> {
        let items = sqlx::query_as::<_, ConciergeKnowledge>(
            "SELECT * FROM concierge_knowledge WHERE config_id = ?1 ORDER BY created_at ASC",
        )
        .bind(config_id)
        .fetch_all(pool)
        .await?;
        Ok(items)
    }

    pub async fn create_knowledge(
        pool: &SqlitePool,
        req: KnowledgeRequest,
        default_model: &str,
    ) -> ServiceResult<ConciergeKnowledge> {
        validate_knowledge(&req)?;
        let config = Self::resolve_config(pool, req.tour_id.as_deref(), default_model).await?;

        let item = sqlx::query_as::<_, ConciergeKnowledge>(
            "INSERT INTO concierge_knowledge (id, config_id, title, content, source_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&config.id)
        .bind(req.title.trim())
        .bind(&req.content)
        .bind(req.source_type)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;
        Ok(item)
    }

    pub async fn update_knowledge(
        pool: &SqlitePool,
        id: &str,
        req: KnowledgeRequest,
    ) -> ServiceResult<ConciergeKnowledge> {
        validate_knowledge(&req)?;
        sqlx::query_as::<_, ConciergeKnowledge>(
            "UPDATE concierge_knowledge SET title = ?2, content = ?3, source_type = ?4
             WHERE id = ?1
             RETURNING *",
        )
        .bind(id)
        .bind(req.title.trim())
        .bind(&req.content)
        .bind(req.source_type)
        .fetch_optional(pool)
        .await?
        .ok_or(ServiceError::NotFound("Knowledge entry"))
    }

    pub async fn delete_knowledge(pool: &SqlitePool, id: &str) -> ServiceResult<()> {
        let result = sqlx::query("DELETE FROM concierge_knowledge WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("Knowledge entry"));
        }
        Ok(())
    }

    // ── Quick actions ───────────────────────────────────────────────────────

    pub async fn list_quick_actions(
        pool: &SqlitePool,
        config_id: &str,
    ) -> ServiceResult<Vec<ConciergeQuickAction>> {
        let items = sqlx::query_as::<_, ConciergeQuickAction>(
            "SELECT * FROM concierge_quick_actions WHERE config_id = ?1 ORDER BY position ASC",
        )
        .bind(config_id)
        .fetch_all(pool)
        .await?;
        Ok(items)
    }

    pub async fn create_quick_action(
        pool: &SqlitePool,
        req: QuickActionRequest,
        default_model: &str,
    ) -> ServiceResult<ConciergeQuickAction> {
        if req.question.is_empty() {
            return Err(ServiceError::invalid("Question is required"));
        }
        let config = Self::resolve_config(pool, req.tour_id.as_deref(), default_model).await?;

        let item = sqlx::query_as::<_, ConciergeQuickAction>(
            "INSERT INTO concierge_quick_actions (id, config_id, question, category, position, enabled)
             VALUES (?1, ?2, ?3, ?4,
                     COALESCE(?5, (SELECT COALESCE(MAX(position) + 1, 0)
                                   FROM concierge_quick_actions WHERE config_id = ?2)),
                     ?6)
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&config.id)
        .bind(Json(&req.question))
        .bind(&req.category)
        .bind(req.order)
        .bind(req.enabled)
        .fetch_one(pool)
        .await?;
        Ok(item)
    }

    pub async fn update_quick_action(
        pool: &SqlitePool,
        id: &str,
        req: QuickActionRequest,
    ) -> ServiceResult<ConciergeQuickAction> {
        if req.question.is_empty() {
            return Err(ServiceError::invalid("Question is required"));
        }
        sqlx::query_as::<_, ConciergeQuickAction>(
            "UPDATE concierge_quick_actions
             SET question = ?2, category = ?3, position = COALESCE(?4, position), enabled = ?5
             WHERE id = ?1
             RETURNING *",
        )
        .bind(id)
        .bind(Json(&req.question))
        .bind(&req.category)
        .bind(req.order)
        .bind(req.enabled)
        .fetch_optional(pool)
        .await?
        .ok_or(ServiceError::NotFound("Quick action"))
    }

    pub async fn delete_quick_action(pool: &SqlitePool, id: &str) -> ServiceResult<()> {
        let result = sqlx::query("DELETE FROM concierge_quick_actions WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("Quick action"));
        }
        Ok(())
    }

    /// Fill missing languages of every quick action, one call at a time.
    pub async fn translate_quick_actions(
        pool: &SqlitePool,
        translator: &Translator,
        req: TranslateQuickActionsRequest,
        default_model: &str,
    ) -> ServiceResult<Vec<ConciergeQuickAction>> {
        if req.target_languages.is_empty() {
            return Err(ServiceError::invalid("targetLanguages is required"));
        }
        let config = Self::resolve_config(pool, req.tour_id.as_deref(), default_model).await?;
        let source = req
            .source_language
            .clone()
            .or_else(|| config.languages.first().cloned())
            .unwrap_or_else(|| "en".into());

        let mut out = Vec::new();
        for mut action in Self::list_quick_actions(pool, &config.id).await? {
            let count = translator
                .fill_localized(&mut action.question, &source, &req.target_languages, false)
                .await?;
            if count > 0 {
                sqlx::query("UPDATE concierge_quick_actions SET question = ?2 WHERE id = ?1")
                    .bind(&action.id)
                    .bind(Json(&action.question))
                    .execute(pool)
                    .await?;
            }
            out.push(action);
        }
        Ok(out)
    }

    // ── Chat ────────────────────────────────────────────────────────────────

    pub async fn chat(
        pool: &SqlitePool,
        gemini: &GeminiClient,
        req: ChatRequest,
        default_model: &str,
    ) -> ServiceResult<ChatResponse> {
        let message = req.message.trim();
        if message.is_empty() {
            return Err(ServiceError::invalid("Message is required"));
        }

        let config = Self::resolve_config(pool, req.tour_id.as_deref(), default_model).await?;
        if !config.enabled {
            return Err(ServiceError::invalid("The concierge is disabled"));
        }

        let mut knowledge = Self::list_knowledge(pool, &config.id).await?;
        if config.tour_id.is_some() {
            knowledge.extend(Self::list_knowledge(pool, GLOBAL_CONFIG_ID).await?);
        }
        let context = Self::visitor_context(pool, &req).await?;
        let system = build_system_prompt(&config, &knowledge, context.as_deref(), &req.language);

        let start = req.history.len().saturating_sub(MAX_HISTORY_TURNS);
        let reply = gemini
            .chat(Some(&config.model), &system, &req.history[start..], message)
            .await?;
        Ok(ChatResponse { reply })
    }

    /// Text describing the tour/stop the visitor is looking at. Unpublished
    /// tours contribute nothing.
    async fn visitor_context(pool: &SqlitePool, req: &ChatRequest) -> ServiceResult<Option<String>> {
        let Some(tour_id) = req.tour_id.as_deref().filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let tour = match TourService::get(pool, tour_id).await {
            Ok(tour) if tour.status == TourStatus::Published => tour,
            Ok(_) | Err(ServiceError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let lang = req.language.as_str();
        let fallback = tour.primary_language.as_str();
        let mut context = format!(
            "The visitor is on the tour \"{}\". {}",
            tour.title.resolve(lang, fallback).unwrap_or_default(),
            tour.description.resolve(lang, fallback).unwrap_or_default()
        );

        if let Some(stop_id) = req.stop_id.as_deref().filter(|s| !s.is_empty()) {
            match StopService::get(pool, stop_id).await {
                Ok(stop) if stop.tour_id == tour.id => {
                    context.push_str(&format!(
                        "\nThey are currently at the stop \"{}\". {}",
                        stop.title.resolve(lang, fallback).unwrap_or_default(),
                        stop.description.resolve(lang, fallback).unwrap_or_default()
                    ));
                    for block in &stop.content {
                        if let BlockBody::Text(text) = &block.body {
                            if let Some(t) = text.content.resolve(lang, fallback) {
                                context.push('\n');
                                context.push_str(t);
                            }
                        }
                    }
                }
                Ok(_) | Err(ServiceError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(Some(context))
    }
}

fn validate_knowledge(req: &KnowledgeRequest) -> ServiceResult<()> {
    if req.title.trim().is_empty() {
        return Err(ServiceError::invalid("Title is required"));
    }
    if req.content.trim().is_empty() {
        return Err(ServiceError::invalid("Content is required"));
    }
    Ok(())
}

pub fn build_system_prompt(
    config: &ConciergeConfig,
    knowledge: &[ConciergeKnowledge],
    context: Option<&str>,
    language: &str,
) -> String {
    let mut prompt = format!(
        "You are the museum's AI concierge. Your persona is {}. \
         Answer visitors' questions concisely and accurately.",
        config.persona
    );
    if !config.system_prompt.trim().is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(config.system_prompt.trim());
    }
    if !knowledge.is_empty() {
        prompt.push_str("\n\nReference information:");
        for item in knowledge {
            prompt.push_str(&format!("\n\n## {}\n{}", item.title, item.content.trim()));
        }
    }
    if let Some(context) = context {
        prompt.push_str("\n\n");
        prompt.push_str(context);
    }
    prompt.push_str(&format!(
        "\n\nAlways reply in the language with code \"{language}\". \
         If you do not know the answer, say so rather than inventing facts."
    ));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db,
        models::{concierge::KnowledgeSource, i18n::LocalizedText},
    };

    #[tokio::test]
    async fn global_config_is_created_once() {
        let pool = db::create_memory_pool().await.unwrap();
        let first = ConciergeService::global_config(&pool, "gemini-2.0-flash").await.unwrap();
        let second = ConciergeService::global_config(&pool, "other").await.unwrap();
        assert_eq!(first.id, GLOBAL_CONFIG_ID);
        assert_eq!(second.model, "gemini-2.0-flash");
        assert!(first.tour_id.is_none());
    }

    #[tokio::test]
    async fn quick_actions_append_in_order() {
        let pool = db::create_memory_pool().await.unwrap();
        for q in ["Where is the café?", "Opening hours?"] {
            ConciergeService::create_quick_action(
                &pool,
                QuickActionRequest {
                    tour_id: None,
                    question: LocalizedText::single("en", q),
                    category: "general".into(),
                    order: None,
                    enabled: true,
                },
                "gemini-2.0-flash",
            )
            .await
            .unwrap();
        }
        let actions = ConciergeService::list_quick_actions(&pool, GLOBAL_CONFIG_ID)
            .await
            .unwrap();
        assert_eq!(
            actions.iter().map(|a| a.position).collect::<Vec<_>>(),
            vec![0, 1]
        );
        assert_eq!(actions[1].question.get("en"), Some("Opening hours?"));
    }

    #[test]
    fn system_prompt_includes_knowledge_and_language() {
        let config = ConciergeConfig {
            id: "global".into(),
            museum_id: None,
            tour_id: None,
            enabled: true,
            persona: "scholarly".into(),
            welcome_message: LocalizedText::new(),
            system_prompt: "Never discuss ticket refunds.".into(),
            languages: vec!["en".into()],
            model: "gemini-2.0-flash".into(),
            updated_at: Utc::now(),
        };
        let knowledge = vec![ConciergeKnowledge {
            id: "k".into(),
            config_id: "global".into(),
            title: "Opening hours".into(),
            content: "10:00 to 18:00".into(),
            source_type: KnowledgeSource::Text,
            created_at: Utc::now(),
        }];
        let prompt = build_system_prompt(&config, &knowledge, None, "fr");
        assert!(prompt.contains("scholarly"));
        assert!(prompt.contains("Never discuss ticket refunds."));
        assert!(prompt.contains("## Opening hours\n10:00 to 18:00"));
        assert!(prompt.contains("\"fr\""));
    }
}
