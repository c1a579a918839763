use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{
    error::{ServiceError, ServiceResult},
    models::{
        i18n::LocalizedText,
        stop::Stop,
        tour::{Tour, UpdateTourRequest},
    },
    services::{metrics, stops::StopService, tours::TourService},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateTextRequest {
    pub text: String,
    #[serde(default = "default_source")]
    pub source: String,
    pub target: String,
}

fn default_source() -> String {
    "auto".into()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateTextResponse {
    pub translated_text: String,
}

/// Outcome of a whole-tour translation pass.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationReport {
    pub tour: Tour,
    pub stops: Vec<Stop>,
    pub languages: Vec<String>,
    /// Number of strings sent for translation.
    pub translated: usize,
}

/// LibreTranslate client.
#[derive(Clone)]
pub struct Translator {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl Translator {
    pub fn new(client: Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    pub async fn translate(&self, text: &str, source: &str, target: &str) -> ServiceResult<String> {
        if text.trim().is_empty() || source == target {
            return Ok(text.to_string());
        }

        let mut payload = json!({
            "q": text,
            "source": source,
            "target": target,
            "format": "text",
        });
        if let Some(key) = &self.api_key {
            payload["api_key"] = json!(key);
        }

        let result = async {
            let response = self
                .client
                .post(format!("{}/translate", self.base_url))
                .json(&payload)
                .send()
                .await
                .map_err(|e| ServiceError::upstream("LibreTranslate", e))?;
            let status = response.status();
            let body: Value = response
                .json()
                .await
                .map_err(|e| ServiceError::upstream("LibreTranslate", e))?;
            if !status.is_success() {
                let message = body["error"].as_str().unwrap_or("request failed");
                return Err(ServiceError::upstream(
                    "LibreTranslate",
                    format!("{status}: {message}"),
                ));
            }
            body["translatedText"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| ServiceError::upstream("LibreTranslate", "no translatedText in reply"))
        }
        .await;

        metrics::record_ai("libretranslate", result.is_ok());
        result
    }

    /// Fill `targets` in `text` from the `source` entry. Existing entries are
    /// kept unless `overwrite`. Returns how many strings were translated.
    pub async fn fill_localized(
        &self,
        text: &mut LocalizedText,
        source: &str,
        targets: &[String],
        overwrite: bool,
    ) -> ServiceResult<usize> {
        let Some(original) = text.get(source).map(str::to_string) else {
            return Ok(0);
        };

        let mut count = 0;
        for target in targets.iter().filter(|t| t.as_str() != source) {
            if !overwrite && text.get(target).is_some() {
                continue;
            }
            let translated = self.translate(&original, source, target).await?;
            text.set(target, translated);
            count += 1;
        }
        Ok(count)
    }

    async fn fill_stop(
        &self,
        stop: &mut Stop,
        source: &str,
        targets: &[String],
        overwrite: bool,
    ) -> ServiceResult<usize> {
        let mut count = self.fill_localized(&mut stop.title, source, targets, overwrite).await?;
        count += self
            .fill_localized(&mut stop.description, source, targets, overwrite)
            .await?;
        for block in stop.content.iter_mut() {
            for text in block.body.texts_mut() {
                count += self.fill_localized(text, source, targets, overwrite).await?;
            }
        }
        Ok(count)
    }

    /// Translate a tour and every stop from its primary language. Calls are
    /// made one after another; the first failure aborts the pass.
    pub async fn translate_tour(
        &self,
        pool: &SqlitePool,
        tour_id: &str,
        target_languages: &[String],
        overwrite: bool,
    ) -> ServiceResult<TranslationReport> {
        let mut tour = TourService::get(pool, tour_id).await?;
        let source = tour.primary_language.clone();
        let targets = resolve_targets(&tour, target_languages);
        if targets.is_empty() {
            return Err(ServiceError::invalid(
                "No target languages: add languages to the tour or pass targetLanguages",
            ));
        }

        let mut translated = self
            .fill_localized(&mut tour.title, &source, &targets, overwrite)
            .await?;
        translated += self
            .fill_localized(&mut tour.description, &source, &targets, overwrite)
            .await?;

        let mut stops = Vec::new();
        for mut stop in StopService::list_by_tour(pool, &tour.id).await? {
            let count = self.fill_stop(&mut stop, &source, &targets, overwrite).await?;
            if count > 0 {
                stop = StopService::save(pool, &stop).await?;
                translated += count;
            }
            stops.push(stop);
        }

        let mut languages = tour.languages.clone();
        languages.extend(targets.iter().cloned());
        let tour = TourService::update(
            pool,
            &tour.id,
            UpdateTourRequest {
                title: Some(tour.title),
                description: Some(tour.description),
                languages: Some(languages),
                ..Default::default()
            },
        )
        .await?;

        tracing::info!(tour_id = %tour.id, translated, "tour translated");
        Ok(TranslationReport {
            languages: targets,
            tour,
            stops,
            translated,
        })
    }

    /// Translate one stop from its tour's primary language.
    pub async fn translate_stop(
        &self,
        pool: &SqlitePool,
        stop_id: &str,
        target_languages: &[String],
        overwrite: bool,
    ) -> ServiceResult<Stop> {
        let mut stop = StopService::get(pool, stop_id).await?;
        let tour = TourService::get(pool, &stop.tour_id).await?;
        let targets = resolve_targets(&tour, target_languages);
        if targets.is_empty() {
            return Err(ServiceError::invalid("No target languages"));
        }

        let count = self
            .fill_stop(&mut stop, &tour.primary_language, &targets, overwrite)
            .await?;
        if count == 0 {
            return Ok(stop);
        }
        StopService::save(pool, &stop).await
    }
}

/// Explicit targets, else every tour language except the primary one.
fn resolve_targets(tour: &Tour, requested: &[String]) -> Vec<String> {
    let requested: Vec<String> = requested
        .iter()
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .collect();
    let pool = if requested.is_empty() {
        &tour.languages
    } else {
        &requested
    };
    let mut out: Vec<String> = Vec::new();
    for lang in pool {
        if *lang != tour.primary_language && !out.contains(lang) {
            out.push(lang.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::tour::{Difficulty, TourStatus};

    fn tour(languages: &[&str]) -> Tour {
        Tour {
            id: "t".into(),
            museum_id: None,
            template_id: None,
            title: LocalizedText::single("en", "Hall"),
            slug: "hall".into(),
            description: LocalizedText::new(),
            hero_image: None,
            languages: languages.iter().map(|l| l.to_string()).collect(),
            primary_language: "en".into(),
            duration: 30,
            difficulty: Difficulty::General,
            status: TourStatus::Draft,
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            published_at: None,
        }
    }

    #[test]
    fn targets_default_to_secondary_tour_languages() {
        let t = tour(&["en", "fr", "de"]);
        assert_eq!(resolve_targets(&t, &[]), vec!["fr", "de"]);
        assert_eq!(
            resolve_targets(&t, &["EN".into(), "es".into(), "es".into()]),
            vec!["es"]
        );
        assert!(resolve_targets(&tour(&["en"]), &[]).is_empty());
    }

    #[tokio::test]
    async fn nothing_to_fill_makes_no_calls() {
        // Unreachable URL: any request would fail the test.
        let translator = Translator::new(Client::new(), "http://127.0.0.1:9".into(), None);
        let mut text = LocalizedText::single("en", "Hall");
        text.set("fr", "Salle");

        let count = translator
            .fill_localized(&mut text, "en", &["en".into(), "fr".into()], false)
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(text.get("fr"), Some("Salle"));

        let mut empty = LocalizedText::new();
        let count = translator
            .fill_localized(&mut empty, "en", &["fr".into()], true)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
