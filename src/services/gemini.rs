use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{ServiceError, ServiceResult},
    models::concierge::{ChatRole, ChatTurn},
    services::{
        ai::{extract_json, InlineImage},
        metrics,
    },
};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Structured description of an artwork/object photo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageAnalysis {
    pub title: String,
    pub description: String,
    pub alt_text: String,
    pub tags: Vec<String>,
    pub objects: Vec<String>,
    pub colors: Vec<String>,
    pub period: Option<String>,
    pub medium: Option<String>,
    pub extracted_text: Option<String>,
}

/// Summary of a document (catalogue entry, wall label, research note).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentAnalysis {
    pub title: String,
    pub summary: String,
    pub key_facts: Vec<String>,
    pub suggested_stops: Vec<String>,
    pub tags: Vec<String>,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(client: Client, api_key: Option<String>, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url: GEMINI_BASE_URL.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// One `generateContent` round trip; returns the concatenated text parts.
    pub async fn generate(
        &self,
        model: Option<&str>,
        system: Option<&str>,
        contents: Vec<Value>,
        json_output: bool,
    ) -> ServiceResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ServiceError::NotConfigured("Gemini API key"))?;
        let model = model.filter(|m| !m.is_empty()).unwrap_or(self.model.as_str());

        let mut payload = json!({ "contents": contents });
        if let Some(system) = system.filter(|s| !s.is_empty()) {
            payload["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }
        if json_output {
            payload["generationConfig"] = json!({ "responseMimeType": "application/json" });
        }

        let response = self
            .client
            .post(format!("{}/models/{model}:generateContent", self.base_url))
            .query(&[("key", api_key)])
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                metrics::record_ai("gemini", false);
                ServiceError::upstream("Gemini", e)
            })?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            metrics::record_ai("gemini", false);
            ServiceError::upstream("Gemini", e)
        })?;

        if !status.is_success() {
            metrics::record_ai("gemini", false);
            let message = body["error"]["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {status}"));
            tracing::warn!("Gemini error {}: {}", status, message);
            return Err(ServiceError::upstream("Gemini", message));
        }

        let text = response_text(&body).ok_or_else(|| {
            metrics::record_ai("gemini", false);
            let reason = body["candidates"][0]["finishReason"]
                .as_str()
                .or_else(|| body["promptFeedback"]["blockReason"].as_str())
                .unwrap_or("empty response");
            ServiceError::upstream("Gemini", format!("no text in reply ({reason})"))
        })?;

        metrics::record_ai("gemini", true);
        Ok(text)
    }

    pub async fn analyze_image(
        &self,
        image: &InlineImage,
        prompt: Option<&str>,
        language: &str,
    ) -> ServiceResult<ImageAnalysis> {
        let instructions = format!(
            "You are helping a museum curator catalogue an object. Describe the image and reply \
             with a JSON object with the keys: title, description, altText, tags (array), \
             objects (array), colors (array), period, medium, extractedText. \
             Write all text in the language with code \"{language}\". {}",
            prompt.unwrap_or_default()
        );
        let contents = vec![json!({
            "role": "user",
            "parts": [
                { "inline_data": { "mime_type": image.mime_type, "data": image.data } },
                { "text": instructions }
            ]
        })];

        let reply = self.generate(None, None, contents, true).await?;
        parse_reply(&reply)
    }

    pub async fn analyze_document(
        &self,
        text: Option<&str>,
        file: Option<&InlineImage>,
        language: &str,
    ) -> ServiceResult<DocumentAnalysis> {
        let mut parts = Vec::new();
        if let Some(file) = file {
            parts.push(json!({ "inline_data": { "mime_type": file.mime_type, "data": file.data } }));
        }
        if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
            parts.push(json!({ "text": text }));
        }
        if parts.is_empty() {
            return Err(ServiceError::invalid("text or document data is required"));
        }
        parts.push(json!({
            "text": format!(
                "Analyze this museum document and reply with a JSON object with the keys: \
                 title, summary, keyFacts (array), suggestedStops (array of stop titles), \
                 tags (array). Write in the language with code \"{language}\"."
            )
        }));

        let reply = self
            .generate(None, None, vec![json!({ "role": "user", "parts": parts })], true)
            .await?;
        parse_reply(&reply)
    }

    /// Multi-turn chat; history roles map to Gemini's `user` / `model`.
    pub async fn chat(
        &self,
        model: Option<&str>,
        system: &str,
        history: &[ChatTurn],
        message: &str,
    ) -> ServiceResult<String> {
        let mut contents: Vec<Value> = history
            .iter()
            .filter(|t| !t.content.trim().is_empty())
            .map(|t| {
                let role = match t.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "model",
                };
                json!({ "role": role, "parts": [{ "text": t.content }] })
            })
            .collect();
        contents.push(json!({ "role": "user", "parts": [{ "text": message }] }));

        let reply = self.generate(model, Some(system), contents, false).await?;
        Ok(reply.trim().to_string())
    }
}

fn response_text(body: &Value) -> Option<String> {
    let parts = body["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");
    Some(text).filter(|t| !t.trim().is_empty())
}

fn parse_reply<T: serde::de::DeserializeOwned>(reply: &str) -> ServiceResult<T> {
    let value = extract_json(reply)
        .ok_or_else(|| ServiceError::upstream("Gemini", "reply was not valid JSON"))?;
    serde_json::from_value(value)
        .map_err(|e| ServiceError::upstream("Gemini", format!("unexpected JSON shape: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hello " }, { "text": "there" }] } }]
        });
        assert_eq!(response_text(&body).as_deref(), Some("Hello there"));
        assert_eq!(response_text(&json!({ "candidates": [] })), None);
    }

    #[test]
    fn analysis_tolerates_missing_keys() {
        let analysis: ImageAnalysis =
            parse_reply("```json\n{\"title\":\"Amphora\",\"tags\":[\"greek\"]}\n```").unwrap();
        assert_eq!(analysis.title, "Amphora");
        assert_eq!(analysis.tags, vec!["greek"]);
        assert!(analysis.description.is_empty());
        assert!(analysis.period.is_none());
    }

    #[test]
    fn garbage_reply_is_an_upstream_error() {
        let err = parse_reply::<ImageAnalysis>("I cannot help with that").unwrap_err();
        assert!(matches!(err, ServiceError::Upstream { .. }));
    }

    #[tokio::test]
    async fn missing_key_is_reported() {
        let gemini = GeminiClient::new(Client::new(), None, "gemini-2.0-flash".into());
        let err = gemini.chat(None, "sys", &[], "hi").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotConfigured(_)));
    }
}
