use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    error::{ServiceError, ServiceResult},
    services::{ai::InlineImage, metrics},
};

const VISION_URL: &str = "https://vision.googleapis.com/v1/images:annotate";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Label {
    pub description: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DetectedObject {
    pub name: String,
    pub score: f64,
}

/// Labels, OCR text and localized objects for one image.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VisionAnnotation {
    pub labels: Vec<Label>,
    pub text: String,
    pub objects: Vec<DetectedObject>,
}

#[derive(Clone)]
pub struct VisionClient {
    client: Client,
    api_key: Option<String>,
}

impl VisionClient {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn annotate(&self, image: &InlineImage) -> ServiceResult<VisionAnnotation> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ServiceError::NotConfigured("Google Vision API key"))?;

        let payload = json!({
            "requests": [{
                "image": { "content": image.data },
                "features": [
                    { "type": "LABEL_DETECTION", "maxResults": 15 },
                    { "type": "TEXT_DETECTION" },
                    { "type": "OBJECT_LOCALIZATION", "maxResults": 15 }
                ]
            }]
        });

        let result = async {
            let response = self
                .client
                .post(VISION_URL)
                .query(&[("key", api_key)])
                .json(&payload)
                .send()
                .await
                .map_err(|e| ServiceError::upstream("Google Vision", e))?;
            let status = response.status();
            let body: Value = response
                .json()
                .await
                .map_err(|e| ServiceError::upstream("Google Vision", e))?;
            if !status.is_success() {
                let message = body["error"]["message"].as_str().unwrap_or("request failed");
                return Err(ServiceError::upstream(
                    "Google Vision",
                    format!("{status}: {message}"),
                ));
            }
            parse_annotation(&body["responses"][0])
        }
        .await;

        metrics::record_ai("vision", result.is_ok());
        result
    }
}

fn parse_annotation(response: &Value) -> ServiceResult<VisionAnnotation> {
    if let Some(message) = response["error"]["message"].as_str() {
        return Err(ServiceError::upstream("Google Vision", message));
    }

    let labels = response["labelAnnotations"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|l| {
                    Some(Label {
                        description: l["description"].as_str()?.to_string(),
                        score: l["score"].as_f64().unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    // The first text annotation holds the full detected text.
    let text = response["fullTextAnnotation"]["text"]
        .as_str()
        .or_else(|| response["textAnnotations"][0]["description"].as_str())
        .unwrap_or_default()
        .trim()
        .to_string();

    let objects = response["localizedObjectAnnotations"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|o| {
                    Some(DetectedObject {
                        name: o["name"].as_str()?.to_string(),
                        score: o["score"].as_f64().unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(VisionAnnotation {
        labels,
        text,
        objects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_text_and_objects() {
        let response = json!({
            "labelAnnotations": [
                { "description": "Sculpture", "score": 0.93 },
                { "score": 0.5 }
            ],
            "textAnnotations": [{ "description": "Rodin, 1880\n" }],
            "localizedObjectAnnotations": [{ "name": "Person", "score": 0.81 }]
        });
        let annotation = parse_annotation(&response).unwrap();
        assert_eq!(annotation.labels.len(), 1);
        assert_eq!(annotation.labels[0].description, "Sculpture");
        assert_eq!(annotation.text, "Rodin, 1880");
        assert_eq!(annotation.objects[0].name, "Person");
    }

    #[test]
    fn empty_response_is_empty_annotation() {
        let annotation = parse_annotation(&json!({})).unwrap();
        assert!(annotation.labels.is_empty());
        assert!(annotation.text.is_empty());
    }

    #[test]
    fn per_image_error_is_upstream() {
        let err = parse_annotation(&json!({ "error": { "message": "Bad image data." } }))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Upstream { .. }));
    }
}
