//! Helpers shared by the Gemini and Vision proxies.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::{ServiceError, ServiceResult},
    services::media::local_upload_path,
};

/// Largest image forwarded to an AI service.
const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Where to get an image from: inline data (base64 or a data URL) or a URL.
/// Local `/uploads/...` URLs are read from disk; other http(s) URLs are fetched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSource {
    pub image_url: Option<String>,
    pub image_data: Option<String>,
    pub mime_type: Option<String>,
}

/// Base64 image ready to embed in a request body.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

pub async fn load_image(
    client: &Client,
    uploads_dir: &str,
    source: &ImageSource,
) -> ServiceResult<InlineImage> {
    if let Some(data) = source.image_data.as_deref().filter(|d| !d.is_empty()) {
        return parse_inline(data, source.mime_type.as_deref());
    }

    let url = source
        .image_url
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ServiceError::invalid("imageUrl or imageData is required"))?;

    if let Some(path) = local_upload_path(uploads_dir, url) {
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ServiceError::NotFound("Image file")
            } else {
                e.into()
            }
        })?;
        let mime_type = source.mime_type.clone().unwrap_or_else(|| {
            mime_guess::from_path(&path)
                .first_raw()
                .unwrap_or("image/jpeg")
                .to_string()
        });
        return encode(bytes, mime_type);
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        let mut response = client
            .get(url)
            .send()
            .await
            .map_err(|e| ServiceError::upstream("image fetch", e))?;
        if !response.status().is_success() {
            return Err(ServiceError::upstream(
                "image fetch",
                format!("{url} returned {}", response.status()),
            ));
        }
        if response
            .content_length()
            .is_some_and(|len| len > MAX_IMAGE_BYTES as u64)
        {
            return Err(too_large());
        }
        let mime_type = source
            .mime_type
            .clone()
            .or_else(|| {
                response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            })
            .unwrap_or_else(|| "image/jpeg".into());

        // Content-Length may be absent or wrong, so the cap also applies while reading.
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ServiceError::upstream("image fetch", e))?
        {
            if bytes.len() + chunk.len() > MAX_IMAGE_BYTES {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }
        return encode(bytes, mime_type);
    }

    Err(ServiceError::invalid(format!("Unsupported image URL: {url}")))
}

fn too_large() -> ServiceError {
    ServiceError::invalid("Image is too large to analyze (max 20 MB)")
}

fn encode(bytes: Vec<u8>, mime_type: String) -> ServiceResult<InlineImage> {
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(too_large());
    }
    Ok(InlineImage {
        mime_type,
        data: BASE64.encode(bytes),
    })
}

/// Accepts raw base64 or `data:<mime>;base64,<payload>`.
fn parse_inline(data: &str, mime_type: Option<&str>) -> ServiceResult<InlineImage> {
    let (mime, payload) = match data.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| ServiceError::invalid("Malformed data URL"))?;
            let mime = header.trim_end_matches(";base64");
            (Some(mime.to_string()), payload)
        }
        None => (None, data),
    };

    let decoded_len = BASE64
        .decode(payload.trim())
        .map_err(|_| ServiceError::invalid("imageData is not valid base64"))?
        .len();
    if decoded_len > MAX_IMAGE_BYTES {
        return Err(too_large());
    }

    Ok(InlineImage {
        mime_type: mime
            .filter(|m| !m.is_empty())
            .or_else(|| mime_type.map(str::to_string))
            .unwrap_or_else(|| "image/jpeg".into()),
        data: payload.trim().to_string(),
    })
}

/// Pull a JSON value out of a model reply that may wrap it in prose or code fences.
pub fn extract_json(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();
    if let Ok(v) = serde_json::from_str(trimmed) {
        return Some(v);
    }

    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|s| s.trim_end().trim_end_matches("```").trim());
    if let Some(inner) = unfenced {
        if let Ok(v) = serde_json::from_str(inner) {
            return Some(v);
        }
    }

    let start = trimmed.find(['{', '['])?;
    let end = trimmed.rfind(['}', ']'])?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}
