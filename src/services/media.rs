use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    error::{ServiceError, ServiceResult},
    models::{
        i18n::LocalizedText,
        media::{Media, MediaKind, MediaQuery, UpdateMediaRequest},
    },
    services::metrics,
};

/// URL prefix under which the uploads directory is served.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// A file to be added to the library, from an upload or generated server-side.
pub struct NewMedia {
    pub bytes: Vec<u8>,
    pub original_name: String,
    pub content_type: String,
    pub alt: LocalizedText,
    pub caption: LocalizedText,
    pub tags: Vec<String>,
}

pub struct MediaService;

impl MediaService {
    pub async fn upload(
        pool: &SqlitePool,
        uploads_dir: &str,
        mut multipart: Multipart,
    ) -> ServiceResult<Media> {
        let mut file_data: Option<(Vec<u8>, String, String)> = None;
        let mut alt = LocalizedText::new();
        let mut caption = LocalizedText::new();
        let mut tags: Vec<String> = Vec::new();

        let bad = |e: axum::extract::multipart::MultipartError| ServiceError::invalid(e.body_text());

        while let Some(field) = multipart.next_field().await.map_err(bad)? {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "file" => {
                    let filename = field.file_name().unwrap_or("upload").to_string();
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field.bytes().await.map_err(bad)?.to_vec();
                    file_data = Some((bytes, filename, content_type));
                }
                // Either a JSON language map or plain text in English
                "alt" => alt = parse_localized(&field.text().await.map_err(bad)?),
                "caption" => caption = parse_localized(&field.text().await.map_err(bad)?),
                "tags" => {
                    tags = field
                        .text()
                        .await
                        .map_err(bad)?
                        .split(',')
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect();
                }
                _ => {}
            }
        }

        let (bytes, original_name, content_type) =
            file_data.ok_or_else(|| ServiceError::invalid("No file field in upload"))?;
        if bytes.is_empty() {
            return Err(ServiceError::invalid("Uploaded file is empty"));
        }

        Self::store(
            pool,
            uploads_dir,
            NewMedia {
                bytes,
                original_name,
                content_type,
                alt,
                caption,
                tags,
            },
        )
        .await
    }

    /// Write the file under `uploads/<kind>/` and record it.
    pub async fn store(pool: &SqlitePool, uploads_dir: &str, new: NewMedia) -> ServiceResult<Media> {
        let kind = MediaKind::detect(&new.content_type, &new.original_name);
        let mime_type = if new.content_type.is_empty() || new.content_type == "application/octet-stream" {
            mime_guess::from_path(&new.original_name)
                .first_raw()
                .unwrap_or("application/octet-stream")
                .to_string()
        } else {
            new.content_type
        };

        let ext = Path::new(&new.original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
            .or_else(|| {
                mime_guess::get_mime_extensions_str(&mime_type)
                    .and_then(|exts| exts.first())
                    .map(|e| e.to_string())
            })
            .unwrap_or_else(|| "bin".into());

        let id = Uuid::new_v4().to_string();
        let filename = format!("{id}.{ext}");
        let dir = PathBuf::from(uploads_dir).join(kind.dir());
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(&filename);
        tokio::fs::write(&path, &new.bytes).await?;

        let (width, height) = if kind == MediaKind::Image {
            image_dimensions(&new.bytes)
                .map(|(w, h)| (Some(w as i64), Some(h as i64)))
                .unwrap_or((None, None))
        } else {
            (None, None)
        };

        let url = format!("{UPLOADS_URL_PREFIX}/{}/{filename}", kind.dir());
        let inserted = sqlx::query_as::<_, Media>(
            "INSERT INTO media
             (id, filename, original_name, mime_type, size, kind, url, width, height,
              alt, caption, tags, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             RETURNING *",
        )
        .bind(&id)
        .bind(&filename)
        .bind(&new.original_name)
        .bind(&mime_type)
        .bind(new.bytes.len() as i64)
        .bind(kind)
        .bind(&url)
        .bind(width)
        .bind(height)
        .bind(Json(&new.alt))
        .bind(Json(&new.caption))
        .bind(Json(&new.tags))
        .bind(Utc::now())
        .fetch_one(pool)
        .await;
        let media = match inserted {
            Ok(media) => media,
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    tracing::warn!("could not remove {}: {rm}", path.display());
                }
                return Err(e.into());
            }
        };

        metrics::MEDIA_UPLOADS_COUNTER
            .with_label_values(&[kind.to_string().as_str()])
            .inc();
        tracing::info!(media_id = %media.id, kind = %kind, size = media.size, "media stored");
        Ok(media)
    }

    pub async fn list(pool: &SqlitePool, query: &MediaQuery) -> ServiceResult<Vec<Media>> {
        let per_page = query.per_page.unwrap_or(50).clamp(1, 200);
        let offset = query
            .page
            .unwrap_or(1)
            .max(1)
            .saturating_sub(1)
            .saturating_mul(per_page);
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));

        let items = sqlx::query_as::<_, Media>(
            "SELECT * FROM media
             WHERE (?1 IS NULL OR kind = ?1)
               AND (?2 IS NULL OR lower(original_name) LIKE ?2 OR lower(tags) LIKE ?2
                    OR lower(caption) LIKE ?2 OR lower(alt) LIKE ?2)
             ORDER BY created_at DESC
             LIMIT ?3 OFFSET ?4",
        )
        .bind(query.kind)
        .bind(search)
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool)
        .await?;
        Ok(items)
    }

    pub async fn get(pool: &SqlitePool, id: &str) -> ServiceResult<Media> {
        sqlx::query_as::<_, Media>("SELECT * FROM media WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(ServiceError::NotFound("Media"))
    }

    pub async fn update(pool: &SqlitePool, id: &str, req: UpdateMediaRequest) -> ServiceResult<Media> {
        let mut media = Self::get(pool, id).await?;
        if let Some(alt) = req.alt {
            media.alt = alt;
        }
        if let Some(caption) = req.caption {
            media.caption = caption;
        }
        if let Some(tags) = req.tags {
            media.tags = tags;
        }

        let media = sqlx::query_as::<_, Media>(
            "UPDATE media SET alt = ?2, caption = ?3, tags = ?4 WHERE id = ?1 RETURNING *",
        )
        .bind(&media.id)
        .bind(Json(&media.alt))
        .bind(Json(&media.caption))
        .bind(Json(&media.tags))
        .fetch_one(pool)
        .await?;
        Ok(media)
    }

    /// Delete the record and its file. A file already missing from disk is not an error.
    pub async fn delete(pool: &SqlitePool, uploads_dir: &str, id: &str) -> ServiceResult<()> {
        let media = Self::get(pool, id).await?;

        sqlx::query("DELETE FROM media WHERE id = ?1")
            .bind(&media.id)
            .execute(pool)
            .await?;

        let path = PathBuf::from(uploads_dir)
            .join(media.kind.dir())
            .join(&media.filename);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("failed to remove {}: {e}", path.display());
            }
        }
        Ok(())
    }
}

/// Map a `/uploads/...` URL back to a file inside the uploads directory.
/// Returns `None` for foreign URLs and for paths escaping the directory.
pub fn local_upload_path(uploads_dir: &str, url: &str) -> Option<PathBuf> {
    let rel = url
        .strip_prefix(UPLOADS_URL_PREFIX)?
        .trim_start_matches('/');
    if rel.is_empty() || rel.split('/').any(|part| part == ".." || part.is_empty()) {
        return None;
    }
    Some(PathBuf::from(uploads_dir).join(rel))
}

fn parse_localized(raw: &str) -> LocalizedText {
    serde_json::from_str(raw).unwrap_or_else(|_| {
        if raw.trim().is_empty() {
            LocalizedText::new()
        } else {
            LocalizedText::single("en", raw.trim())
        }
    })
}

fn image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    match image::load_from_memory(bytes) {
        Ok(img) => Some((img.width(), img.height())),
        Err(e) => {
            tracing::debug!("could not decode image for dimensions: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_urls_map_inside_the_directory() {
        assert_eq!(
            local_upload_path("uploads", "/uploads/images/a.png"),
            Some(PathBuf::from("uploads/images/a.png"))
        );
        assert_eq!(local_upload_path("uploads", "/uploads/../secret"), None);
        assert_eq!(local_upload_path("uploads", "https://cdn.example/a.png"), None);
        assert_eq!(local_upload_path("uploads", "/uploads/"), None);
    }

    #[test]
    fn localized_form_fields_accept_json_or_text() {
        assert_eq!(parse_localized(r#"{"fr":"Vase"}"#).get("fr"), Some("Vase"));
        assert_eq!(parse_localized("A vase").get("en"), Some("A vase"));
        assert!(parse_localized("  ").is_empty());
    }

    #[tokio::test]
    async fn failed_insert_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        let pool = crate::db::create_memory_pool().await.unwrap();
        pool.close().await;

        let result = MediaService::store(
            &pool,
            uploads.to_str().unwrap(),
            NewMedia {
                bytes: b"%PDF-1.4".to_vec(),
                original_name: "floor-plan.pdf".into(),
                content_type: "application/pdf".into(),
                alt: LocalizedText::new(),
                caption: LocalizedText::new(),
                tags: Vec::new(),
            },
        )
        .await;
        assert!(result.is_err());

        let leftovers: Vec<_> = std::fs::read_dir(uploads.join(MediaKind::Document.dir()))
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn huge_page_numbers_return_an_empty_page() {
        let pool = crate::db::create_memory_pool().await.unwrap();
        let query = MediaQuery {
            page: Some(i64::MAX),
            ..Default::default()
        };
        assert!(MediaService::list(&pool, &query).await.unwrap().is_empty());
    }
}
