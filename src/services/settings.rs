//! Application settings kept as one flat JSON document on disk.

use std::path::PathBuf;

use serde_json::{json, Map, Value};
use tokio::sync::Mutex;

use crate::error::{ServiceError, ServiceResult};

/// Values every settings read starts from; the stored file is merged over them.
pub fn defaults() -> Value {
    json!({
        "museumName": "",
        "defaultLanguage": "en",
        "supportedLanguages": ["en", "fr", "es", "de"],
        "translation": { "provider": "libretranslate" },
        "maps": { "provider": "openstreetmap", "defaultZoom": 16 },
        "ai": { "imageAnalysis": "gemini", "ocr": "google-vision" },
        "tts": { "provider": "deepgram", "voice": "aura-asteria-en" },
        "theme": { "primaryColor": "#1f2937" }
    })
}

pub struct SettingsStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn read_stored(&self) -> ServiceResult<Value> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                ServiceError::Other(anyhow::anyhow!(
                    "settings file {} is not valid JSON: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(json!({})),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, value: &Value) -> ServiceResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(value).map_err(anyhow::Error::from)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Stored settings merged over the defaults.
    pub async fn get(&self) -> ServiceResult<Value> {
        let _guard = self.lock.lock().await;
        let mut merged = defaults();
        merge(&mut merged, self.read_stored().await?);
        Ok(merged)
    }

    /// Replace the stored document wholesale.
    pub async fn replace(&self, value: Value) -> ServiceResult<Value> {
        if !value.is_object() {
            return Err(ServiceError::invalid("Settings must be a JSON object"));
        }
        let _guard = self.lock.lock().await;
        self.write(&value).await?;
        let mut merged = defaults();
        merge(&mut merged, value);
        Ok(merged)
    }

    /// Deep-merge a patch into the stored document; `null` removes a key.
    pub async fn patch(&self, patch: Value) -> ServiceResult<Value> {
        if !patch.is_object() {
            return Err(ServiceError::invalid("Settings patch must be a JSON object"));
        }
        let _guard = self.lock.lock().await;
        let mut stored = self.read_stored().await?;
        merge(&mut stored, patch);
        self.write(&stored).await?;
        let mut merged = defaults();
        merge(&mut merged, stored);
        Ok(merged)
    }
}

/// JSON merge-patch: objects merge recursively, `null` deletes, anything else replaces.
pub fn merge(target: &mut Value, patch: Value) {
    match patch {
        Value::Object(patch_map) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            if let Value::Object(target_map) = target {
                for (key, value) in patch_map {
                    if value.is_null() {
                        target_map.remove(&key);
                    } else {
                        merge(target_map.entry(key).or_insert(Value::Null), value);
                    }
                }
            }
        }
        other => *target = other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_deep_and_null_deletes() {
        let mut doc = json!({ "maps": { "provider": "google", "zoom": 12 }, "a": 1 });
        merge(
            &mut doc,
            json!({ "maps": { "zoom": 15, "provider": null }, "a": null, "b": [1] }),
        );
        assert_eq!(doc, json!({ "maps": { "zoom": 15 }, "b": [1] }));
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        assert_eq!(store.get().await.unwrap(), defaults());
    }

    #[tokio::test]
    async fn patch_persists_and_replace_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let store = SettingsStore::new(&path);

        let after = store
            .patch(json!({ "museumName": "City Museum", "maps": { "provider": "google" } }))
            .await
            .unwrap();
        assert_eq!(after["museumName"], "City Museum");
        assert_eq!(after["maps"]["provider"], "google");
        assert_eq!(after["maps"]["defaultZoom"], 16);

        let on_disk: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk, json!({ "museumName": "City Museum", "maps": { "provider": "google" } }));

        store.replace(json!({ "defaultLanguage": "fr" })).await.unwrap();
        let after = store.get().await.unwrap();
        assert_eq!(after["defaultLanguage"], "fr");
        assert_eq!(after["museumName"], "");
    }

    #[tokio::test]
    async fn non_object_bodies_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        assert!(store.patch(json!([1, 2])).await.is_err());
        assert!(store.replace(json!("x")).await.is_err());
    }
}
