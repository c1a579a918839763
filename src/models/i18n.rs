use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Text keyed by language code, e.g. `{ "en": "Hall", "fr": "Salle" }`.
///
/// Stored as a JSON object in a TEXT column and parsed at the API boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(pub BTreeMap<String, String>);

impl LocalizedText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(lang: &str, text: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(lang.to_string(), text.into());
        Self(map)
    }

    pub fn get(&self, lang: &str) -> Option<&str> {
        self.0
            .get(lang)
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Requested language, then the fallback, then whichever entry is non-empty.
    pub fn resolve(&self, lang: &str, fallback: &str) -> Option<&str> {
        self.get(lang)
            .or_else(|| self.get(fallback))
            .or_else(|| self.0.values().map(String::as_str).find(|s| !s.trim().is_empty()))
    }

    pub fn set(&mut self, lang: &str, text: impl Into<String>) {
        self.0.insert(lang.to_string(), text.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|s| s.trim().is_empty())
    }

    /// Languages from `langs` that have no (non-blank) text yet.
    pub fn missing_languages<'a>(&self, langs: &'a [String]) -> Vec<&'a str> {
        langs
            .iter()
            .map(String::as_str)
            .filter(|l| self.get(l).is_none())
            .collect()
    }
}

/// Put `primary` first in `languages` and drop blanks and duplicates.
pub fn normalize_languages(primary: &str, languages: &[String]) -> Vec<String> {
    let mut out = vec![primary.to_string()];
    for lang in languages {
        let lang = lang.trim();
        if !lang.is_empty() && !out.iter().any(|l| l == lang) {
            out.push(lang.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shape_is_a_plain_object() {
        let mut text = LocalizedText::single("en", "Hall");
        text.set("fr", "Salle");
        let json = serde_json::to_value(&text).unwrap();
        assert_eq!(json, serde_json::json!({ "en": "Hall", "fr": "Salle" }));

        let back: LocalizedText = serde_json::from_value(json).unwrap();
        assert_eq!(back, text);
    }

    #[test]
    fn resolve_falls_back() {
        let mut text = LocalizedText::single("en", "Hall");
        text.set("de", "  ");
        assert_eq!(text.resolve("de", "en"), Some("Hall"));
        assert_eq!(text.resolve("es", "it"), Some("Hall"));
        assert_eq!(LocalizedText::new().resolve("en", "en"), None);
    }

    #[test]
    fn missing_languages_skips_filled_ones() {
        let text = LocalizedText::single("en", "Hall");
        let langs = vec!["en".to_string(), "fr".to_string(), "es".to_string()];
        assert_eq!(text.missing_languages(&langs), vec!["fr", "es"]);
    }

    #[test]
    fn primary_language_always_included_first() {
        let langs = normalize_languages("fr", &["en".into(), "fr".into(), "".into(), "en".into()]);
        assert_eq!(langs, vec!["fr", "en"]);
        assert_eq!(normalize_languages("en", &[]), vec!["en"]);
    }
}
