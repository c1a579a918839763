//! Stop content: an ordered list of typed blocks.
//!
//! Wire shape of a block is `{ "id": "...", "type": "text", "data": { ... } }`.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::i18n::LocalizedText;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub id: String,
    #[serde(flatten)]
    pub body: BlockBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum BlockBody {
    Text(TextBlock),
    Image(ImageBlock),
    Gallery(GalleryBlock),
    Audio(AudioBlock),
    Video(VideoBlock),
    Quote(QuoteBlock),
    Positioning(PositioningBlock),
    Map(MapBlock),
    Tour(TourIntroBlock),
}

impl BlockBody {
    pub fn kind(&self) -> &'static str {
        match self {
            BlockBody::Text(_) => "text",
            BlockBody::Image(_) => "image",
            BlockBody::Gallery(_) => "gallery",
            BlockBody::Audio(_) => "audio",
            BlockBody::Video(_) => "video",
            BlockBody::Quote(_) => "quote",
            BlockBody::Positioning(_) => "positioning",
            BlockBody::Map(_) => "map",
            BlockBody::Tour(_) => "tour",
        }
    }

    /// All localized strings in the block, for translation passes.
    pub fn texts_mut(&mut self) -> Vec<&mut LocalizedText> {
        match self {
            BlockBody::Text(b) => vec![&mut b.content],
            BlockBody::Image(b) => vec![&mut b.alt, &mut b.caption],
            BlockBody::Gallery(b) => b
                .images
                .iter_mut()
                .flat_map(|i| [&mut i.alt, &mut i.caption])
                .collect(),
            BlockBody::Audio(b) => vec![&mut b.title, &mut b.transcript],
            BlockBody::Video(b) => vec![&mut b.title, &mut b.caption],
            BlockBody::Quote(b) => vec![&mut b.quote, &mut b.author],
            BlockBody::Positioning(_) => Vec::new(),
            BlockBody::Map(b) => b.markers.iter_mut().map(|m| &mut m.label).collect(),
            BlockBody::Tour(b) => vec![&mut b.title, &mut b.description],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextStyle {
    #[default]
    Normal,
    Callout,
    Sidebar,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    pub content: LocalizedText,
    #[serde(default)]
    pub style: TextStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBlock {
    pub url: String,
    #[serde(default)]
    pub alt: LocalizedText,
    #[serde(default)]
    pub caption: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GalleryLayout {
    #[default]
    Carousel,
    Grid,
    /// Images crossfade in step with an audio track.
    Timeline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    pub url: String,
    #[serde(default)]
    pub alt: LocalizedText,
    #[serde(default)]
    pub caption: LocalizedText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryBlock {
    #[serde(default)]
    pub images: Vec<GalleryImage>,
    #[serde(default)]
    pub layout: GalleryLayout,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    /// Seconds into the audio at which each image appears (timeline layout).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timings: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioBlock {
    /// Audio file URL per language.
    #[serde(default)]
    pub audio_files: BTreeMap<String, String>,
    #[serde(default)]
    pub title: LocalizedText,
    #[serde(default)]
    pub transcript: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub autoplay: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoBlock {
    pub url: String,
    #[serde(default)]
    pub title: LocalizedText,
    #[serde(default)]
    pub caption: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteBlock {
    pub quote: LocalizedText,
    #[serde(default)]
    pub author: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositioningBlock {
    pub config: PositioningConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapProvider {
    #[default]
    Openstreetmap,
    Google,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMarker {
    pub position: LatLng,
    #[serde(default)]
    pub label: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapBlock {
    #[serde(default)]
    pub provider: MapProvider,
    pub center: LatLng,
    #[serde(default = "default_zoom")]
    pub zoom: u8,
    #[serde(default)]
    pub markers: Vec<MapMarker>,
}

fn default_zoom() -> u8 {
    16
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourIntroBlock {
    #[serde(default)]
    pub title: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
}

/// How a visitor's device triggers a stop. Only QR codes have server-side behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PositioningConfig {
    #[serde(rename_all = "camelCase")]
    QrCode { url: String, short_code: String },
    Gps {
        latitude: f64,
        longitude: f64,
        radius: f64,
    },
    BleBeacon { uuid: String, major: u16, minor: u16 },
    #[serde(rename_all = "camelCase")]
    Nfc { tag_id: String },
    #[serde(rename_all = "camelCase")]
    Rfid { tag_id: String },
    #[serde(rename_all = "camelCase")]
    Wifi {
        bssid: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ssid: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rssi_threshold: Option<i32>,
    },
    #[serde(rename_all = "camelCase")]
    Uwb { anchor_id: String, x: f64, y: f64 },
}

impl PositioningConfig {
    pub fn method(&self) -> &'static str {
        match self {
            PositioningConfig::QrCode { .. } => "qr_code",
            PositioningConfig::Gps { .. } => "gps",
            PositioningConfig::BleBeacon { .. } => "ble_beacon",
            PositioningConfig::Nfc { .. } => "nfc",
            PositioningConfig::Rfid { .. } => "rfid",
            PositioningConfig::Wifi { .. } => "wifi",
            PositioningConfig::Uwb { .. } => "uwb",
        }
    }
}

/// Block ids must be present and unique within one stop.
pub fn validate_blocks(blocks: &[ContentBlock]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for block in blocks {
        if block.id.trim().is_empty() {
            return Err(format!("{} block is missing an id", block.body.kind()));
        }
        if !seen.insert(block.id.as_str()) {
            return Err(format!("Duplicate content block id: {}", block.id));
        }
    }
    Ok(())
}

/// Point every QR positioning block at the given URL and short code.
pub fn update_qr_blocks(blocks: &mut [ContentBlock], url: &str, short_code: &str) {
    for block in blocks.iter_mut() {
        if let BlockBody::Positioning(PositioningBlock {
            config: PositioningConfig::QrCode { url: u, short_code: c },
        }) = &mut block.body
        {
            *u = url.to_string();
            *c = short_code.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_tagged_blocks() {
        let raw = json!([
            { "id": "b1", "type": "text", "data": { "content": { "en": "Welcome" } } },
            { "id": "b2", "type": "positioning",
              "data": { "config": { "method": "qr_code", "url": "http://x/s/abc", "shortCode": "abc" } } },
            { "id": "b3", "type": "map",
              "data": { "center": { "lat": 48.86, "lng": 2.33 }, "markers": [] } }
        ]);
        let blocks: Vec<ContentBlock> = serde_json::from_value(raw).unwrap();
        assert_eq!(blocks.len(), 3);
        match &blocks[0].body {
            BlockBody::Text(t) => {
                assert_eq!(t.content.get("en"), Some("Welcome"));
                assert_eq!(t.style, TextStyle::Normal);
            }
            other => panic!("unexpected block {other:?}"),
        }
        match &blocks[2].body {
            BlockBody::Map(m) => {
                assert_eq!(m.zoom, 16);
                assert_eq!(m.provider, MapProvider::Openstreetmap);
            }
            other => panic!("unexpected block {other:?}"),
        }
    }

    #[test]
    fn serializes_type_and_data_next_to_id() {
        let block = ContentBlock {
            id: "q1".into(),
            body: BlockBody::Quote(QuoteBlock {
                quote: LocalizedText::single("en", "Art is long"),
                author: LocalizedText::new(),
                source: None,
            }),
        };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["id"], "q1");
        assert_eq!(value["type"], "quote");
        assert_eq!(value["data"]["quote"]["en"], "Art is long");
    }

    #[test]
    fn unknown_block_type_is_rejected() {
        let raw = json!({ "id": "x", "type": "hologram", "data": {} });
        assert!(serde_json::from_value::<ContentBlock>(raw).is_err());
    }

    #[test]
    fn duplicate_ids_fail_validation() {
        let text = |id: &str| ContentBlock {
            id: id.into(),
            body: BlockBody::Text(TextBlock {
                content: LocalizedText::new(),
                style: TextStyle::Callout,
            }),
        };
        assert!(validate_blocks(&[text("a"), text("b")]).is_ok());
        assert!(validate_blocks(&[text("a"), text("a")]).is_err());
        assert!(validate_blocks(&[text(" ")]).is_err());
    }

    #[test]
    fn qr_blocks_are_rewritten() {
        let mut blocks = vec![ContentBlock {
            id: "p".into(),
            body: BlockBody::Positioning(PositioningBlock {
                config: PositioningConfig::QrCode {
                    url: "old".into(),
                    short_code: "old".into(),
                },
            }),
        }];
        update_qr_blocks(&mut blocks, "http://host/s/new12345", "new12345");
        let value = serde_json::to_value(&blocks[0]).unwrap();
        assert_eq!(value["data"]["config"]["shortCode"], "new12345");
        assert_eq!(value["data"]["config"]["method"], "qr_code");
    }
}
