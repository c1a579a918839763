use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::{ServiceError, ServiceResult},
    services::metrics,
};

const DEEPGRAM_URL: &str = "https://api.deepgram.com/v1/speak";
const ELEVENLABS_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";
const DEFAULT_DEEPGRAM_VOICE: &str = "aura-asteria-en";
// "Rachel", a stock multilingual voice
const DEFAULT_ELEVENLABS_VOICE: &str = "21m00Tcm4TlvDq8ikWAM";
const MAX_TTS_CHARS: usize = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    Deepgram,
    ElevenLabs,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsRequest {
    pub text: String,
    pub provider: Option<TtsProvider>,
    pub voice: Option<String>,
    pub language: Option<String>,
    /// Store the audio in the media library and return the record instead of bytes.
    #[serde(default)]
    pub save: bool,
}

#[derive(Clone)]
pub struct SpeechClient {
    client: Client,
    deepgram_key: Option<String>,
    elevenlabs_key: Option<String>,
}

impl SpeechClient {
    pub fn new(client: Client, deepgram_key: Option<String>, elevenlabs_key: Option<String>) -> Self {
        Self {
            client,
            deepgram_key,
            elevenlabs_key,
        }
    }

    pub fn deepgram_configured(&self) -> bool {
        self.deepgram_key.is_some()
    }

    pub fn elevenlabs_configured(&self) -> bool {
        self.elevenlabs_key.is_some()
    }

    /// Requested provider, else Deepgram, else ElevenLabs, whichever has a key.
    pub fn pick_provider(&self, requested: Option<TtsProvider>) -> ServiceResult<TtsProvider> {
        match requested {
            Some(p) => Ok(p),
            None if self.deepgram_configured() => Ok(TtsProvider::Deepgram),
            None if self.elevenlabs_configured() => Ok(TtsProvider::ElevenLabs),
            None => Err(ServiceError::NotConfigured("Text-to-speech")),
        }
    }

    /// Synthesize MP3 audio.
    pub async fn synthesize(
        &self,
        provider: TtsProvider,
        text: &str,
        voice: Option<&str>,
    ) -> ServiceResult<Vec<u8>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::invalid("Text is required"));
        }
        if text.chars().count() > MAX_TTS_CHARS {
            return Err(ServiceError::invalid(format!(
                "Text is too long for speech synthesis (max {MAX_TTS_CHARS} characters)"
            )));
        }
        let voice = voice.filter(|v| !v.is_empty());

        let (service, request) = match provider {
            TtsProvider::Deepgram => {
                let key = self
                    .deepgram_key
                    .as_deref()
                    .ok_or(ServiceError::NotConfigured("Deepgram API key"))?;
                let request = self
                    .client
                    .post(DEEPGRAM_URL)
                    .query(&[
                        ("model", voice.unwrap_or(DEFAULT_DEEPGRAM_VOICE)),
                        ("encoding", "mp3"),
                    ])
                    .header(reqwest::header::AUTHORIZATION, format!("Token {key}"))
                    .json(&json!({ "text": text }));
                ("Deepgram", request)
            }
            TtsProvider::ElevenLabs => {
                let key = self
                    .elevenlabs_key
                    .as_deref()
                    .ok_or(ServiceError::NotConfigured("ElevenLabs API key"))?;
                let request = self
                    .client
                    .post(format!(
                        "{ELEVENLABS_URL}/{}",
                        voice.unwrap_or(DEFAULT_ELEVENLABS_VOICE)
                    ))
                    .header("xi-api-key", key)
                    .header(reqwest::header::ACCEPT, "audio/mpeg")
                    .json(&json!({ "text": text, "model_id": "eleven_multilingual_v2" }));
                ("ElevenLabs", request)
            }
        };

        let result = async {
            let response = request
                .send()
                .await
                .map_err(|e| ServiceError::upstream(service, e))?;
            let status = response.status();
            if !status.is_success() {
                let detail = response.text().await.unwrap_or_default();
                tracing::warn!("{} TTS error {}: {}", service, status, detail);
                return Err(ServiceError::upstream(service, format!("HTTP {status}")));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| ServiceError::upstream(service, e))?;
            if bytes.is_empty() {
                return Err(ServiceError::upstream(service, "empty audio"));
            }
            Ok(bytes.to_vec())
        }
        .await;

        metrics::record_ai(
            match provider {
                TtsProvider::Deepgram => "deepgram",
                TtsProvider::ElevenLabs => "elevenlabs",
            },
            result.is_ok(),
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_falls_back_to_configured_key() {
        let both = SpeechClient::new(Client::new(), Some("d".into()), Some("e".into()));
        assert_eq!(both.pick_provider(None).unwrap(), TtsProvider::Deepgram);
        assert_eq!(
            both.pick_provider(Some(TtsProvider::ElevenLabs)).unwrap(),
            TtsProvider::ElevenLabs
        );

        let eleven = SpeechClient::new(Client::new(), None, Some("e".into()));
        assert_eq!(eleven.pick_provider(None).unwrap(), TtsProvider::ElevenLabs);

        let none = SpeechClient::new(Client::new(), None, None);
        assert!(matches!(
            none.pick_provider(None),
            Err(ServiceError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn rejects_blank_text_before_calling_out() {
        let speech = SpeechClient::new(Client::new(), Some("d".into()), None);
        let err = speech
            .synthesize(TtsProvider::Deepgram, "   ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
    }

    #[test]
    fn provider_names_are_lowercase_on_the_wire() {
        let p: TtsProvider = serde_json::from_str("\"elevenlabs\"").unwrap();
        assert_eq!(p, TtsProvider::ElevenLabs);
    }
}
