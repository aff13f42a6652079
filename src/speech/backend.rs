//! Network speech synthesis (Google Cloud Text-to-Speech)

use async_trait::async_trait;
use base64::Engine as _;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::VoiceParams;
use crate::{Error, Result};

/// Default synthesis endpoint
pub const DEFAULT_TTS_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

/// Output sample rate requested from the provider
pub const SYNTHESIS_SAMPLE_RATE: u32 = 24000;

/// Turns text into encoded audio
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    /// Synthesize `text` and return MP3 bytes
    ///
    /// # Errors
    ///
    /// `Error::Config` without credentials, `Error::Network` / `Error::Http`
    /// on failed calls, `Error::Content` when no audio comes back.
    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> Result<Vec<u8>>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    pitch: f32,
    speaking_rate: f32,
    sample_rate_hertz: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: Option<String>,
}

/// Google Cloud Text-to-Speech client
pub struct GoogleTts {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    url: String,
}

impl GoogleTts {
    /// Create a client; a missing key makes every call fail with `Error::Config`
    #[must_use]
    pub fn new(api_key: Option<SecretString>, url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.expose_secret().is_empty()),
            url: url.into(),
        }
    }
}

#[async_trait]
impl SynthesisBackend for GoogleTts {
    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> Result<Vec<u8>> {
        let Some(api_key) = self.api_key.as_ref().map(ExposeSecret::expose_secret) else {
            return Err(Error::Config("speech API key missing".to_string()));
        };

        let request = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &voice.language_code,
                name: &voice.name,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                pitch: voice.pitch,
                speaking_rate: voice.speaking_rate,
                sample_rate_hertz: SYNTHESIS_SAMPLE_RATE,
            },
        };

        tracing::debug!(voice = %voice.name, chars = text.chars().count(), "requesting synthesis");

        let response = self
            .client
            .post(&self.url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "synthesis API error");
            return Err(Error::Network(format!("synthesis API error {status}")));
        }

        let result: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(format!("invalid synthesis response: {e}")))?;

        let encoded = result
            .audio_content
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::Content("synthesis returned no audio".to_string()))?;

        let audio = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| Error::Content(format!("audio payload is not base64: {e}")))?;

        if audio.is_empty() {
            return Err(Error::Content("synthesis returned no audio".to_string()));
        }

        Ok(audio)
    }
}
