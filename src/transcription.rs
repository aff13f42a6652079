//! Speech-to-text (Google Cloud Speech)

use std::io::Cursor;

use async_trait::async_trait;
use base64::Engine as _;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default recognition endpoint
pub const DEFAULT_STT_URL: &str = "https://speech.googleapis.com/v1/speech:recognize";

/// Turns recorded speech into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a 16-bit PCM WAV recording
    ///
    /// Returns `None` when the provider recognized nothing.
    ///
    /// # Errors
    ///
    /// Returns error if the audio is not 16-bit PCM WAV, the credential is
    /// missing or the request fails
    async fn transcribe(&self, wav: &[u8]) -> Result<Option<String>>;
}

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig<'a> {
    encoding: &'static str,
    sample_rate_hertz: u32,
    language_code: &'a str,
}

#[derive(Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<RecognitionAlternative>,
}

#[derive(Deserialize)]
struct RecognitionAlternative {
    #[serde(default)]
    transcript: String,
}

/// Google Cloud Speech client
pub struct GoogleStt {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    url: String,
    language_code: String,
}

impl GoogleStt {
    #[must_use]
    pub fn new(
        api_key: Option<SecretString>,
        url: impl Into<String>,
        language_code: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.expose_secret().is_empty()),
            url: url.into(),
            language_code: language_code.into(),
        }
    }
}

/// Sample rate of a 16-bit integer PCM WAV file
fn linear16_sample_rate(wav: &[u8]) -> Result<u32> {
    let reader = hound::WavReader::new(Cursor::new(wav))
        .map_err(|e| Error::Content(format!("invalid WAV audio: {e}")))?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(Error::Content(format!(
            "expected 16-bit PCM, got {} bits {:?}",
            spec.bits_per_sample, spec.sample_format
        )));
    }
    Ok(spec.sample_rate)
}

#[async_trait]
impl Transcriber for GoogleStt {
    async fn transcribe(&self, wav: &[u8]) -> Result<Option<String>> {
        let Some(api_key) = self.api_key.as_ref().map(ExposeSecret::expose_secret) else {
            return Err(Error::Config("speech API key missing".to_string()));
        };

        let sample_rate = linear16_sample_rate(wav)?;
        tracing::debug!(audio_bytes = wav.len(), sample_rate, "starting transcription");

        let request = RecognizeRequest {
            config: RecognitionConfig {
                encoding: "LINEAR16",
                sample_rate_hertz: sample_rate,
                language_code: &self.language_code,
            },
            audio: RecognitionAudio {
                content: base64::engine::general_purpose::STANDARD.encode(wav),
            },
        };

        let response = self
            .client
            .post(&self.url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "transcription request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(Error::Network(format!("transcription API error {status}")));
        }

        let result: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(format!("invalid transcription response: {e}")))?;

        let transcript = result
            .results
            .into_iter()
            .next()
            .and_then(|r| r.alternatives.into_iter().next())
            .map(|a| a.transcript.trim().to_string())
            .filter(|t| !t.is_empty());

        match &transcript {
            Some(text) => tracing::info!(transcript = %text, "transcription complete"),
            None => tracing::warn!("transcription returned no results"),
        }

        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav(bits: u16, format: hound::SampleFormat, rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: rate,
            bits_per_sample: bits,
            sample_format: format,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..16 {
                match format {
                    hound::SampleFormat::Int => writer.write_sample(0i16).unwrap(),
                    hound::SampleFormat::Float => writer.write_sample(0.0f32).unwrap(),
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn reads_sample_rate_from_header() {
        let audio = wav(16, hound::SampleFormat::Int, 16000);
        assert_eq!(linear16_sample_rate(&audio).unwrap(), 16000);
    }

    #[test]
    fn rejects_float_wav() {
        let audio = wav(32, hound::SampleFormat::Float, 16000);
        assert!(matches!(linear16_sample_rate(&audio), Err(Error::Content(_))));
    }

    #[test]
    fn rejects_non_wav() {
        assert!(matches!(linear16_sample_rate(b"RIFFnope"), Err(Error::Content(_))));
    }
}
