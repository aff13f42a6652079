//! Chat completion collaborator
//!
//! Speaks the OpenAI-compatible `chat/completions` protocol (Groq by default).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::dialogue::Message;
use crate::{Error, Result};

/// Default completion endpoint
pub const DEFAULT_COMPLETION_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Produces the next assistant reply for a conversation
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Request a completion and return the first candidate's content
    ///
    /// # Errors
    ///
    /// `Error::Config` when no credential is available, `Error::Network` /
    /// `Error::Http` when the call fails, `Error::Parse` when the body has no
    /// reply content.
    async fn complete(&self, model: &str, messages: &[Message]) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// HTTP client for an OpenAI-compatible completion API
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    url: String,
}

impl ChatCompletionsClient {
    /// Create a client for the given endpoint
    ///
    /// A missing key is accepted; requests then fail with `Error::Config`.
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
impl CompletionClient for ChatCompletionsClient {
    async fn complete(&self, model: &str, messages: &[Message]) -> Result<String> {
        let Some(api_key) = self.api_key.as_ref().map(ExposeSecret::expose_secret) else {
            return Err(Error::Config("completion API key missing".to_string()));
        };

        tracing::debug!(model, messages = messages.len(), "requesting completion");

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&ChatRequest { model, messages })
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "completion request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "completion API error");
            return Err(Error::Network(format!("completion API error {status}")));
        }

        let body = response.text().await?;
        parse_reply(&body)
    }
}

/// Extract `choices[0].message.content` from a completion response body
fn parse_reply(body: &str) -> Result<String> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| Error::Parse(format!("invalid body: {e}")))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| Error::Parse("response has no reply content".to_string()))
}
