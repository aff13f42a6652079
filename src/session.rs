//! A tutoring session: every component wired together
//!
//! ```text
//! typed text ─┐
//!             ├─▶ ConversationManager ─▶ completion ─▶ sanitize ─▶ SpeechSynthesizer
//! speech ─▶ STT ┘                                                    │
//!                                                   AudioCache ◀─────┤
//!                                                   Transcript ◀─────┘ playback started
//! ```

use std::sync::Arc;

use crate::completion::{ChatCompletionsClient, CompletionClient};
use crate::config::Config;
use crate::dialogue::{ConversationManager, Level, TurnOutcome};
use crate::display::{ChatDisplay, MAX_TRANSCRIPT_ENTRIES, Transcript};
use crate::speech::{AudioCache, AudioSink, GoogleTts, SpeechSynthesizer};
use crate::transcription::{GoogleStt, Transcriber};
use crate::{Error, Result};

/// Owns the dialogue, speech output, transcription and transcript
pub struct TutorSession {
    manager: ConversationManager,
    speech: Arc<SpeechSynthesizer>,
    transcriber: Arc<dyn Transcriber>,
    transcript: Arc<Transcript>,
}

impl TutorSession {
    /// Assemble a session from already-built parts
    #[must_use]
    pub fn new(
        manager: ConversationManager,
        speech: Arc<SpeechSynthesizer>,
        transcriber: Arc<dyn Transcriber>,
        transcript: Arc<Transcript>,
    ) -> Self {
        Self {
            manager,
            speech,
            transcriber,
            transcript,
        }
    }

    /// Build the HTTP-backed session described by `config`
    ///
    /// `echo` prints transcript lines to stdout as they are added.
    ///
    /// # Errors
    ///
    /// Returns error if the audio cache directory cannot be opened
    pub fn from_config(config: &Config, sink: Arc<dyn AudioSink>, echo: bool) -> Result<Self> {
        config.warn_missing_credentials();

        let transcript = Arc::new(Transcript::new(MAX_TRANSCRIPT_ENTRIES, echo));

        let cache = AudioCache::open(&config.speech.cache_dir, config.speech.cache_capacity_bytes)?;
        let backend = Arc::new(GoogleTts::new(
            config.speech.api_key.clone(),
            config.speech.url.clone(),
        ));
        let speech = Arc::new(
            SpeechSynthesizer::new(backend, sink, cache, config.speech.voice.resolve())
                .with_observer(Arc::clone(&transcript) as _)
                .with_timeout(config.speech.timeout),
        );

        let completion: Arc<dyn CompletionClient> = Arc::new(ChatCompletionsClient::new(
            config.completion.api_key.clone(),
            config.completion.url.clone(),
        ));
        let manager = ConversationManager::new(
            completion,
            Arc::clone(&speech),
            Arc::clone(&transcript) as Arc<dyn ChatDisplay>,
            config.prompts.clone(),
            config.completion.model.clone(),
            config.level,
        )
        .with_timeout(config.completion.timeout)
        .with_user_echo();

        let transcriber = Arc::new(GoogleStt::new(
            config.transcription.api_key.clone(),
            config.transcription.url.clone(),
            config.transcription.language_code.clone(),
        ));

        Ok(Self::new(manager, speech, transcriber, transcript))
    }

    #[must_use]
    pub const fn manager(&self) -> &ConversationManager {
        &self.manager
    }

    #[must_use]
    pub fn speech(&self) -> &SpeechSynthesizer {
        &self.speech
    }

    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Handle a typed (or transcribed) learner utterance
    ///
    /// With a manager built [`ConversationManager::with_user_echo`], the
    /// utterance is shown once its turn has been claimed. Nothing is shown
    /// for empty input or while another turn is in flight.
    pub async fn handle_text(&self, text: &str) -> TurnOutcome {
        self.manager.submit_utterance(text).await
    }

    /// Transcribe a WAV recording without touching the dialogue
    ///
    /// # Errors
    ///
    /// Returns the transcriber's error
    pub async fn transcribe(&self, wav: &[u8]) -> Result<Option<String>> {
        let text = self.transcriber.transcribe(wav).await?;
        tracing::debug!(recognized = text.is_some(), "transcription finished");
        Ok(text)
    }

    /// Transcribe a WAV recording and handle it as an utterance
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails; the dialogue is untouched then
    pub async fn handle_speech(&self, wav: &[u8]) -> Result<TurnOutcome> {
        match self.transcribe(wav).await? {
            Some(text) => Ok(self.handle_text(&text).await),
            None => Ok(TurnOutcome::Ignored),
        }
    }

    /// Replay the latest tutor line without adding it to the transcript again
    ///
    /// # Errors
    ///
    /// Returns `Error::Content` when there is nothing to repeat, or the
    /// synthesizer's error
    pub async fn repeat_last(&self) -> Result<String> {
        let text = self
            .transcript
            .last_repeatable()
            .ok_or_else(|| Error::Content("nothing to repeat yet".to_string()))?;

        self.speech.speak(&text, false).await?;
        Ok(text)
    }

    pub async fn set_level(&self, level: Level) {
        self.manager.set_level(level).await;
    }
}
