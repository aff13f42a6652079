//! Conversation state and the per-utterance turn

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;

use super::{Level, Message, Role, TutorPrompts};
use crate::completion::CompletionClient;
use crate::display::{ASSISTANT_PREFIX, ChatDisplay, StyleHint, USER_PREFIX};
use crate::sanitize::sanitize;
use crate::speech::SpeechSynthesizer;
use crate::{Error, Result};

/// Spoken and shown when the completion call fails
pub const FALLBACK_REPLY: &str = "Erro ao processar. Tente novamente.";

/// Used as the reply when the completion body cannot be interpreted
pub const UNPARSABLE_REPLY: &str = "Erro ao interpretar resposta.";

/// Used as the reply when nothing is left after sanitizing
pub const EMPTY_REPLY: &str = "Não entendi sua pergunta.";

/// Default bound on a single completion request
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the manager is in the current turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TurnPhase {
    Idle = 0,
    AwaitingCompletion = 1,
    SpeechPending = 2,
}

impl TurnPhase {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::AwaitingCompletion,
            2 => Self::SpeechPending,
            _ => Self::Idle,
        }
    }
}

/// Result of [`ConversationManager::submit_utterance`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Utterance was empty or whitespace only
    Ignored,
    /// Another turn was still in flight; nothing was recorded
    Busy,
    /// Reply appended to history and handed to speech
    Replied(String),
    /// Completion failed; the fallback was shown and spoken
    Failed(String),
}

#[derive(Debug)]
struct Dialogue {
    level: Level,
    history: Vec<Message>,
    /// Bumped on level change; replies from an older epoch are not recorded
    epoch: u64,
}

/// Resets the phase to idle when the turn ends, including on cancellation
struct TurnGuard<'a>(&'a AtomicU8);

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.0.store(TurnPhase::Idle as u8, Ordering::Release);
    }
}

/// Owns the conversation and runs one turn per utterance
///
/// Turns are single-flight: a submission made while another is in progress
/// is rejected with [`TurnOutcome::Busy`].
pub struct ConversationManager {
    completion: Arc<dyn CompletionClient>,
    speech: Arc<SpeechSynthesizer>,
    display: Arc<dyn ChatDisplay>,
    prompts: TutorPrompts,
    model: String,
    timeout: Duration,
    /// Show accepted utterances on the display as `Você: ` lines
    echo_user: bool,
    dialogue: Mutex<Dialogue>,
    phase: AtomicU8,
}

impl ConversationManager {
    /// Create a manager at `level` with the system message already in place
    #[must_use]
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        speech: Arc<SpeechSynthesizer>,
        display: Arc<dyn ChatDisplay>,
        prompts: TutorPrompts,
        model: impl Into<String>,
        level: Level,
    ) -> Self {
        let mut dialogue = Dialogue {
            level,
            history: Vec::new(),
            epoch: 0,
        };
        apply_system_message(&prompts, &mut dialogue);

        Self {
            completion,
            speech,
            display,
            prompts,
            model: model.into(),
            timeout: DEFAULT_COMPLETION_TIMEOUT,
            echo_user: false,
            dialogue: Mutex::new(dialogue),
            phase: AtomicU8::new(TurnPhase::Idle as u8),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Show each accepted utterance on the display before its reply
    ///
    /// Rejected and empty utterances are never shown.
    #[must_use]
    pub const fn with_user_echo(mut self) -> Self {
        self.echo_user = true;
        self
    }

    pub async fn level(&self) -> Level {
        self.dialogue.lock().await.level
    }

    /// Copy of the conversation history
    pub async fn history(&self) -> Vec<Message> {
        self.dialogue.lock().await.history.clone()
    }

    #[must_use]
    pub fn phase(&self) -> TurnPhase {
        TurnPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Switch difficulty level
    ///
    /// Clears all user and assistant messages, installs the system message
    /// for the new level and announces the change on the display.
    pub async fn set_level(&self, level: Level) {
        {
            let mut dialogue = self.dialogue.lock().await;
            dialogue.level = level;
            dialogue.history.clear();
            dialogue.epoch += 1;
            apply_system_message(&self.prompts, &mut dialogue);
        }

        tracing::info!(level = ?level, "learning level changed");
        self.display
            .append_message(&format!("--- Nível alterado para {level} ---"), StyleHint::Notice);
    }

    /// Run one turn for a learner utterance
    pub async fn submit_utterance(&self, text: &str) -> TurnOutcome {
        let text = text.trim();
        if text.is_empty() {
            return TurnOutcome::Ignored;
        }

        let Some(_guard) = self.begin_turn() else {
            tracing::warn!("utterance rejected: previous turn still in progress");
            return TurnOutcome::Busy;
        };

        if self.echo_user {
            self.display
                .append_message(&format!("{USER_PREFIX}{text}"), StyleHint::User);
        }

        let (messages, epoch) = {
            let mut dialogue = self.dialogue.lock().await;
            apply_system_message(&self.prompts, &mut dialogue);
            dialogue.history.push(Message::user(text));
            (dialogue.history.clone(), dialogue.epoch)
        };

        let reply = match self.request_completion(&messages).await {
            Ok(raw) => {
                let clean = sanitize(&raw);
                if clean.is_empty() {
                    EMPTY_REPLY.to_string()
                } else {
                    clean
                }
            }
            Err(Error::Parse(reason)) => {
                tracing::warn!(reason = %reason, "completion response not understood");
                UNPARSABLE_REPLY.to_string()
            }
            Err(e) => {
                if e.is_network() {
                    tracing::warn!(error = %e, "completion service unreachable");
                } else {
                    tracing::warn!(error = %e, "completion failed");
                }
                self.deliver_fallback().await;
                return TurnOutcome::Failed(FALLBACK_REPLY.to_string());
            }
        };

        {
            let mut dialogue = self.dialogue.lock().await;
            if dialogue.epoch == epoch {
                dialogue.history.push(Message::assistant(reply.clone()));
            } else {
                tracing::debug!("level changed during turn, reply not recorded");
            }
        }

        self.phase
            .store(TurnPhase::SpeechPending as u8, Ordering::Release);

        if let Err(e) = self.speech.speak(&reply, true).await {
            // no playback means no echo from the synthesizer; show the text directly
            tracing::warn!(error = %e, "reply could not be spoken");
            self.display.append_message(
                &format!("{ASSISTANT_PREFIX}{reply}"),
                StyleHint::Assistant,
            );
        }

        TurnOutcome::Replied(reply)
    }

    fn begin_turn(&self) -> Option<TurnGuard<'_>> {
        self.phase
            .compare_exchange(
                TurnPhase::Idle as u8,
                TurnPhase::AwaitingCompletion as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| TurnGuard(&self.phase))
    }

    async fn request_completion(&self, messages: &[Message]) -> Result<String> {
        tokio::time::timeout(self.timeout, self.completion.complete(&self.model, messages))
            .await
            .map_err(|_| Error::Network("completion request timed out".to_string()))?
    }

    async fn deliver_fallback(&self) {
        self.display.append_message(FALLBACK_REPLY, StyleHint::Error);
        if let Err(e) = self.speech.speak(FALLBACK_REPLY, false).await {
            tracing::debug!(error = %e, "fallback could not be spoken");
        }
    }
}

/// Replace any system message with the one for the current level
fn apply_system_message(prompts: &TutorPrompts, dialogue: &mut Dialogue) {
    dialogue.history.retain(|m| m.role != Role::System);
    dialogue
        .history
        .push(Message::system(prompts.system_prompt(dialogue.level)));
}
