//! Voice Tutor - spoken-dialogue tutoring pipeline
//!
//! A learner's text or speech becomes a prompt for a remote language model;
//! the reply is sanitized, spoken aloud and echoed into a transcript.
//! Spoken replies are cached so identical lines are not re-synthesized.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    TutorSession                      │
//! │   typed text  │  speech (STT)  │  repeat  │  level   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │               ConversationManager                    │
//! │   history  │  system prompt per level  │  sanitize   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │               SpeechSynthesizer                      │
//! │   AudioCache  │  TTS backend  │  playback  │ notify  │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod completion;
pub mod config;
pub mod dialogue;
pub mod display;
pub mod error;
pub mod sanitize;
pub mod session;
pub mod speech;
pub mod transcription;

pub use completion::{ChatCompletionsClient, CompletionClient};
pub use config::Config;
pub use dialogue::{
    ConversationManager, Level, Message, Role, TurnOutcome, TurnPhase, TutorPrompts,
};
pub use display::{ChatDisplay, StyleHint, Transcript};
pub use error::{Error, Result};
pub use sanitize::sanitize;
pub use session::TutorSession;
pub use speech::{
    AudioCache, AudioSink, AudioSource, CacheKey, PlaybackObserver, SpeechSynthesizer,
    SynthesisBackend, VoiceConfig, VoiceParams,
};
pub use transcription::{GoogleStt, Transcriber};
