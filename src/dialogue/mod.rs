//! Tutoring dialogue: history, difficulty levels and the turn loop

mod level;
mod manager;
mod message;

pub use level::{DEFAULT_PREAMBLE, Level, TutorPrompts};
pub use manager::{
    ConversationManager, DEFAULT_COMPLETION_TIMEOUT, EMPTY_REPLY, FALLBACK_REPLY, TurnOutcome,
    TurnPhase, UNPARSABLE_REPLY,
};
pub use message::{Message, Role};
