//! Chat display collaborator and the bounded transcript

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::speech::PlaybackObserver;

/// Prefix of learner lines in the transcript
pub const USER_PREFIX: &str = "Você: ";

/// Prefix of tutor lines in the transcript
pub const ASSISTANT_PREFIX: &str = "IA: ";

/// Transcript entries kept before the oldest is dropped
pub const MAX_TRANSCRIPT_ENTRIES: usize = 25;

/// How a line should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleHint {
    /// Learner input (cyan)
    User,
    /// Tutor reply (white)
    Assistant,
    /// Session notices such as level changes (yellow)
    Notice,
    /// Failure fallback (red)
    Error,
}

/// Receives text to show the learner
///
/// The tutor only pushes to the display and never reads from it.
pub trait ChatDisplay: Send + Sync {
    fn append_message(&self, text: &str, style: StyleHint);
}

/// One line of the transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub text: String,
    pub style: StyleHint,
    /// Text to replay when the learner asks for a repeat; set for tutor
    /// replies and the failure fallback
    pub repeat_text: Option<String>,
}

/// Remove any number of leading `IA:` markers
#[must_use]
pub fn strip_assistant_prefix(text: &str) -> &str {
    let mut rest = text.trim();
    while let Some(stripped) = rest.strip_prefix(ASSISTANT_PREFIX.trim_end()) {
        rest = stripped.trim_start();
    }
    rest
}

/// In-memory transcript, optionally echoed to stdout
///
/// Tutor replies reach it through [`PlaybackObserver`], so a line is written
/// when its audio starts rather than when the model answers.
#[derive(Debug)]
pub struct Transcript {
    entries: Mutex<VecDeque<TranscriptEntry>>,
    max_entries: usize,
    echo: bool,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new(MAX_TRANSCRIPT_ENTRIES, false)
    }
}

impl Transcript {
    #[must_use]
    pub fn new(max_entries: usize, echo: bool) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(max_entries)),
            max_entries: max_entries.max(1),
            echo,
        }
    }

    /// Snapshot of the current lines, oldest first
    #[must_use]
    pub fn entries(&self) -> Vec<TranscriptEntry> {
        self.entries
            .lock()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Most recent line that can be replayed
    #[must_use]
    pub fn last_repeatable(&self) -> Option<String> {
        self.entries
            .lock()
            .ok()?
            .iter()
            .rev()
            .find_map(|e| e.repeat_text.clone())
    }
}

impl ChatDisplay for Transcript {
    fn append_message(&self, text: &str, style: StyleHint) {
        let repeat_text = matches!(style, StyleHint::Assistant | StyleHint::Error)
            .then(|| strip_assistant_prefix(text).to_string())
            .filter(|t| !t.is_empty());

        if self.echo {
            println!("{text}");
        }

        if let Ok(mut entries) = self.entries.lock() {
            while entries.len() >= self.max_entries {
                entries.pop_front();
            }
            entries.push_back(TranscriptEntry {
                text: text.to_string(),
                style,
                repeat_text,
            });
        }
    }
}

impl PlaybackObserver for Transcript {
    fn playback_started(&self, text: &str) {
        self.append_message(&format!("{ASSISTANT_PREFIX}{text}"), StyleHint::Assistant);
    }
}
