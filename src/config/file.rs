//! TOML configuration file loading
//!
//! Supports `~/.config/voice-tutor/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::dialogue::Level;
use crate::speech::VoiceProfile;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct TutorConfigFile {
    /// Completion (LLM) configuration
    #[serde(default)]
    pub completion: CompletionFileConfig,

    /// Speech synthesis, transcription and cache configuration
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// Level selection and instruction texts
    #[serde(default)]
    pub levels: LevelsFileConfig,
}

/// Completion API configuration
#[derive(Debug, Default, Deserialize)]
pub struct CompletionFileConfig {
    pub api_key: Option<String>,

    /// Model identifier (e.g. "llama-3.1-8b-instant")
    pub model: Option<String>,

    /// OpenAI-compatible `chat/completions` endpoint
    pub url: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Speech configuration
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// Google Cloud API key (TTS and STT)
    pub api_key: Option<String>,

    pub tts_url: Option<String>,

    pub stt_url: Option<String>,

    /// Voice profile ("robot", "male", "female")
    pub voice: Option<VoiceProfile>,

    /// Provider voice name overriding the profile
    pub voice_name: Option<String>,

    /// Language code (e.g. "pt-BR")
    pub language: Option<String>,

    /// Audio cache directory
    pub cache_dir: Option<PathBuf>,

    /// Audio cache capacity in megabytes
    pub cache_max_mb: Option<u64>,
}

/// Level configuration
#[derive(Debug, Default, Deserialize)]
pub struct LevelsFileConfig {
    /// Level active at startup
    pub default: Option<Level>,

    /// Rules shared by all levels
    pub preamble: Option<String>,

    pub beginner: Option<String>,
    pub intermediate: Option<String>,
    pub advanced: Option<String>,
}

/// Load the TOML config file
///
/// Uses `path` when given, the standard location otherwise. Returns
/// `TutorConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file(path: Option<&Path>) -> TutorConfigFile {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_file_path) else {
        return TutorConfigFile::default();
    };

    if !path.exists() {
        return TutorConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                TutorConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            TutorConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/voice-tutor/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voice-tutor").join("config.toml"))
}
