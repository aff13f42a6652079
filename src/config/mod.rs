//! Configuration management for the voice tutor
//!
//! Built once at startup and passed to each component. Precedence per field:
//! process environment > env file > TOML file > default.

pub mod env_file;
pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;

use crate::completion::DEFAULT_COMPLETION_URL;
use crate::dialogue::{Level, TutorPrompts};
use crate::speech::{DEFAULT_CAPACITY_BYTES, DEFAULT_TTS_URL, VoiceConfig};
use crate::transcription::DEFAULT_STT_URL;
use crate::{Error, Result};

use self::file::TutorConfigFile;

/// Default completion model
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Voice tutor configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub completion: CompletionConfig,
    pub speech: SpeechConfig,
    pub transcription: TranscriptionConfig,

    /// Level active at startup
    pub level: Level,

    /// Instruction texts for the system message
    pub prompts: TutorPrompts,
}

/// Completion API configuration
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Bearer credential (from `GROQ_API_KEY`)
    pub api_key: Option<SecretString>,

    /// Model identifier (from `MODEL`)
    pub model: String,

    pub url: String,

    pub timeout: Duration,
}

/// Speech synthesis configuration
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Google Cloud credential (from `GOOGLE_CLOUD_API_KEY`)
    pub api_key: Option<SecretString>,

    pub url: String,

    pub voice: VoiceConfig,

    /// Directory holding cached clips
    pub cache_dir: PathBuf,

    /// Total cached bytes allowed before the store is purged
    pub cache_capacity_bytes: u64,

    pub timeout: Duration,
}

/// Transcription configuration
#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    /// Google Cloud credential, shared with synthesis
    pub api_key: Option<SecretString>,

    pub url: String,

    pub language_code: String,
}

/// Default audio cache directory: `<temp>/voice-tutor`
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("voice-tutor")
}

impl Config {
    /// Load configuration from the environment, an optional env file and the
    /// TOML config file (`config_path` or the standard location)
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but invalid (unknown level or
    /// voice, non-numeric size). Missing credentials are not an error.
    pub fn load(config_path: Option<&Path>, env_file: Option<&Path>) -> Result<Self> {
        let fc = file::load_config_file(config_path);
        let file_env = env_file.map(env_file::load_env_file).unwrap_or_default();

        Self::resolve(fc, |key| {
            std::env::var(key)
                .ok()
                .or_else(|| file_env.get(key).cloned())
        })
    }

    /// Build configuration from a parsed file and a variable lookup
    ///
    /// # Errors
    ///
    /// Returns error if a looked-up value cannot be parsed
    pub fn resolve(fc: TutorConfigFile, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout_secs = match var("TUTOR_TIMEOUT_SECS") {
            Some(v) => parse_number(&v, "TUTOR_TIMEOUT_SECS")?,
            None => fc.completion.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        let timeout = Duration::from_secs(timeout_secs);

        let completion = CompletionConfig {
            api_key: var("GROQ_API_KEY")
                .or(fc.completion.api_key)
                .map(SecretString::from),
            model: var("MODEL")
                .or(fc.completion.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            url: var("TUTOR_COMPLETION_URL")
                .or(fc.completion.url)
                .unwrap_or_else(|| DEFAULT_COMPLETION_URL.to_string()),
            timeout,
        };

        // Voice config (env > toml > default)
        let speech_file = fc.speech;
        let profile = match var("TUTOR_VOICE") {
            Some(v) => v.parse()?,
            None => speech_file.voice.unwrap_or_default(),
        };
        let language_code = var("TUTOR_LANGUAGE")
            .or(speech_file.language)
            .unwrap_or_else(|| "pt-BR".to_string());
        let voice = VoiceConfig {
            profile,
            name_override: var("TUTOR_VOICE_NAME").or(speech_file.voice_name),
            language_code: language_code.clone(),
        };

        let cache_max_mb = match var("TUTOR_CACHE_MAX_MB") {
            Some(v) => Some(parse_number(&v, "TUTOR_CACHE_MAX_MB")?),
            None => speech_file.cache_max_mb,
        };

        let cache_capacity_bytes = match cache_max_mb {
            Some(mb) => mb.checked_mul(1024 * 1024).ok_or_else(|| {
                Error::Config(format!("cache capacity of {mb} MB is too large"))
            })?,
            None => DEFAULT_CAPACITY_BYTES,
        };

        let google_key = var("GOOGLE_CLOUD_API_KEY")
            .or(speech_file.api_key)
            .map(SecretString::from);

        let speech = SpeechConfig {
            api_key: google_key.clone(),
            url: var("TUTOR_TTS_URL")
                .or(speech_file.tts_url)
                .unwrap_or_else(|| DEFAULT_TTS_URL.to_string()),
            voice,
            cache_dir: var("TUTOR_CACHE_DIR")
                .map(PathBuf::from)
                .or(speech_file.cache_dir)
                .unwrap_or_else(default_cache_dir),
            cache_capacity_bytes,
            timeout,
        };

        let transcription = TranscriptionConfig {
            api_key: google_key,
            url: var("TUTOR_STT_URL")
                .or(speech_file.stt_url)
                .unwrap_or_else(|| DEFAULT_STT_URL.to_string()),
            language_code,
        };

        let level = match var("TUTOR_LEVEL") {
            Some(v) => v.parse()?,
            None => fc.levels.default.unwrap_or_default(),
        };

        let defaults = TutorPrompts::default();
        let prompts = TutorPrompts {
            preamble: fc.levels.preamble.unwrap_or(defaults.preamble),
            beginner: fc.levels.beginner.unwrap_or(defaults.beginner),
            intermediate: fc.levels.intermediate.unwrap_or(defaults.intermediate),
            advanced: fc.levels.advanced.unwrap_or(defaults.advanced),
        };

        Ok(Self {
            completion,
            speech,
            transcription,
            level,
            prompts,
        })
    }

    /// Log each missing credential once; the affected features degrade to
    /// their failure path
    pub fn warn_missing_credentials(&self) {
        if self.completion.api_key.is_none() {
            tracing::warn!("GROQ_API_KEY not set, replies will fall back to the error message");
        }
        if self.speech.api_key.is_none() {
            tracing::warn!(
                "GOOGLE_CLOUD_API_KEY not set, speech synthesis and transcription are disabled"
            );
        }
    }
}

fn parse_number(value: &str, key: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} must be a whole number, got {value:?}")))
}
