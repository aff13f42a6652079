//! Speech output: synthesis, audio cache and playback
//!
//! [`SpeechSynthesizer`] looks up the [`AudioCache`] by fingerprint, falls
//! back to a [`SynthesisBackend`] on a miss, and hands the audio to an
//! [`AudioSink`].

mod backend;
mod cache;
mod playback;
mod synthesizer;
mod voice;

pub use backend::{DEFAULT_TTS_URL, GoogleTts, SYNTHESIS_SAMPLE_RATE, SynthesisBackend};
pub use cache::{
    AudioCache, CACHE_FILE_EXT, CACHE_FILE_PREFIX, CacheEntry, CacheKey, CacheStats,
    DEFAULT_CAPACITY_BYTES,
};
pub use playback::{AudioSink, SilentSink, SpeakerSink};
pub use synthesizer::{AudioSource, DEFAULT_SYNTHESIS_TIMEOUT, PlaybackObserver, SpeechSynthesizer};
pub use voice::{VoiceConfig, VoiceParams, VoiceProfile};
