//! Cached text-to-speech with playback notification

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;

use super::{AudioCache, AudioSink, CacheKey, CacheStats, SynthesisBackend, VoiceParams};
use crate::{Error, Result};

/// Default bound on a single synthesis request
pub const DEFAULT_SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(30);

/// Margin subtracted from the clip length when clearing the speaking flag
const FINISH_MARGIN: Duration = Duration::from_millis(250);

/// Receives a callback when spoken audio starts playing
pub trait PlaybackObserver: Send + Sync {
    /// Audio for `text` has begun playing
    fn playback_started(&self, text: &str);
}

/// Where the played audio came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSource {
    Cache,
    Network,
}

#[derive(Debug, Default)]
struct PlaybackState {
    speaking: AtomicBool,
    /// Bumped on every playback so stale finish timers are ignored
    generation: AtomicU64,
}

/// Speaks text, consulting the audio cache before the network
pub struct SpeechSynthesizer {
    backend: Arc<dyn SynthesisBackend>,
    sink: Arc<dyn AudioSink>,
    observer: Option<Arc<dyn PlaybackObserver>>,
    voice: VoiceParams,
    cache: Mutex<AudioCache>,
    playback: Arc<PlaybackState>,
    request_timeout: Duration,
}

impl SpeechSynthesizer {
    #[must_use]
    pub fn new(
        backend: Arc<dyn SynthesisBackend>,
        sink: Arc<dyn AudioSink>,
        cache: AudioCache,
        voice: VoiceParams,
    ) -> Self {
        Self {
            backend,
            sink,
            observer: None,
            voice,
            cache: Mutex::new(cache),
            playback: Arc::new(PlaybackState::default()),
            request_timeout: DEFAULT_SYNTHESIS_TIMEOUT,
        }
    }

    /// Register the receiver of playback-started notifications
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PlaybackObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn voice(&self) -> &VoiceParams {
        &self.voice
    }

    /// Cache key for `text` with this synthesizer's voice
    #[must_use]
    pub fn cache_key(&self, text: &str) -> CacheKey {
        CacheKey::new(text, &self.voice.identifier())
    }

    /// Whether a clip is currently playing
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.playback.speaking.load(Ordering::Acquire)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.lock().await.stats()
    }

    /// Remove every cached clip
    ///
    /// # Errors
    ///
    /// Returns error if the cache directory cannot be listed
    pub async fn clear_cache(&self) -> Result<usize> {
        self.cache.lock().await.clear()
    }

    /// Speak `text`, from cache when possible
    ///
    /// When `notify` is set, the observer receives `text` once playback has
    /// started. Repeat actions pass `false` so the transcript is not echoed
    /// twice.
    ///
    /// # Errors
    ///
    /// Returns error for empty text, failed synthesis (missing credential,
    /// network, empty payload) or playback failure. Nothing is cached and no
    /// notification is sent in those cases.
    pub async fn speak(&self, text: &str, notify: bool) -> Result<AudioSource> {
        if text.trim().is_empty() {
            return Err(Error::Content("nothing to speak".to_string()));
        }

        let key = self.cache_key(text);

        let cached = self.cache.lock().await.get(&key).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "audio cache read failed, synthesizing");
            None
        });

        if let Some(audio) = cached {
            self.start_playback(text, &audio, notify)?;
            return Ok(AudioSource::Cache);
        }

        let audio = self.synthesize(text).await.map_err(|e| {
            tracing::error!(error = %e, "speech synthesis failed");
            e
        })?;

        if let Err(e) = self.cache.lock().await.put(&key, &audio) {
            tracing::warn!(error = %e, "failed to cache synthesized audio");
        }

        self.start_playback(text, &audio, notify)?;
        Ok(AudioSource::Network)
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        tokio::time::timeout(self.request_timeout, self.backend.synthesize(text, &self.voice))
            .await
            .map_err(|_| Error::Network("synthesis request timed out".to_string()))?
    }

    fn start_playback(&self, text: &str, audio: &[u8], notify: bool) -> Result<()> {
        let duration = self.sink.play(audio).map_err(|e| {
            tracing::error!(error = %e, "failed to start playback");
            e
        })?;

        let generation = self.playback.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.playback.speaking.store(true, Ordering::Release);

        if notify {
            if let Some(observer) = &self.observer {
                observer.playback_started(text);
            }
        }

        // completion is time based: the sink reports the clip length up front
        let state = Arc::clone(&self.playback);
        let delay = duration.saturating_sub(FINISH_MARGIN);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if state.generation.load(Ordering::Acquire) == generation {
                state.speaking.store(false, Ordering::Release);
            }
        });

        Ok(())
    }
}
