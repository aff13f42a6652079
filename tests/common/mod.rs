//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use voice_tutor::display::{ChatDisplay, StyleHint};
use voice_tutor::speech::{
    AudioCache, AudioSink, PlaybackObserver, SpeechSynthesizer, SynthesisBackend, VoiceParams,
};
use voice_tutor::{CompletionClient, Error, Message, Result, Transcriber};

/// Scripted completion response
pub enum Scripted {
    Reply(&'static str),
    Fail(Error),
}

/// Completion client that replays scripted responses and records requests
#[derive(Default)]
pub struct MockCompletion {
    script: Mutex<VecDeque<Scripted>>,
    pub calls: Arc<Mutex<Vec<Vec<Message>>>>,
    delay: Option<Duration>,
}

impl MockCompletion {
    pub fn replying(replies: &[&'static str]) -> Self {
        Self {
            script: Mutex::new(replies.iter().copied().map(Scripted::Reply).collect()),
            ..Self::default()
        }
    }

    pub fn failing(error: Error) -> Self {
        Self {
            script: Mutex::new(VecDeque::from([Scripted::Fail(error)])),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn recorded(&self) -> Vec<Vec<Message>> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl CompletionClient for MockCompletion {
    async fn complete(&self, _model: &str, messages: &[Message]) -> Result<String> {
        self.calls.lock().await.push(messages.to_vec());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.script.lock().await.pop_front() {
            Some(Scripted::Reply(text)) => Ok(text.to_string()),
            Some(Scripted::Fail(e)) => Err(e),
            None => Err(Error::Network("no scripted reply left".to_string())),
        }
    }
}

/// Synthesis backend that returns fixed bytes and counts calls
#[derive(Default)]
pub struct MockBackend {
    pub calls: AtomicUsize,
    pub texts: std::sync::Mutex<Vec<String>>,
    fail: bool,
}

impl MockBackend {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SynthesisBackend for MockBackend {
    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut texts) = self.texts.lock() {
            texts.push(text.to_string());
        }

        if self.fail {
            return Err(Error::Config("speech API key missing".to_string()));
        }
        Ok(format!("audio:{}:{text}", voice.identifier()).into_bytes())
    }
}

/// Sink that accepts any bytes and reports a fixed clip length
#[derive(Default)]
pub struct MockSink {
    pub played: std::sync::Mutex<Vec<Vec<u8>>>,
}

impl MockSink {
    pub fn play_count(&self) -> usize {
        self.played.lock().map(|p| p.len()).unwrap_or_default()
    }
}

impl AudioSink for MockSink {
    fn play(&self, mp3: &[u8]) -> Result<Duration> {
        if let Ok(mut played) = self.played.lock() {
            played.push(mp3.to_vec());
        }
        Ok(Duration::from_millis(300))
    }
}

/// Records playback-started notifications
#[derive(Default)]
pub struct RecordingObserver {
    pub started: std::sync::Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn started(&self) -> Vec<String> {
        self.started.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl PlaybackObserver for RecordingObserver {
    fn playback_started(&self, text: &str) {
        if let Ok(mut started) = self.started.lock() {
            started.push(text.to_string());
        }
    }
}

/// Records everything pushed to the display
#[derive(Default)]
pub struct RecordingDisplay {
    pub lines: std::sync::Mutex<Vec<(String, StyleHint)>>,
}

impl RecordingDisplay {
    pub fn lines(&self) -> Vec<(String, StyleHint)> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl ChatDisplay for RecordingDisplay {
    fn append_message(&self, text: &str, style: StyleHint) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((text.to_string(), style));
        }
    }
}

/// Transcriber returning a fixed result
pub struct MockTranscriber(pub Option<&'static str>);

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, _wav: &[u8]) -> Result<Option<String>> {
        Ok(self.0.map(ToString::to_string))
    }
}

/// Voice parameters used across tests
pub fn test_voice(name: &str) -> VoiceParams {
    VoiceParams {
        name: name.to_string(),
        language_code: "pt-BR".to_string(),
        pitch: 0.0,
        speaking_rate: 1.0,
    }
}

/// Synthesizer over a fresh cache directory, with its collaborators
pub struct SpeechRig {
    pub speech: Arc<SpeechSynthesizer>,
    pub backend: Arc<MockBackend>,
    pub sink: Arc<MockSink>,
    pub observer: Arc<RecordingObserver>,
    pub dir: tempfile::TempDir,
}

pub fn speech_rig(backend: MockBackend) -> SpeechRig {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let cache = AudioCache::open(dir.path(), 1024 * 1024).expect("failed to open cache");
    let backend = Arc::new(backend);
    let sink = Arc::new(MockSink::default());
    let observer = Arc::new(RecordingObserver::default());

    let speech = SpeechSynthesizer::new(
        Arc::clone(&backend) as Arc<dyn SynthesisBackend>,
        Arc::clone(&sink) as Arc<dyn AudioSink>,
        cache,
        test_voice("pt-BR-Standard-B"),
    )
    .with_observer(Arc::clone(&observer) as Arc<dyn PlaybackObserver>);

    SpeechRig {
        speech: Arc::new(speech),
        backend,
        sink,
        observer,
        dir,
    }
}
