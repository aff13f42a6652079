//! Audio output for synthesized speech

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use super::SYNTHESIS_SAMPLE_RATE;
use crate::{Error, Result};

/// Starts playback of encoded audio
///
/// `play` returns as soon as playback has begun, with the clip's duration.
pub trait AudioSink: Send + Sync {
    /// Begin playing MP3 bytes and return how long the clip lasts
    ///
    /// # Errors
    ///
    /// Returns error if the audio cannot be decoded or the device fails
    fn play(&self, mp3: &[u8]) -> Result<Duration>;
}

/// Plays audio on the default output device
pub struct SpeakerSink {
    config: StreamConfig,
}

impl SpeakerSink {
    /// Open the default output device
    ///
    /// # Errors
    ///
    /// Returns error if no suitable output device is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supports_rate = |c: &cpal::SupportedStreamConfigRange| {
            c.min_sample_rate() <= SampleRate(SYNTHESIS_SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(SYNTHESIS_SAMPLE_RATE)
        };

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| c.channels() == 1 && supports_rate(c))
            .or_else(|| {
                // Fallback: try stereo
                device
                    .supported_output_configs()
                    .ok()?
                    .find(|c| c.channels() == 2 && supports_rate(c))
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(SYNTHESIS_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SYNTHESIS_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self { config })
    }
}

impl AudioSink for SpeakerSink {
    fn play(&self, mp3: &[u8]) -> Result<Duration> {
        let (samples, sample_rate) = decode_mp3(mp3)?;
        let duration = clip_duration(samples.len(), sample_rate);
        let config = self.config.clone();

        std::thread::Builder::new()
            .name("tutor-playback".to_string())
            .spawn(move || {
                if let Err(e) = play_samples_blocking(&config, samples, duration) {
                    tracing::error!(error = %e, "audio playback failed");
                }
            })?;

        Ok(duration)
    }
}

/// Decodes audio for its duration but plays nothing (headless mode)
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSink;

impl AudioSink for SilentSink {
    fn play(&self, mp3: &[u8]) -> Result<Duration> {
        let (samples, sample_rate) = decode_mp3(mp3)?;
        Ok(clip_duration(samples.len(), sample_rate))
    }
}

fn clip_duration(samples: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(samples as u64 * 1000 / u64::from(sample_rate))
}

fn play_samples_blocking(
    config: &StreamConfig,
    samples: Vec<f32>,
    duration: Duration,
) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }

    let device = cpal::default_host()
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device".to_string()))?;

    let channels = usize::from(config.channels);
    let finished = Arc::new(AtomicBool::new(false));
    let finished_flag = Arc::clone(&finished);
    let mut position = 0usize;

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let sample = samples.get(position).copied().unwrap_or_else(|| {
                        finished_flag.store(true, Ordering::Release);
                        0.0
                    });
                    frame.fill(sample);
                    position = position.saturating_add(1);
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    let start = Instant::now();
    let timeout = duration + Duration::from_millis(500);
    while !finished.load(Ordering::Acquire) && start.elapsed() < timeout {
        std::thread::sleep(Duration::from_millis(50));
    }

    // let the device drain its buffer
    std::thread::sleep(Duration::from_millis(100));
    drop(stream);
    tracing::debug!(duration_ms = duration.as_millis(), "playback complete");

    Ok(())
}

/// Decode MP3 bytes to mono f32 samples and their sample rate
fn decode_mp3(mp3: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3));
    let mut samples = Vec::new();
    let mut sample_rate = 0u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                sample_rate = u32::try_from(frame.sample_rate).unwrap_or(SYNTHESIS_SAMPLE_RATE);
                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            // ID3 tags and padding before the first frame
            Err(minimp3::Error::SkippedData) => {}
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    if samples.is_empty() {
        return Err(Error::Audio("MP3 contained no audio frames".to_string()));
    }

    Ok((samples, sample_rate))
}
