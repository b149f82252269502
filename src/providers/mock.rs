/*!
 * Mock backends for testing.
 *
 * Every mock records what it was asked to do so tests can assert on the
 * order, voice, options and (virtual) time of each call:
 * - `MockEngine` - local synthesis engine
 * - `MockProvider` - remote speech provider
 * - `MockOutput` - audio output for remote clips
 * - `MockRecorder` - capture source
 * - `MockTextService` - batch translation service
 */

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::{CaptureError, ProviderError};
use crate::playback::audio::AudioOutput;
use crate::playback::capture::{AudioRecorder, RecordingSession};
use crate::providers::{AudioClip, SpeakOptions, SpeechProvider, SynthesisEngine};
use crate::translation::TextService;
use crate::voices::{Gender, ProviderId, Voice, VoiceBackend};

/// Behavior mode shared by the speech mocks
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds immediately
    Working,
    /// Always fails with an error
    Failing,
    /// Fails on the Nth call (1-based), succeeds otherwise
    FailOnCall { call: usize },
    /// Takes `delay_ms` per call unless cancelled
    Slow { delay_ms: u64 },
}

impl MockBehavior {
    fn should_fail(&self, call: usize) -> bool {
        match self {
            Self::Failing => true,
            Self::FailOnCall { call: failing } => *failing == call,
            _ => false,
        }
    }

    async fn wait(&self, cancel: &CancellationToken) {
        if let Self::Slow { delay_ms } = self {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(*delay_ms)) => {},
                _ = cancel.cancelled() => {},
            }
        }
    }
}

/// One chunk handed to the mock engine
#[derive(Debug, Clone, PartialEq)]
pub struct SpokenChunk {
    pub text: String,
    pub voice: Option<String>,
    pub options: SpeakOptions,
    /// Virtual time at which the chunk started
    pub at: Instant,
}

/// Mock local synthesis engine
#[derive(Debug, Clone)]
pub struct MockEngine {
    behavior: MockBehavior,
    voices: Vec<Voice>,
    spoken: Arc<Mutex<Vec<SpokenChunk>>>,
    request_count: Arc<AtomicUsize>,
}

impl MockEngine {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            voices: vec![
                Self::voice("en-us", "English (America)", "en-US"),
                Self::voice("vi", "Vietnamese", "vi-VN"),
            ],
            spoken: Arc::new(Mutex::new(Vec::new())),
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Replace the advertised voice list
    pub fn with_voices(mut self, voices: Vec<Voice>) -> Self {
        self.voices = voices;
        self
    }

    fn voice(id: &str, name: &str, language: &str) -> Voice {
        Voice {
            id: id.to_string(),
            name: name.to_string(),
            gender: Gender::Neutral,
            language: language.to_string(),
            backend: VoiceBackend::Local,
        }
    }

    /// Chunks spoken so far, in order
    pub fn spoken(&self) -> Vec<SpokenChunk> {
        self.spoken.lock().clone()
    }

    /// Texts spoken so far, in order
    pub fn spoken_texts(&self) -> Vec<String> {
        self.spoken.lock().iter().map(|chunk| chunk.text.clone()).collect()
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SynthesisEngine for MockEngine {
    async fn voices(&self) -> Result<Vec<Voice>, ProviderError> {
        Ok(self.voices.clone())
    }

    async fn speak(
        &self,
        text: &str,
        voice: Option<&str>,
        options: SpeakOptions,
        cancel: &CancellationToken,
    ) -> Result<(), ProviderError> {
        let call = self.request_count.fetch_add(1, Ordering::SeqCst) + 1;
        if self.behavior.should_fail(call) {
            return Err(ProviderError::EngineError(format!("Simulated engine failure (call #{})", call)));
        }

        self.spoken.lock().push(SpokenChunk {
            text: text.to_string(),
            voice: voice.map(str::to_string),
            options,
            at: Instant::now(),
        });
        self.behavior.wait(cancel).await;
        Ok(())
    }
}

/// Mock remote speech provider
#[derive(Debug, Clone)]
pub struct MockProvider {
    id: ProviderId,
    behavior: MockBehavior,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockProvider {
    pub fn new(id: ProviderId, behavior: MockBehavior) -> Self {
        Self {
            id,
            behavior,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn working(id: ProviderId) -> Self {
        Self::new(id, MockBehavior::Working)
    }

    pub fn failing(id: ProviderId) -> Self {
        Self::new(id, MockBehavior::Failing)
    }

    /// `(text, voice)` pairs received so far
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl SpeechProvider for MockProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioClip, ProviderError> {
        let call = {
            let mut requests = self.requests.lock();
            requests.push((text.to_string(), voice.to_string()));
            requests.len()
        };
        if self.behavior.should_fail(call) {
            return Err(ProviderError::ApiError {
                status_code: 500,
                message: format!("{}: simulated provider failure", self.id.display_name()),
            });
        }
        self.behavior.wait(&CancellationToken::new()).await;
        Ok(AudioClip::mp3(Bytes::from_static(b"mock-audio")))
    }
}

/// Mock audio output
#[derive(Debug, Clone)]
pub struct MockOutput {
    behavior: MockBehavior,
    played: Arc<AtomicUsize>,
}

impl MockOutput {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            played: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Number of clips played
    pub fn played(&self) -> usize {
        self.played.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioOutput for MockOutput {
    async fn play(&self, clip: &AudioClip, cancel: &CancellationToken) -> Result<(), ProviderError> {
        if clip.is_empty() {
            return Err(ProviderError::PlaybackFailed("received an empty audio clip".to_string()));
        }
        let call = self.played.fetch_add(1, Ordering::SeqCst) + 1;
        if self.behavior.should_fail(call) {
            return Err(ProviderError::PlaybackFailed("simulated playback failure".to_string()));
        }
        self.behavior.wait(cancel).await;
        Ok(())
    }
}

/// What the mock capture source does when acquired
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderBehavior {
    /// Records the given bytes
    Records(Bytes),
    /// Refuses access
    Denied,
    /// Grants access without an audio track
    NoAudioTrack,
    /// Records nothing
    Silent,
}

/// Mock capture source
#[derive(Debug, Clone)]
pub struct MockRecorder {
    behavior: RecorderBehavior,
    acquire_delay: Duration,
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
    started: Arc<AtomicBool>,
}

impl MockRecorder {
    pub fn new(behavior: RecorderBehavior) -> Self {
        Self {
            behavior,
            acquire_delay: Duration::ZERO,
            acquired: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
            started: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn recording(data: &'static [u8]) -> Self {
        Self::new(RecorderBehavior::Records(Bytes::from_static(data)))
    }

    /// Make `acquire` take `delay` before answering
    pub fn with_acquire_delay(mut self, delay: Duration) -> Self {
        self.acquire_delay = delay;
        self
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn was_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioRecorder for MockRecorder {
    async fn acquire(&self) -> Result<Box<dyn RecordingSession>, CaptureError> {
        if !self.acquire_delay.is_zero() {
            tokio::time::sleep(self.acquire_delay).await;
        }
        if self.behavior == RecorderBehavior::Denied {
            return Err(CaptureError::PermissionDenied("simulated denial".to_string()));
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);

        let data = match &self.behavior {
            RecorderBehavior::Records(data) => data.clone(),
            _ => Bytes::new(),
        };
        Ok(Box::new(MockRecording {
            has_audio: self.behavior != RecorderBehavior::NoAudioTrack,
            data,
            started: Arc::clone(&self.started),
            released: Arc::clone(&self.released),
        }))
    }
}

#[derive(Debug)]
struct MockRecording {
    has_audio: bool,
    data: Bytes,
    started: Arc<AtomicBool>,
    released: Arc<AtomicUsize>,
}

#[async_trait]
impl RecordingSession for MockRecording {
    fn has_audio_track(&self) -> bool {
        self.has_audio
    }

    async fn start(&mut self) -> Result<(), CaptureError> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> Result<Bytes, CaptureError> {
        Ok(self.data.clone())
    }

    async fn release(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Behavior mode for the mock text service
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextBehavior {
    /// Prefixes every text with the target language
    Working,
    /// Always fails with an error
    Failing,
    /// Returns one text fewer than requested
    MismatchedCount,
    /// Fails on every Nth request
    Intermittent { fail_every: usize },
    /// Returns empty strings
    Empty,
}

/// Mock batch translation service
#[derive(Debug, Clone)]
pub struct MockTextService {
    behavior: TextBehavior,
    request_count: Arc<AtomicUsize>,
}

impl MockTextService {
    pub fn new(behavior: TextBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn working() -> Self {
        Self::new(TextBehavior::Working)
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextService for MockTextService {
    async fn translate_batch(
        &self,
        texts: &[String],
        _source_language: &str,
        target_language: &str,
    ) -> Result<Vec<String>, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        let translate = || texts.iter().map(|t| format!("[{}] {}", target_language, t)).collect::<Vec<_>>();

        match self.behavior {
            TextBehavior::Working => Ok(translate()),
            TextBehavior::Failing => Err(ProviderError::ApiError {
                status_code: 500,
                message: "Simulated text service failure".to_string(),
            }),
            TextBehavior::MismatchedCount => {
                let mut out = translate();
                out.pop();
                Ok(out)
            }
            TextBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        status_code: 503,
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                    })
                } else {
                    Ok(translate())
                }
            }
            TextBehavior::Empty => Ok(vec![String::new(); texts.len()]),
        }
    }
}
