/*!
 * Recording a scheduler run into a single audio artifact.
 *
 * The recording session is acquired before any speech is dispatched and is
 * released on every exit path, whether the run completed, was cancelled or
 * failed.
 */

use std::fmt::Debug;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::app_config::CaptureConfig;
use crate::errors::{CaptureError, PlaybackError};
use crate::playback::scheduler::{PlaybackMode, PlaybackScheduler, ProgressUpdate, SessionOutcome};
use crate::providers::{extension_for_mime, AudioClip};
use crate::subtitle_processor::Cue;
use crate::voices::SpeakerConfig;

/// Default time the recorder keeps running after the last utterance
pub const DEFAULT_CAPTURE_TAIL: Duration = Duration::from_millis(2000);

/// Grants access to an audio source
#[async_trait]
pub trait AudioRecorder: Send + Sync + Debug {
    /// Ask for a recording session on the configured source
    async fn acquire(&self) -> Result<Box<dyn RecordingSession>, CaptureError>;
}

/// An acquired audio source
#[async_trait]
pub trait RecordingSession: Send + Debug {
    /// Whether the source actually carries audio
    fn has_audio_track(&self) -> bool;

    /// Start recording
    async fn start(&mut self) -> Result<(), CaptureError>;

    /// Stop recording and hand back what was captured
    async fn stop(&mut self) -> Result<Bytes, CaptureError>;

    /// Give the source back; must be safe to call in any state and more than once
    async fn release(&mut self);
}

/// Result of a capture run that did not fail
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Recorded(AudioClip),
    Cancelled,
}

/// Wraps a capture-mode scheduler run in a recording session.
///
/// Clones share the cancellation token of the capture in progress, so a clone
/// can stop a run started from another.
#[derive(Debug, Clone)]
pub struct CaptureHarness {
    scheduler: Arc<PlaybackScheduler>,
    recorder: Arc<dyn AudioRecorder>,
    tail: Duration,
    mime_type: String,
    cancel: Arc<Mutex<CancellationToken>>,
}

impl CaptureHarness {
    pub fn new(scheduler: Arc<PlaybackScheduler>, recorder: Arc<dyn AudioRecorder>) -> Self {
        Self {
            scheduler,
            recorder,
            tail: DEFAULT_CAPTURE_TAIL,
            mime_type: "audio/webm".to_string(),
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    pub fn with_tail(mut self, tail: Duration) -> Self {
        self.tail = tail;
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn scheduler(&self) -> &Arc<PlaybackScheduler> {
        &self.scheduler
    }

    /// Cancel the capture in progress, at whatever stage it is
    pub fn cancel(&self) {
        self.cancel.lock().cancel();
        self.scheduler.cancel();
    }

    /// Record the narration of `cues`
    pub async fn record(
        &self,
        cues: &[Cue],
        speakers: &[SpeakerConfig],
        on_progress: impl FnMut(ProgressUpdate),
    ) -> Result<CaptureOutcome, PlaybackError> {
        let cancel = CancellationToken::new();
        *self.cancel.lock() = cancel.clone();

        let mut recording = tokio::select! {
            acquired = self.recorder.acquire() => acquired?,
            _ = cancel.cancelled() => {
                info!("Capture cancelled while acquiring the audio source");
                return Ok(CaptureOutcome::Cancelled);
            }
        };
        let result = self.record_with(recording.as_mut(), cues, speakers, &cancel, on_progress).await;
        recording.release().await;
        result
    }

    /// Record a single piece of text spoken with `voice_id`
    pub async fn record_text(
        &self,
        text: &str,
        voice_id: &str,
        on_progress: impl FnMut(ProgressUpdate),
    ) -> Result<CaptureOutcome, PlaybackError> {
        let cue = Cue::new(1, "00:00:00,000", "00:00:00,000", text);
        let speakers = [SpeakerConfig::new(1, "", voice_id)];
        self.record(std::slice::from_ref(&cue), &speakers, on_progress).await
    }

    async fn record_with(
        &self,
        recording: &mut dyn RecordingSession,
        cues: &[Cue],
        speakers: &[SpeakerConfig],
        cancel: &CancellationToken,
        on_progress: impl FnMut(ProgressUpdate),
    ) -> Result<CaptureOutcome, PlaybackError> {
        if cancel.is_cancelled() {
            return Ok(CaptureOutcome::Cancelled);
        }
        if !recording.has_audio_track() {
            return Err(CaptureError::NoAudioTrack.into());
        }

        recording.start().await?;
        info!("Recording started");

        let run = self
            .scheduler
            .run_linked(cues, speakers, PlaybackMode::Capture, cancel, on_progress)
            .await;
        match run {
            Ok(SessionOutcome::Completed { .. }) => {
                let tail_elapsed = tokio::select! {
                    _ = tokio::time::sleep(self.tail) => true,
                    _ = cancel.cancelled() => false,
                };
                if !tail_elapsed {
                    info!("Capture cancelled during the recording tail");
                    if let Err(e) = recording.stop().await {
                        debug!("Recorder stop after cancellation failed: {}", e);
                    }
                    return Ok(CaptureOutcome::Cancelled);
                }
                let data = recording.stop().await?;
                if data.is_empty() {
                    return Err(CaptureError::NothingRecorded.into());
                }
                info!("Recorded {} bytes", data.len());
                Ok(CaptureOutcome::Recorded(AudioClip {
                    data,
                    mime_type: self.mime_type.clone(),
                }))
            }
            Ok(SessionOutcome::Cancelled { .. }) => {
                if let Err(e) = recording.stop().await {
                    debug!("Recorder stop after cancellation failed: {}", e);
                }
                Ok(CaptureOutcome::Cancelled)
            }
            Err(e) => {
                if let Err(stop_error) = recording.stop().await {
                    debug!("Recorder stop after failure failed: {}", stop_error);
                }
                Err(e)
            }
        }
    }
}

/// Records with an ffmpeg-compatible program.
///
/// `input_args` select the source, for example `-f pulse -i default`.
#[derive(Debug, Clone)]
pub struct CommandRecorder {
    program: String,
    input_args: Vec<String>,
    extension: String,
}

impl CommandRecorder {
    pub fn new(program: impl Into<String>, input_args: Vec<String>, extension: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            input_args,
            extension: extension.into(),
        }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(
            &config.program,
            config.input_args.clone(),
            extension_for_mime(&config.mime_type),
        )
    }
}

#[async_trait]
impl AudioRecorder for CommandRecorder {
    async fn acquire(&self) -> Result<Box<dyn RecordingSession>, CaptureError> {
        // A short probe run tells us whether the source opens and carries audio
        let probe = Command::new(&self.program)
            .arg("-hide_banner")
            .args(&self.input_args)
            .args(["-t", "0.1", "-f", "null", "-"])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::select! {
            result = probe => result.map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => CaptureError::Unsupported(format!("{} is not installed", self.program)),
                std::io::ErrorKind::PermissionDenied => CaptureError::PermissionDenied(e.to_string()),
                _ => CaptureError::Recorder(format!("Failed to run {}: {}", self.program, e)),
            })?,
            _ = tokio::time::sleep(Duration::from_secs(10)) => {
                return Err(CaptureError::Recorder(format!("{} probe timed out after 10 seconds", self.program)));
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            if stderr.contains("Permission denied") || stderr.contains("Operation not permitted") {
                return Err(CaptureError::PermissionDenied(stderr.trim().to_string()));
            }
            error!("Audio source probe failed: {}", stderr.trim());
            return Err(CaptureError::Recorder(format!("Could not open the audio source: {}", stderr.trim())));
        }

        let output_file = tempfile::Builder::new()
            .prefix("subdub-capture-")
            .suffix(&format!(".{}", self.extension))
            .tempfile()
            .map_err(|e| CaptureError::Recorder(format!("Failed to create output file: {}", e)))?;

        Ok(Box::new(CommandRecording {
            program: self.program.clone(),
            input_args: self.input_args.clone(),
            has_audio: stderr.contains("Audio:"),
            output: Some(output_file),
            child: None,
        }))
    }
}

#[derive(Debug)]
struct CommandRecording {
    program: String,
    input_args: Vec<String>,
    has_audio: bool,
    output: Option<NamedTempFile>,
    child: Option<Child>,
}

#[async_trait]
impl RecordingSession for CommandRecording {
    fn has_audio_track(&self) -> bool {
        self.has_audio
    }

    async fn start(&mut self) -> Result<(), CaptureError> {
        let output = self
            .output
            .as_ref()
            .ok_or_else(|| CaptureError::Recorder("recording session was already released".to_string()))?;

        let child = Command::new(&self.program)
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(&self.input_args)
            .arg(output.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CaptureError::Recorder(format!("Failed to start {}: {}", self.program, e)))?;

        self.child = Some(child);
        Ok(())
    }

    async fn stop(&mut self) -> Result<Bytes, CaptureError> {
        let mut child = self
            .child
            .take()
            .ok_or_else(|| CaptureError::Recorder("recording was not started".to_string()))?;

        // ffmpeg finalizes the container when it reads 'q'
        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(b"q").await;
        }

        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|e| CaptureError::Recorder(e.to_string()))?;
                if !status.success() {
                    warn!("{} exited with {}", self.program, status);
                }
            },
            _ = tokio::time::sleep(Duration::from_secs(5)) => {
                warn!("{} did not stop in time, killing it", self.program);
                let _ = child.kill().await;
            }
        }

        let output = self
            .output
            .as_ref()
            .ok_or_else(|| CaptureError::Recorder("recording session was already released".to_string()))?;
        let data = tokio::fs::read(output.path())
            .await
            .map_err(|e| CaptureError::Recorder(format!("Failed to read recording: {}", e)))?;

        Ok(Bytes::from(data))
    }

    async fn release(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill().await;
        }
        self.output.take();
    }
}
