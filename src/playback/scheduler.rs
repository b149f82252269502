/*!
 * Sequential multi-speaker playback of a cue track.
 *
 * Preview mode reproduces the gaps between cues in wall-clock time. Capture
 * mode speaks every cue back to back, muted and at maximum rate, so a
 * recorder can grab the output without waiting on subtitle timing.
 */

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::errors::PlaybackError;
use crate::playback::dispatcher::BackendDispatcher;
use crate::playback::session::SpeechSession;
use crate::providers::SpeakOptions;
use crate::subtitle_processor::Cue;
use crate::voices::{SpeakerConfig, VoiceRef, VoiceRegistry};

/// How a session is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Audible, paced by the subtitle timing
    Preview,
    /// Back to back for a recorder
    Capture,
}

impl PlaybackMode {
    pub fn speak_options(&self) -> SpeakOptions {
        match self {
            Self::Preview => SpeakOptions::audible(),
            Self::Capture => SpeakOptions::fast_silent(),
        }
    }
}

/// Lifecycle of the most recent session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// How a session ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Every cue was spoken or skipped
    Completed { spoken: usize, skipped: usize },
    /// The session was cancelled after `spoken` cues
    Cancelled { spoken: usize },
}

impl SessionOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Progress notification sent before each cue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// 1-based position of the cue
    pub current: usize,
    pub total: usize,
    pub mode: PlaybackMode,
}

impl fmt::Display for ProgressUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.mode {
            PlaybackMode::Preview => "Playing",
            PlaybackMode::Capture => "Rendering",
        };
        write!(f, "{} line {}/{}...", verb, self.current, self.total)
    }
}

/// Roster entry with its voice resolved up front
#[derive(Debug, Clone)]
struct ResolvedSpeaker {
    config: SpeakerConfig,
    voice: Option<VoiceRef>,
}

/// Walks cues in order and dispatches each to its speaker's voice.
///
/// Only one session runs at a time: starting a run cancels the previous one.
#[derive(Debug)]
pub struct PlaybackScheduler {
    dispatcher: Arc<BackendDispatcher>,
    registry: Arc<VoiceRegistry>,
    current: Mutex<Option<Arc<SpeechSession>>>,
    state: Mutex<SessionState>,
}

impl PlaybackScheduler {
    pub fn new(dispatcher: Arc<BackendDispatcher>, registry: Arc<VoiceRegistry>) -> Self {
        Self {
            dispatcher,
            registry,
            current: Mutex::new(None),
            state: Mutex::new(SessionState::Idle),
        }
    }

    pub fn dispatcher(&self) -> &Arc<BackendDispatcher> {
        &self.dispatcher
    }

    pub fn registry(&self) -> &Arc<VoiceRegistry> {
        &self.registry
    }

    /// State of the most recent session
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Cancel the running session, if any
    pub fn cancel(&self) {
        if let Some(session) = self.current.lock().as_ref() {
            debug!("Cancelling session {}", session.id());
            session.cancel();
        }
    }

    /// Start a new session, cancelling the one in progress
    pub fn begin_session(&self) -> Arc<SpeechSession> {
        self.install_session(SpeechSession::new())
    }

    fn install_session(&self, session: SpeechSession) -> Arc<SpeechSession> {
        let session = Arc::new(session);
        if let Some(previous) = self.current.lock().replace(Arc::clone(&session)) {
            previous.cancel();
        }
        *self.state.lock() = SessionState::Running;
        session
    }

    fn finish(&self, session: &SpeechSession, result: &Result<SessionOutcome, PlaybackError>) {
        let is_current = self
            .current
            .lock()
            .as_ref()
            .is_some_and(|current| current.id() == session.id());
        if !is_current {
            return;
        }
        *self.state.lock() = match result {
            Ok(SessionOutcome::Completed { .. }) => SessionState::Completed,
            Ok(SessionOutcome::Cancelled { .. }) => SessionState::Cancelled,
            Err(_) => SessionState::Failed,
        };
    }

    /// Speak `cues` with the voices of `speakers`.
    ///
    /// Cancellation is reported as [`SessionOutcome::Cancelled`]; a backend
    /// failure on any cue fails the whole session.
    pub async fn run(
        &self,
        cues: &[Cue],
        speakers: &[SpeakerConfig],
        mode: PlaybackMode,
        on_progress: impl FnMut(ProgressUpdate),
    ) -> Result<SessionOutcome, PlaybackError> {
        let session = self.begin_session();
        let result = self.run_session(&session, cues, speakers, mode, on_progress).await;
        self.finish(&session, &result);
        result
    }

    /// Like [`run`](Self::run), but the session is also cancelled by `parent`,
    /// including when `parent` was cancelled before the run started.
    pub async fn run_linked(
        &self,
        cues: &[Cue],
        speakers: &[SpeakerConfig],
        mode: PlaybackMode,
        parent: &CancellationToken,
        on_progress: impl FnMut(ProgressUpdate),
    ) -> Result<SessionOutcome, PlaybackError> {
        let session = self.install_session(SpeechSession::child_of(parent));
        let result = self.run_session(&session, cues, speakers, mode, on_progress).await;
        self.finish(&session, &result);
        result
    }

    async fn run_session(
        &self,
        session: &SpeechSession,
        cues: &[Cue],
        speakers: &[SpeakerConfig],
        mode: PlaybackMode,
        mut on_progress: impl FnMut(ProgressUpdate),
    ) -> Result<SessionOutcome, PlaybackError> {
        let roster: Vec<ResolvedSpeaker> = speakers
            .iter()
            .map(|config| ResolvedSpeaker {
                config: config.clone(),
                voice: self.registry.resolve(&config.voice_id),
            })
            .collect();

        let options = mode.speak_options();
        let total = cues.len();
        let mut spoken = 0;
        let mut skipped = 0;
        let mut last_cue_end = 0.0_f64;

        info!("Starting {:?} session {} with {} cue(s)", mode, session.id(), total);

        for (position, cue) in cues.iter().enumerate() {
            if session.is_cancelled() {
                return Ok(SessionOutcome::Cancelled { spoken });
            }

            on_progress(ProgressUpdate {
                current: position + 1,
                total,
                mode,
            });

            let start = cue.start_seconds();
            let end = cue.end_seconds();
            let delay = (start - last_cue_end).max(0.0);

            if mode == PlaybackMode::Preview && delay > 0.0 {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs_f64(delay)) => {},
                    _ = session.cancelled() => return Ok(SessionOutcome::Cancelled { spoken }),
                }
            }

            let speaker = cue
                .speaker
                .as_deref()
                .and_then(|name| roster.iter().find(|s| s.config.speaker_name == name))
                .or_else(|| roster.first());

            let voice = match speaker {
                None => {
                    warn!("No speaker configured, skipping cue {}", cue.index);
                    skipped += 1;
                    last_cue_end = end;
                    continue;
                }
                Some(ResolvedSpeaker { voice: None, config }) => {
                    warn!("No voice set for speaker '{}', skipping cue {}", config.speaker_name, cue.index);
                    skipped += 1;
                    last_cue_end = end;
                    continue;
                }
                Some(ResolvedSpeaker { voice: Some(voice), .. }) => voice,
            };

            if let Err(source) = self.dispatcher.speak(session, &cue.text, voice, options).await {
                if session.is_cancelled() {
                    return Ok(SessionOutcome::Cancelled { spoken });
                }
                return Err(PlaybackError::Backend {
                    provider: voice.backend_name().to_string(),
                    cue_index: cue.index,
                    source,
                });
            }

            if session.is_cancelled() {
                return Ok(SessionOutcome::Cancelled { spoken });
            }

            spoken += 1;
            last_cue_end = end;
        }

        info!("Session {} finished: {} spoken, {} skipped", session.id(), spoken, skipped);
        Ok(SessionOutcome::Completed { spoken, skipped })
    }

    /// Speak a single piece of text outside any cue track
    pub async fn speak_text(
        &self,
        text: &str,
        voice_id: &str,
        mode: PlaybackMode,
    ) -> Result<SessionOutcome, PlaybackError> {
        let voice = self
            .registry
            .resolve(voice_id)
            .ok_or_else(|| PlaybackError::Voice("no voice selected".to_string()))?;

        let session = self.begin_session();
        let result = match self.dispatcher.speak(&session, text, &voice, mode.speak_options()).await {
            Ok(()) if session.is_cancelled() => Ok(SessionOutcome::Cancelled { spoken: 0 }),
            Ok(()) => Ok(SessionOutcome::Completed { spoken: 1, skipped: 0 }),
            Err(_) if session.is_cancelled() => Ok(SessionOutcome::Cancelled { spoken: 0 }),
            Err(source) => Err(PlaybackError::Backend {
                provider: voice.backend_name().to_string(),
                cue_index: 0,
                source,
            }),
        };
        self.finish(&session, &result);
        result
    }
}
