/*!
 * Playback and capture of cue tracks.
 *
 * - `session`: cancellation token and the single active utterance slot
 * - `audio`: output device for remote provider audio
 * - `dispatcher`: routes an utterance to the backend owning its voice
 * - `scheduler`: sequential preview/capture walk over cues
 * - `capture`: recording session around a capture run
 */

pub use self::capture::{AudioRecorder, CaptureHarness, CaptureOutcome, CommandRecorder, RecordingSession};
pub use self::dispatcher::BackendDispatcher;
pub use self::scheduler::{PlaybackMode, PlaybackScheduler, ProgressUpdate, SessionOutcome, SessionState};
pub use self::session::SpeechSession;

pub mod audio;
pub mod capture;
pub mod dispatcher;
pub mod scheduler;
pub mod session;
