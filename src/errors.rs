/*!
 * Error types for the subdub application.
 *
 * This module contains custom error types for the different layers of the
 * dubbing pipeline, using the thiserror crate for ergonomic error definitions.
 * Malformed subtitle input is never an error (the parser drops such blocks),
 * and cancellation is reported as an outcome rather than through these types.
 */

use thiserror::Error;

/// Errors that can occur when talking to a speech or text provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Credentials required by the provider were not configured
    #[error("Missing credentials for {provider}: {hint}")]
    MissingCredentials {
        /// Provider display name
        provider: String,
        /// What the user needs to configure
        hint: String,
    },

    /// Downloaded audio could not be played back
    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    /// The local synthesis engine failed
    #[error("Speech engine error: {0}")]
    EngineError(String),
}

/// Errors raised while acquiring or driving an audio capture session
#[derive(Error, Debug)]
pub enum CaptureError {
    /// No recorder is available on this system
    #[error("Audio capture is not supported: {0}")]
    Unsupported(String),

    /// The user or the system refused access to the audio source
    #[error("Permission to capture audio was denied: {0}")]
    PermissionDenied(String),

    /// The capture session was granted but carries no audio track
    #[error("No audio was shared with the recorder; make sure the audio source is selected")]
    NoAudioTrack,

    /// Recording finished without producing any audio data
    #[error("Nothing was recorded; make sure the audio source is selected")]
    NothingRecorded,

    /// The recorder process failed
    #[error("Recorder error: {0}")]
    Recorder(String),
}

/// Errors that abort a playback or capture session
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// A speech backend rejected an utterance
    #[error("{provider} failed on cue {cue_index}: {source}")]
    Backend {
        /// Display name of the backend that failed
        provider: String,
        /// Declared index of the cue being spoken (0 for ad-hoc text)
        cue_index: usize,
        /// Provider-specific diagnostic
        #[source]
        source: ProviderError,
    },

    /// The capture session could not be acquired or finished
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// A voice identifier could not be turned into a usable voice
    #[error("Voice error: {0}")]
    Voice(String),
}

/// Errors that can occur during subtitle translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A batch kept failing after every retry
    #[error("Failed to translate batch {batch} after {attempts} attempts")]
    RetriesExhausted {
        /// 1-based batch number
        batch: usize,
        /// Number of attempts made
        attempts: u32,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from a playback or capture session
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
