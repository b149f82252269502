/*!
 * Speech and text backends.
 *
 * - `local`: local synthesis engine driven through a command line program
 * - `google`: Google Cloud Text-to-Speech
 * - `fpt`: FPT.AI text-to-speech
 * - `microsoft`: Microsoft Azure Speech
 * - `gemini`: Gemini text service used for subtitle translation
 * - `mock`: in-memory backends for tests
 */

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::app_config::SpeechProviderConfig;
use crate::errors::ProviderError;
use crate::voices::{ProviderId, Voice};

pub mod fpt;
pub mod gemini;
pub mod google;
pub mod local;
pub mod microsoft;
pub mod mock;

/// Fastest rate the local engine is asked to speak at
pub const MAX_SPEECH_RATE: f32 = 10.0;

/// How a local utterance is rendered
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeakOptions {
    /// Speaking rate multiplier, 1.0 is normal
    pub rate: f32,
    /// Render without audible output
    pub muted: bool,
}

impl SpeakOptions {
    /// Normal rate, audible
    pub fn audible() -> Self {
        Self { rate: 1.0, muted: false }
    }

    /// Maximum rate, muted; used while a recorder captures the output
    pub fn fast_silent() -> Self {
        Self {
            rate: MAX_SPEECH_RATE,
            muted: true,
        }
    }
}

impl Default for SpeakOptions {
    fn default() -> Self {
        Self::audible()
    }
}

/// Encoded audio returned by a remote provider
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Encoded audio bytes
    pub data: Bytes,
    /// MIME type of `data`
    pub mime_type: String,
}

impl AudioClip {
    pub fn mp3(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            mime_type: "audio/mpeg".to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// File extension matching the MIME type
    pub fn extension(&self) -> &'static str {
        extension_for_mime(&self.mime_type)
    }
}

/// File extension for an audio MIME type, mp3 when unknown
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/ogg" => "ogg",
        "audio/webm" => "webm",
        _ => "mp3",
    }
}

/// A remote text-to-speech service.
///
/// Providers only synthesize; playing the returned clip is the job of an
/// [`crate::playback::audio::AudioOutput`].
#[async_trait]
pub trait SpeechProvider: Send + Sync + Debug {
    /// Which provider this is
    fn id(&self) -> ProviderId;

    /// Synthesize `text` with the provider-native voice name `voice`
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioClip, ProviderError>;
}

/// A local speech synthesis engine
#[async_trait]
pub trait SynthesisEngine: Send + Sync + Debug {
    /// Voices installed on this machine
    async fn voices(&self) -> Result<Vec<Voice>, ProviderError>;

    /// Speak one chunk of text and wait until it has been rendered.
    ///
    /// `voice` is an engine handle, `None` selects the engine default. The
    /// call returns `Ok(())` early when `cancel` fires.
    async fn speak(
        &self,
        text: &str,
        voice: Option<&str>,
        options: SpeakOptions,
        cancel: &CancellationToken,
    ) -> Result<(), ProviderError>;
}

/// Build the remote provider described by a configuration entry
pub fn build_speech_provider(config: &SpeechProviderConfig) -> anyhow::Result<Arc<dyn SpeechProvider>> {
    let provider: Arc<dyn SpeechProvider> = match config.provider_type.parse::<ProviderId>()? {
        ProviderId::Google => Arc::new(google::GoogleTts::from_config(config)),
        ProviderId::Fpt => Arc::new(fpt::FptTts::from_config(config)),
        ProviderId::Microsoft => Arc::new(microsoft::MicrosoftTts::from_config(config)),
    };
    Ok(provider)
}

/// Turn a non-success HTTP response into a provider error
pub(crate) async fn api_error(provider: &str, response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    log::error!("{} API error ({}): {}", provider, status, body);

    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .or_else(|| value.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or(body);

    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(format!("{}: {}", provider, message)),
        code => ProviderError::ApiError {
            status_code: code,
            message: format!("{}: {}", provider, message),
        },
    }
}

/// Map a transport failure to a provider error
pub(crate) fn request_error(provider: &str, error: reqwest::Error) -> ProviderError {
    if error.is_connect() || error.is_timeout() {
        ProviderError::ConnectionError(format!("Failed to reach {}: {}", provider, error))
    } else {
        ProviderError::RequestFailed(format!("Failed to send request to {}: {}", provider, error))
    }
}

/// HTTP client with the configured timeout
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs.max(1)))
        .build()
        .unwrap_or_default()
}
