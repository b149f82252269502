use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app_config::SpeechProviderConfig;
use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::{api_error, http_client, request_error, AudioClip, SpeechProvider};
use crate::voices::ProviderId;

const DEFAULT_ENDPOINT: &str = "https://texttospeech.googleapis.com";
const PROVIDER_NAME: &str = "Google Cloud TTS";

/// Google Cloud Text-to-Speech client
#[derive(Debug, Clone)]
pub struct GoogleTts {
    client: Client,
    api_key: String,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    #[serde(rename = "audioConfig")]
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct VoiceSelection<'a> {
    #[serde(rename = "languageCode")]
    language_code: String,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct AudioConfig {
    #[serde(rename = "audioEncoding")]
    audio_encoding: &'static str,
}

#[derive(Debug, Deserialize)]
struct SynthesizeResponse {
    #[serde(rename = "audioContent")]
    audio_content: Option<String>,
}

impl GoogleTts {
    /// Create a client for the public endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(api_key, DEFAULT_ENDPOINT, 30)
    }

    /// Create a client for a specific endpoint
    pub fn with_endpoint(api_key: impl Into<String>, endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: http_client(timeout_secs),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &SpeechProviderConfig) -> Self {
        let endpoint = if config.endpoint.is_empty() { DEFAULT_ENDPOINT } else { &config.endpoint };
        Self::with_endpoint(&config.api_key, endpoint, config.timeout_secs)
    }

    fn synthesize_url(&self) -> Result<Url, ProviderError> {
        let base = Url::parse(self.endpoint.trim_end_matches('/'))
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid Google endpoint {}: {}", self.endpoint, e)))?;
        let mut url = base
            .join("/v1/text:synthesize")
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid Google endpoint {}: {}", self.endpoint, e)))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

#[async_trait]
impl SpeechProvider for GoogleTts {
    fn id(&self) -> ProviderId {
        ProviderId::Google
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioClip, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::MissingCredentials {
                provider: PROVIDER_NAME.to_string(),
                hint: "set an api_key for the google speech provider".to_string(),
            });
        }

        let request = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: language_utils::locale_of_voice_name(voice).unwrap_or_else(|| "vi-VN".to_string()),
                name: voice,
            },
            audio_config: AudioConfig { audio_encoding: "MP3" },
        };

        debug!("Requesting Google synthesis with voice {}", voice);
        let response = self
            .client
            .post(self.synthesize_url()?)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error(PROVIDER_NAME, e))?;

        if !response.status().is_success() {
            return Err(api_error(PROVIDER_NAME, response).await);
        }

        let body = response
            .json::<SynthesizeResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Google response: {}", e)))?;

        let content = body
            .audio_content
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ProviderError::ParseError("Google returned no audio content".to_string()))?;

        let audio = STANDARD
            .decode(content.as_bytes())
            .map_err(|e| ProviderError::ParseError(format!("Invalid base64 audio from Google: {}", e)))?;

        Ok(AudioClip::mp3(audio))
    }
}
