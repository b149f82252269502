use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;

use crate::app_config::SpeechProviderConfig;
use crate::errors::ProviderError;
use crate::providers::{api_error, http_client, request_error, AudioClip, SpeechProvider};
use crate::voices::ProviderId;

const DEFAULT_ENDPOINT: &str = "https://api.fpt.ai";
const PROVIDER_NAME: &str = "FPT.AI";

/// FPT.AI text-to-speech client.
///
/// Synthesis is two requests: the API answers with a link to the rendered
/// file, which is then downloaded.
#[derive(Debug, Clone)]
pub struct FptTts {
    client: Client,
    api_key: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct FptResponse {
    #[serde(default)]
    error: i64,
    #[serde(rename = "async", default)]
    audio_url: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl FptTts {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(api_key, DEFAULT_ENDPOINT, 30)
    }

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
}

#[async_trait]
impl SpeechProvider for FptTts {
    fn id(&self) -> ProviderId {
        ProviderId::Fpt
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioClip, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::MissingCredentials {
                provider: PROVIDER_NAME.to_string(),
                hint: "set an api_key for the fpt speech provider".to_string(),
            });
        }

        let url = format!("{}/hmi/tts/v5", self.endpoint.trim_end_matches('/'));
        debug!("Requesting FPT.AI synthesis with voice {}", voice);

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .header("voice", voice)
            .header("Content-Type", "text/plain")
            .body(text.to_string())
            .send()
            .await
            .map_err(|e| request_error(PROVIDER_NAME, e))?;

        if !response.status().is_success() {
            return Err(api_error(PROVIDER_NAME, response).await);
        }

        let body = response
            .json::<FptResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse FPT.AI response: {}", e)))?;

        let audio_url = match body.audio_url.filter(|url| !url.is_empty()) {
            Some(url) if body.error == 0 => url,
            _ => {
                return Err(ProviderError::ApiError {
                    status_code: 200,
                    message: format!(
                        "{}: {}",
                        PROVIDER_NAME,
                        body.message.unwrap_or_else(|| "the API returned no audio link".to_string())
                    ),
                });
            }
        };

        let audio = self
            .client
            .get(&audio_url)
            .send()
            .await
            .map_err(|e| request_error(PROVIDER_NAME, e))?;

        if !audio.status().is_success() {
            return Err(ProviderError::ApiError {
                status_code: audio.status().as_u16(),
                message: format!("{}: could not download the rendered audio", PROVIDER_NAME),
            });
        }

        let data = audio
            .bytes()
            .await
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to download FPT.AI audio: {}", e)))?;

        Ok(AudioClip::mp3(data))
    }
}
