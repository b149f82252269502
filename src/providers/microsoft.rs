use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use parking_lot::Mutex;
use reqwest::Client;

use crate::app_config::SpeechProviderConfig;
use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::{api_error, http_client, request_error, AudioClip, SpeechProvider};
use crate::voices::ProviderId;

const PROVIDER_NAME: &str = "Microsoft Azure TTS";
const OUTPUT_FORMAT: &str = "audio-24khz-160kbitrate-mono-mp3";

/// Lifetime assumed for an issued token
pub const TOKEN_LIFETIME_SECS: i64 = 9 * 60;

/// A cached token is reused only while it has more than this left
pub const TOKEN_SAFETY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Microsoft Azure Speech client.
///
/// The subscription key is exchanged for a short-lived bearer token which is
/// cached per client.
#[derive(Debug)]
pub struct MicrosoftTts {
    client: Client,
    api_key: String,
    region: String,
    token_url: String,
    synthesis_url: String,
    token: Mutex<Option<CachedToken>>,
}

/// Escape text for inclusion in an SSML document
pub fn escape_ssml(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Build the SSML body for one utterance
pub fn build_ssml(text: &str, voice: &str) -> String {
    let lang = language_utils::locale_of_voice_name(voice).unwrap_or_else(|| "vi-VN".to_string());
    format!(
        "<speak version='1.0' xml:lang='{lang}'><voice xml:lang='{lang}' name='{voice}'>{text}</voice></speak>",
        lang = lang,
        voice = voice,
        text = escape_ssml(text)
    )
}

impl MicrosoftTts {
    /// Create a client for the public endpoints of `region`
    pub fn new(api_key: impl Into<String>, region: impl Into<String>) -> Self {
        let region = region.into();
        let token_url = format!("https://{}.api.cognitive.microsoft.com/sts/v1.0/issueToken", region);
        let synthesis_url = format!("https://{}.tts.speech.microsoft.com/cognitiveservices/v1", region);
        Self::with_endpoints(api_key, region, token_url, synthesis_url, 30)
    }

    /// Create a client with explicit token and synthesis URLs
    pub fn with_endpoints(
        api_key: impl Into<String>,
        region: impl Into<String>,
        token_url: impl Into<String>,
        synthesis_url: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client: http_client(timeout_secs),
            api_key: api_key.into(),
            region: region.into(),
            token_url: token_url.into(),
            synthesis_url: synthesis_url.into(),
            token: Mutex::new(None),
        }
    }

    /// An `endpoint` override is a base URL serving both `/sts/v1.0/issueToken`
    /// and `/cognitiveservices/v1`.
    pub fn from_config(config: &SpeechProviderConfig) -> Self {
        if config.endpoint.is_empty() {
            let mut tts = Self::new(&config.api_key, &config.region);
            tts.client = http_client(config.timeout_secs);
            tts
        } else {
            let base = config.endpoint.trim_end_matches('/');
            Self::with_endpoints(
                &config.api_key,
                &config.region,
                format!("{}/sts/v1.0/issueToken", base),
                format!("{}/cognitiveservices/v1", base),
                config.timeout_secs,
            )
        }
    }

    fn cached_token(&self, now: DateTime<Utc>) -> Option<String> {
        self.token
            .lock()
            .as_ref()
            .filter(|cached| cached.expires_at > now + Duration::seconds(TOKEN_SAFETY_MARGIN_SECS))
            .map(|cached| cached.token.clone())
    }

    /// Current bearer token, fetching a new one when the cached one is about to expire
    pub async fn auth_token(&self) -> Result<String, ProviderError> {
        if let Some(token) = self.cached_token(Utc::now()) {
            return Ok(token);
        }

        debug!("Requesting a new Azure speech token for region {}", self.region);
        let response = self
            .client
            .post(&self.token_url)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Content-Length", "0")
            .send()
            .await
            .map_err(|e| request_error(PROVIDER_NAME, e))?;

        if !response.status().is_success() {
            return Err(ProviderError::AuthenticationError(format!(
                "Could not obtain an Azure token (status {})",
                response.status().as_u16()
            )));
        }

        let token = response
            .text()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to read Azure token: {}", e)))?;

        *self.token.lock() = Some(CachedToken {
            token: token.clone(),
            expires_at: Utc::now() + Duration::seconds(TOKEN_LIFETIME_SECS),
        });

        Ok(token)
    }
}

#[async_trait]
impl SpeechProvider for MicrosoftTts {
    fn id(&self) -> ProviderId {
        ProviderId::Microsoft
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioClip, ProviderError> {
        if self.api_key.is_empty() || self.region.is_empty() {
            return Err(ProviderError::MissingCredentials {
                provider: PROVIDER_NAME.to_string(),
                hint: "set api_key and region for the microsoft speech provider".to_string(),
            });
        }

        let token = self.auth_token().await?;

        let response = self
            .client
            .post(&self.synthesis_url)
            .bearer_auth(token)
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", OUTPUT_FORMAT)
            .body(build_ssml(text, voice))
            .send()
            .await
            .map_err(|e| request_error(PROVIDER_NAME, e))?;

        if !response.status().is_success() {
            return Err(api_error(PROVIDER_NAME, response).await);
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to download Azure audio: {}", e)))?;

        Ok(AudioClip::mp3(data))
    }
}
