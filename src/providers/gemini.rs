use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app_config::TranslationConfig;
use crate::errors::ProviderError;
use crate::providers::{api_error, http_client, request_error};
use crate::translation::TextService;

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const PROVIDER_NAME: &str = "Gemini";

const SYSTEM_INSTRUCTION: &str = "You are a literal translation engine.
- Provide a direct, literal translation for each string.
- DO NOT add any words, explanations, or creative interpretations.
- Maintain the exact JSON array structure and number of elements.
- Respond ONLY with the translated JSON object.";

/// Gemini `generateContent` client used as a batch translator
#[derive(Debug, Clone)]
pub struct GeminiTextService {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct TextBatch {
    texts: Vec<String>,
}

impl GeminiTextService {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: http_client(timeout_secs),
            api_key: api_key.into(),
            model: model.into(),
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &TranslationConfig) -> Self {
        let endpoint = if config.endpoint.is_empty() { DEFAULT_ENDPOINT } else { &config.endpoint };
        Self::new(&config.api_key, &config.model, endpoint, config.timeout_secs)
    }

    fn prompt(texts: &[String], source_language: &str, target_language: &str) -> Result<String, ProviderError> {
        let input = serde_json::to_string(&TextBatch { texts: texts.to_vec() })
            .map_err(|e| ProviderError::ParseError(format!("Failed to encode batch: {}", e)))?;
        Ok(format!(
            "Translate each string in the JSON array from {} to {}.\nInput: {}\nOutput:",
            source_language, target_language, input
        ))
    }
}

#[async_trait]
impl TextService for GeminiTextService {
    async fn translate_batch(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<String>, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::MissingCredentials {
                provider: PROVIDER_NAME.to_string(),
                hint: "set translation.api_key".to_string(),
            });
        }

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": Self::prompt(texts, source_language, target_language)? }] }],
            "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
            "generationConfig": { "responseMimeType": "application/json" }
        });

        debug!("Sending {} text(s) to {} model {}", texts.len(), PROVIDER_NAME, self.model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(PROVIDER_NAME, e))?;

        if !response.status().is_success() {
            return Err(api_error(PROVIDER_NAME, response).await);
        }

        let generated = response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Gemini response: {}", e)))?;

        let text: String = generated
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().map(|part| part.text).collect())
            .unwrap_or_default();

        let batch: TextBatch = serde_json::from_str(text.trim()).map_err(|e| {
            error!("Gemini returned a non-JSON translation: {}", text);
            ProviderError::ParseError(format!("Translation was not the expected JSON object: {}", e))
        })?;

        Ok(batch.texts)
    }
}
