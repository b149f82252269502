/*!
 * Batch translation of subtitle cues.
 *
 * Cues are translated in fixed-size batches, one batch at a time. A batch is
 * retried when the service fails or returns the wrong number of strings.
 */

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};

use crate::app_config::TranslationConfig;
use crate::errors::TranslationError;
use crate::subtitle_processor::Cue;

use super::TextService;

/// Batching and retry policy
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Cues per request
    pub batch_size: usize,
    /// Attempts per batch, including the first
    pub max_attempts: u32,
    /// Fixed pause between attempts
    pub retry_backoff: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_attempts: 3,
            retry_backoff: Duration::from_millis(1000),
        }
    }
}

impl From<&TranslationConfig> for BatchOptions {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            max_attempts: config.retry_count.max(1),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// Translates cue text while leaving timing and speakers untouched
#[derive(Debug, Clone)]
pub struct CueTranslator {
    service: Arc<dyn TextService>,
    options: BatchOptions,
}

impl CueTranslator {
    pub fn new(service: Arc<dyn TextService>, options: BatchOptions) -> Self {
        Self { service, options }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Translate every cue.
    ///
    /// `on_progress` receives the 1-based batch number and the batch count
    /// before each batch is sent. An empty translation keeps the original text.
    pub async fn translate(
        &self,
        cues: &[Cue],
        source_language: &str,
        target_language: &str,
        mut on_progress: impl FnMut(usize, usize),
    ) -> Result<Vec<Cue>, TranslationError> {
        if cues.is_empty() {
            return Ok(Vec::new());
        }

        let batch_size = self.options.batch_size.max(1);
        let total_batches = cues.len().div_ceil(batch_size);
        let mut translated = Vec::with_capacity(cues.len());

        for (batch_index, batch) in cues.chunks(batch_size).enumerate() {
            on_progress(batch_index + 1, total_batches);

            let texts: Vec<String> = batch.iter().map(|cue| cue.text.clone()).collect();
            let outputs = self
                .translate_texts(&texts, source_language, target_language, batch_index + 1)
                .await?;

            for (cue, output) in batch.iter().zip(outputs) {
                let mut cue = cue.clone();
                if !output.trim().is_empty() {
                    cue.text = output;
                }
                translated.push(cue);
            }
        }

        Ok(translated)
    }

    /// Translate one batch with retries
    pub async fn translate_texts(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
        batch_number: usize,
    ) -> Result<Vec<String>, TranslationError> {
        if texts.iter().all(|text| text.trim().is_empty()) {
            return Ok(texts.to_vec());
        }

        let max_attempts = self.options.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            match self.service.translate_batch(texts, source_language, target_language).await {
                Ok(outputs) if outputs.len() == texts.len() => {
                    debug!("Batch {} translated on attempt {}", batch_number, attempt);
                    return Ok(outputs);
                }
                Ok(outputs) => {
                    warn!(
                        "Translation attempt {} for batch {} failed: expected {} lines, got {}",
                        attempt,
                        batch_number,
                        texts.len(),
                        outputs.len()
                    );
                }
                Err(e) => {
                    error!("Translation attempt {} for batch {} failed: {}", attempt, batch_number, e);
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.options.retry_backoff).await;
            }
        }

        Err(TranslationError::RetriesExhausted {
            batch: batch_number,
            attempts: max_attempts,
        })
    }
}
