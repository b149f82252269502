/*!
 * Subtitle translation through an external text service.
 *
 * - `batch`: splits cues into batches and retries failed batches
 *
 * The service itself is a collaborator behind [`TextService`]; the Gemini
 * client lives in `providers::gemini`.
 */

use std::fmt::Debug;

use async_trait::async_trait;

use crate::errors::ProviderError;

pub use self::batch::{BatchOptions, CueTranslator};

pub mod batch;

/// A service that translates a batch of strings.
///
/// Implementations should return one output per input, in order; callers
/// treat anything else as a failed attempt.
#[async_trait]
pub trait TextService: Send + Sync + Debug {
    async fn translate_batch(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<String>, ProviderError>;
}
