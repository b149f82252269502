use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};

use crate::errors::ProviderError;
use crate::playback::audio::AudioOutput;
use crate::playback::session::SpeechSession;
use crate::providers::local::chunk_text;
use crate::providers::{SpeakOptions, SpeechProvider, SynthesisEngine};
use crate::voices::{ProviderId, VoiceRef};

/// Longest piece of text handed to the local engine in one call
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 200;

/// Spoken before any custom voice utterance
pub const DEFAULT_DISCLOSURE_PHRASE: &str = "This voice is synthesized. ";

/// Routes one utterance to the backend that owns its voice
#[derive(Debug, Clone)]
pub struct BackendDispatcher {
    engine: Arc<dyn SynthesisEngine>,
    output: Arc<dyn AudioOutput>,
    providers: HashMap<ProviderId, Arc<dyn SpeechProvider>>,
    max_chunk_chars: usize,
    disclosure_phrase: String,
}

impl BackendDispatcher {
    pub fn new(engine: Arc<dyn SynthesisEngine>, output: Arc<dyn AudioOutput>) -> Self {
        Self {
            engine,
            output,
            providers: HashMap::new(),
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
            disclosure_phrase: DEFAULT_DISCLOSURE_PHRASE.to_string(),
        }
    }

    /// Register a remote provider, replacing any previous one with the same id
    pub fn with_provider(mut self, provider: Arc<dyn SpeechProvider>) -> Self {
        self.providers.insert(provider.id(), provider);
        self
    }

    pub fn with_max_chunk_chars(mut self, max_chunk_chars: usize) -> Self {
        self.max_chunk_chars = max_chunk_chars.max(1);
        self
    }

    pub fn with_disclosure_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.disclosure_phrase = phrase.into();
        self
    }

    pub fn engine(&self) -> &Arc<dyn SynthesisEngine> {
        &self.engine
    }

    /// Whether a remote provider is registered
    pub fn has_provider(&self, provider: ProviderId) -> bool {
        self.providers.contains_key(&provider)
    }

    /// Speak `text` with `voice` and wait until it has been rendered.
    ///
    /// Returns `Ok(())` without speaking once `session` is cancelled. Remote
    /// voices always play audibly at normal rate; `options` only affects the
    /// local engine.
    pub async fn speak(
        &self,
        session: &SpeechSession,
        text: &str,
        voice: &VoiceRef,
        options: SpeakOptions,
    ) -> Result<(), ProviderError> {
        if session.is_cancelled() {
            return Ok(());
        }

        match voice {
            VoiceRef::Local(handle) => self.speak_local(session, text, Some(handle.as_str()), options).await,
            VoiceRef::Custom(base) => {
                let token = session.begin_utterance();
                // The disclosure is always audible at normal rate
                self.engine
                    .speak(&self.disclosure_phrase, base.as_deref(), SpeakOptions::audible(), &token)
                    .await?;
                if session.is_cancelled() {
                    return Ok(());
                }
                self.speak_local(session, text, base.as_deref(), options).await
            }
            VoiceRef::Remote(provider_id, name) => self.speak_remote(session, text, *provider_id, name).await,
        }
    }

    async fn speak_local(
        &self,
        session: &SpeechSession,
        text: &str,
        handle: Option<&str>,
        options: SpeakOptions,
    ) -> Result<(), ProviderError> {
        let token = session.begin_utterance();
        for chunk in chunk_text(text, self.max_chunk_chars) {
            if token.is_cancelled() {
                debug!("Local utterance cancelled before the next chunk");
                return Ok(());
            }
            self.engine.speak(&chunk, handle, options, &token).await?;
        }
        Ok(())
    }

    async fn speak_remote(
        &self,
        session: &SpeechSession,
        text: &str,
        provider_id: ProviderId,
        voice: &str,
    ) -> Result<(), ProviderError> {
        let provider = self.providers.get(&provider_id).ok_or_else(|| ProviderError::MissingCredentials {
            provider: provider_id.display_name().to_string(),
            hint: format!("add a \"{}\" entry to speech.providers", provider_id),
        })?;

        let clip = provider.synthesize(text, voice).await?;

        // The request cannot be aborted; drop its result instead
        if session.is_cancelled() {
            warn!("Discarding {} audio for a cancelled session", provider_id.display_name());
            return Ok(());
        }

        let token = session.begin_utterance();
        self.output.play(&clip, &token).await
    }
}
