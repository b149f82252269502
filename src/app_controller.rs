use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::file_utils::{FileManager, FileType};
use crate::formatters::ExportFormat;
use crate::language_utils;
use crate::playback::audio::{AudioOutput, CommandPlayer};
use crate::playback::{
    AudioRecorder, BackendDispatcher, CaptureHarness, CaptureOutcome, CommandRecorder, PlaybackMode,
    PlaybackScheduler, SessionOutcome,
};
use crate::providers::gemini::GeminiTextService;
use crate::providers::local::CommandEngine;
use crate::providers::{build_speech_provider, extension_for_mime, SynthesisEngine};
use crate::subtitle_processor::{CueCollection, CueParser};
use crate::timeline::TimelineNormalizer;
use crate::translation::{BatchOptions, CueTranslator, TextService};
use crate::voices::{SpeakerRoster, Voice, VoiceBackend, VoiceRegistry};

// @module: Application controller wiring subtitles, timeline and speech backends

/// Main application controller for subtitle dubbing
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Subtitle parser with the default speaker heuristic
    parser: CueParser,
    // @field: Local speech engine
    engine: Arc<dyn SynthesisEngine>,
    // @field: Player for remote provider audio
    output: Arc<dyn AudioOutput>,
    // @field: Audio source used by capture
    recorder: Arc<dyn AudioRecorder>,
    // @field: Translation service, absent without credentials
    text_service: Option<Arc<dyn TextService>>,
}

impl Controller {
    // @method: Create a controller with command line backends from the configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let engine: Arc<dyn SynthesisEngine> = Arc::new(CommandEngine::from_config(&config.speech.local));
        let output: Arc<dyn AudioOutput> = Arc::new(CommandPlayer::from_config(&config.speech.player));
        let recorder: Arc<dyn AudioRecorder> = Arc::new(CommandRecorder::from_config(&config.capture));

        let text_service: Option<Arc<dyn TextService>> = if config.translation.api_key.trim().is_empty() {
            None
        } else {
            Some(Arc::new(GeminiTextService::from_config(&config.translation)))
        };

        let mut controller = Self::with_backends(config, engine, output, recorder);
        controller.text_service = text_service;
        Ok(controller)
    }

    /// Create a controller over explicit backends
    pub fn with_backends(
        config: Config,
        engine: Arc<dyn SynthesisEngine>,
        output: Arc<dyn AudioOutput>,
        recorder: Arc<dyn AudioRecorder>,
    ) -> Self {
        Self {
            config,
            parser: CueParser::default(),
            engine,
            output,
            recorder,
            text_service: None,
        }
    }

    /// Use `service` for subtitle translation
    pub fn with_text_service(mut self, service: Arc<dyn TextService>) -> Self {
        self.text_service = Some(service);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load and parse a subtitle file
    pub fn load_cues(&self, input_file: &Path) -> Result<CueCollection> {
        if !FileManager::file_exists(input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }
        if FileManager::detect_file_type(input_file)? == FileType::Audio {
            return Err(anyhow!("{:?} is an audio file, expected subtitles", input_file));
        }
        CueCollection::load(input_file, &self.parser)
    }

    fn normalizer(&self) -> TimelineNormalizer {
        TimelineNormalizer::with_config((&self.config.timeline).into())
    }

    /// Load a subtitle file, repairing its timeline when `normalize` is set
    fn load_for_playback(&self, input_file: &Path, normalize: bool) -> Result<CueCollection> {
        let mut collection = self.load_cues(input_file)?;
        if normalize {
            let result = self.normalizer().adjust(&collection.cues);
            info!("Adjusted {} of {} cue(s)", result.adjustments_count, collection.cues.len());
            collection.cues = result.adjusted_cues;
        }
        Ok(collection)
    }

    /// Repair the timeline of a subtitle file and write it back as SRT
    pub fn normalize(&self, input_file: &Path, output_dir: &Path, force_overwrite: bool) -> Result<PathBuf> {
        self.export(input_file, output_dir, ExportFormat::Srt, true, force_overwrite)
    }

    /// Export a subtitle file in `format`, optionally normalizing it first
    pub fn export(
        &self,
        input_file: &Path,
        output_dir: &Path,
        format: ExportFormat,
        normalize: bool,
        force_overwrite: bool,
    ) -> Result<PathBuf> {
        let collection = self.load_for_playback(input_file, normalize)?;

        let suffix = if normalize { "adjusted" } else { "" };
        let output_path = FileManager::generate_output_path(input_file, output_dir, suffix, format.extension());
        FileManager::check_writable(&output_path, force_overwrite)?;

        let content = format.render(&collection.cues, &collection.source_name());
        FileManager::write_to_file(&output_path, &content)?;

        info!("Wrote {} cue(s) as {} to {:?}", collection.cues.len(), format, output_path);
        Ok(output_path)
    }

    /// Voice catalogue with the local engine's voices enumerated
    pub async fn voice_registry(&self) -> VoiceRegistry {
        let local = match self.engine.voices().await {
            Ok(voices) => voices,
            Err(e) => {
                warn!("Could not list local engine voices: {}", e);
                Vec::new()
            }
        };
        debug!("Local engine reports {} voice(s)", local.len());
        VoiceRegistry::new(local, &self.config.speech.custom_voice.base_language)
    }

    /// List voices, optionally filtered by language and backend
    pub async fn list_voices(&self, language: Option<&str>, backend: Option<VoiceBackend>) -> Result<Vec<Voice>> {
        let registry = self.voice_registry().await;
        let voices = match language {
            Some(language) => {
                language_utils::get_language_name(language)
                    .with_context(|| format!("Unknown language: {}", language))?;
                registry.voices_for(language, backend)
            }
            None => registry
                .all()
                .into_iter()
                .filter(|voice| backend.is_none_or(|wanted| voice.backend == wanted))
                .collect(),
        };
        Ok(voices)
    }

    /// Dispatcher with every provider that has credentials configured
    pub fn build_dispatcher(&self) -> Result<BackendDispatcher> {
        let speech = &self.config.speech;
        let mut dispatcher = BackendDispatcher::new(Arc::clone(&self.engine), Arc::clone(&self.output))
            .with_max_chunk_chars(speech.local.max_chunk_chars)
            .with_disclosure_phrase(&speech.custom_voice.disclosure_phrase);

        for provider_config in &speech.providers {
            if !provider_config.has_credentials() {
                debug!("Skipping {} provider without credentials", provider_config.provider_type);
                continue;
            }
            let provider = build_speech_provider(provider_config)?;
            info!("Using {} for remote voices", provider.id().display_name());
            dispatcher = dispatcher.with_provider(provider);
        }

        Ok(dispatcher)
    }

    /// Scheduler over the configured backends
    pub async fn build_scheduler(&self) -> Result<Arc<PlaybackScheduler>> {
        let registry = self.voice_registry().await;
        let dispatcher = self.build_dispatcher()?;
        Ok(Arc::new(PlaybackScheduler::new(Arc::new(dispatcher), Arc::new(registry))))
    }

    /// Speaker roster for a cue track: the configured speakers plus one
    /// entry for every label found in the cues.
    pub fn prepare_roster(
        &self,
        collection: &CueCollection,
        registry: &VoiceRegistry,
        voice_override: Option<&str>,
    ) -> SpeakerRoster {
        let default_voice = registry.custom_base_voice().map(|voice| voice.id.clone());
        let mut roster = SpeakerRoster::new(self.config.speakers.clone());

        let added = roster.add_missing(&collection.speakers(), default_voice.as_deref());
        if added > 0 {
            info!("Added {} speaker(s) found in {}", added, collection.source_name());
        }
        if roster.is_empty() {
            roster.add_speaker(default_voice.as_deref());
        }

        if let Some(voice_id) = voice_override {
            let ids: Vec<u32> = roster.speakers().iter().map(|s| s.id).collect();
            for id in ids {
                roster.set_voice(id, voice_id);
            }
        }

        roster
    }

    /// Play a subtitle file through the speech backends in real time
    pub async fn preview(&self, input_file: &Path, voice_override: Option<&str>, normalize: bool) -> Result<SessionOutcome> {
        let collection = self.load_for_playback(input_file, normalize)?;
        let scheduler = self.build_scheduler().await?;
        let roster = self.prepare_roster(&collection, scheduler.registry(), voice_override);

        let progress_bar = Self::progress_bar(collection.cues.len() as u64);
        let run = scheduler.run(&collection.cues, roster.speakers(), PlaybackMode::Preview, |update| {
            progress_bar.set_position(update.current as u64);
            progress_bar.set_message(update.to_string());
        });
        let watched = Arc::clone(&scheduler);
        let outcome = Self::cancel_on_interrupt(move || watched.cancel(), run).await;
        progress_bar.finish_and_clear();

        let outcome = outcome?;
        Self::report_outcome(&outcome);
        Ok(outcome)
    }

    /// Render a subtitle file at accelerated rate while recording the audio
    /// source; returns the written artifact, or `None` when cancelled.
    pub async fn capture(
        &self,
        input_file: &Path,
        output_dir: &Path,
        voice_override: Option<&str>,
        normalize: bool,
        force_overwrite: bool,
    ) -> Result<Option<PathBuf>> {
        let collection = self.load_for_playback(input_file, normalize)?;
        let harness = self.build_harness().await?;
        let roster = self.prepare_roster(&collection, harness.scheduler().registry(), voice_override);

        let extension = extension_for_mime(&self.config.capture.mime_type);
        let output_path = FileManager::generate_output_path(input_file, output_dir, "dub", extension);
        FileManager::check_writable(&output_path, force_overwrite)?;

        let start_time = Instant::now();
        let progress_bar = Self::progress_bar(collection.cues.len() as u64);
        let run = harness.record(&collection.cues, roster.speakers(), |update| {
            progress_bar.set_position(update.current as u64);
            progress_bar.set_message(update.to_string());
        });
        let watched = harness.clone();
        let outcome = Self::cancel_on_interrupt(move || watched.cancel(), run).await;
        progress_bar.finish_and_clear();

        self.write_capture(outcome?, &output_path, start_time.elapsed())
    }

    /// Speak a single piece of text with `voice_id`
    pub async fn speak(&self, text: &str, voice_id: &str) -> Result<SessionOutcome> {
        if text.trim().is_empty() {
            return Err(anyhow!("Nothing to speak"));
        }
        let scheduler = self.build_scheduler().await?;
        let run = scheduler.speak_text(text, voice_id, PlaybackMode::Preview);
        let watched = Arc::clone(&scheduler);
        let outcome = Self::cancel_on_interrupt(move || watched.cancel(), run).await?;
        Self::report_outcome(&outcome);
        Ok(outcome)
    }

    /// Record a single piece of text spoken with `voice_id` to `output_path`
    pub async fn record_text(
        &self,
        text: &str,
        voice_id: &str,
        output_path: &Path,
        force_overwrite: bool,
    ) -> Result<Option<PathBuf>> {
        if text.trim().is_empty() {
            return Err(anyhow!("Nothing to record"));
        }
        FileManager::check_writable(output_path, force_overwrite)?;

        let harness = self.build_harness().await?;
        let start_time = Instant::now();
        let run = harness.record_text(text, voice_id, |update| debug!("{}", update));
        let watched = harness.clone();
        let outcome = Self::cancel_on_interrupt(move || watched.cancel(), run).await;

        self.write_capture(outcome?, output_path, start_time.elapsed())
    }

    /// Translate a subtitle file and write the result as SRT
    pub async fn translate(
        &self,
        input_file: &Path,
        output_dir: &Path,
        source_language: &str,
        target_language: &str,
        force_overwrite: bool,
    ) -> Result<PathBuf> {
        let service = self
            .text_service
            .clone()
            .ok_or_else(|| anyhow!("Translation needs translation.api_key in the configuration"))?;

        let source_name = language_utils::get_language_name(source_language)?;
        let target_name = language_utils::get_language_name(target_language)?;

        let collection = self.load_cues(input_file)?;
        let output_path = FileManager::generate_output_path(
            input_file,
            output_dir,
            &language_utils::primary_subtag(target_language),
            ExportFormat::Srt.extension(),
        );
        FileManager::check_writable(&output_path, force_overwrite)?;

        let translator = CueTranslator::new(service, BatchOptions::from(&self.config.translation));
        let total_batches = collection.cues.len().div_ceil(translator.options().batch_size.max(1));
        info!(
            "Translating {} cue(s) from {} to {} in {} batch(es)",
            collection.cues.len(),
            source_name,
            target_name,
            total_batches
        );

        let start_time = Instant::now();
        let progress_bar = Self::progress_bar(total_batches as u64);
        let translated = translator
            .translate(&collection.cues, source_language, target_language, |batch, total| {
                progress_bar.set_position(batch.saturating_sub(1) as u64);
                progress_bar.set_message(format!("Translating batch {}/{}...", batch, total));
            })
            .await;
        progress_bar.finish_and_clear();
        let translated = translated?;

        FileManager::write_to_file(&output_path, &ExportFormat::Srt.render(&translated, &collection.source_name()))?;
        info!(
            "Translated {} cue(s) in {} to {:?}",
            translated.len(),
            Self::format_duration(start_time.elapsed()),
            output_path
        );
        Ok(output_path)
    }

    async fn build_harness(&self) -> Result<CaptureHarness> {
        let scheduler = self.build_scheduler().await?;
        Ok(CaptureHarness::new(scheduler, Arc::clone(&self.recorder))
            .with_tail(Duration::from_millis(self.config.capture.tail_ms))
            .with_mime_type(&self.config.capture.mime_type))
    }

    fn write_capture(&self, outcome: CaptureOutcome, output_path: &Path, elapsed: Duration) -> Result<Option<PathBuf>> {
        match outcome {
            CaptureOutcome::Recorded(clip) => {
                FileManager::write_bytes(output_path, &clip.data)?;
                info!(
                    "Recorded {} bytes in {} to {:?}",
                    clip.data.len(),
                    Self::format_duration(elapsed),
                    output_path
                );
                Ok(Some(output_path.to_path_buf()))
            }
            CaptureOutcome::Cancelled => {
                warn!("Recording cancelled, nothing was written");
                Ok(None)
            }
        }
    }

    /// Await `run`, calling `cancel` on Ctrl-C
    async fn cancel_on_interrupt<F: Future>(cancel: impl FnOnce() + Send + 'static, run: F) -> F::Output {
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping speech");
                cancel();
            }
        });
        let output = run.await;
        watcher.abort();
        output
    }

    fn report_outcome(outcome: &SessionOutcome) {
        match outcome {
            SessionOutcome::Completed { spoken, skipped } if *skipped > 0 => {
                warn!("Finished: {} cue(s) spoken, {} skipped without a voice", spoken, skipped)
            }
            SessionOutcome::Completed { spoken, .. } => info!("Finished: {} cue(s) spoken", spoken),
            SessionOutcome::Cancelled { spoken } => warn!("Stopped after {} cue(s)", spoken),
        }
    }

    fn progress_bar(total: u64) -> ProgressBar {
        let progress_bar = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("#>-"));
        progress_bar.enable_steady_tick(Duration::from_millis(120));
        progress_bar
    }

    fn format_duration(duration: Duration) -> String {
        let total_secs = duration.as_secs();
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
