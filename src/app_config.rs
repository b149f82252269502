use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::timeline::NormalizerConfig;
use crate::voices::{ProviderId, SpeakerConfig, VoiceRef};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Timeline normalization settings
    #[serde(default)]
    pub timeline: TimelineConfig,

    /// Speech backends
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Speaker roster used for dubbing
    #[serde(default)]
    pub speakers: Vec<SpeakerConfig>,

    /// Audio capture settings
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Subtitle translation settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Timeline normalization settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimelineConfig {
    /// Minimum gap between consecutive cues in milliseconds
    #[serde(default = "default_minimum_gap_ms")]
    pub minimum_gap_ms: u64,

    /// Duration given to cues whose end is not after their start
    #[serde(default = "default_duration_secs")]
    pub default_duration_secs: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            minimum_gap_ms: default_minimum_gap_ms(),
            default_duration_secs: default_duration_secs(),
        }
    }
}

impl From<&TimelineConfig> for NormalizerConfig {
    fn from(config: &TimelineConfig) -> Self {
        NormalizerConfig {
            minimum_gap_ms: config.minimum_gap_ms,
            default_duration_secs: config.default_duration_secs,
        }
    }
}

/// Speech backends configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SpeechConfig {
    /// Local synthesis engine
    #[serde(default)]
    pub local: LocalEngineConfig,

    /// Custom (cloned) voice policy
    #[serde(default)]
    pub custom_voice: CustomVoiceConfig,

    /// Player used for remote provider audio
    #[serde(default)]
    pub player: PlayerConfig,

    /// Remote providers with their credentials
    #[serde(default)]
    pub providers: Vec<SpeechProviderConfig>,
}

impl SpeechConfig {
    /// Configuration entry for a remote provider
    pub fn provider_config(&self, provider: ProviderId) -> Option<&SpeechProviderConfig> {
        self.providers
            .iter()
            .find(|p| p.provider_type.parse::<ProviderId>().ok() == Some(provider))
    }
}

/// Local synthesis engine settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LocalEngineConfig {
    // @field: espeak-compatible program
    #[serde(default = "default_engine_program")]
    pub program: String,

    // @field: Longest chunk spoken in one call
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    // @field: Words per minute at rate 1.0
    #[serde(default = "default_base_wpm")]
    pub base_words_per_minute: u32,

    // @field: Fastest speed the engine accepts
    #[serde(default = "default_max_wpm")]
    pub max_words_per_minute: u32,
}

impl Default for LocalEngineConfig {
    fn default() -> Self {
        Self {
            program: default_engine_program(),
            max_chunk_chars: default_max_chunk_chars(),
            base_words_per_minute: default_base_wpm(),
            max_words_per_minute: default_max_wpm(),
        }
    }
}

/// Custom voice settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CustomVoiceConfig {
    /// Phrase spoken before every custom voice utterance
    #[serde(default = "default_disclosure_phrase")]
    pub disclosure_phrase: String,

    /// Language of the local voice used to render custom voices
    #[serde(default = "default_custom_base_language")]
    pub base_language: String,
}

impl Default for CustomVoiceConfig {
    fn default() -> Self {
        Self {
            disclosure_phrase: default_disclosure_phrase(),
            base_language: default_custom_base_language(),
        }
    }
}

/// Audio player settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlayerConfig {
    // @field: Player program
    #[serde(default = "default_player_program")]
    pub program: String,

    // @field: Arguments placed before the audio file path
    #[serde(default = "default_player_args")]
    pub args: Vec<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            program: default_player_program(),
            args: default_player_args(),
        }
    }
}

/// Remote speech provider entry
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpeechProviderConfig {
    // @field: Provider type identifier (google, fpt, microsoft)
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Azure region, Microsoft only
    #[serde(default = "String::new")]
    pub region: String,

    // @field: Service URL override
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl SpeechProviderConfig {
    // @param provider: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider_type: provider.to_string(),
            api_key: String::new(),
            region: String::new(),
            endpoint: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Whether every credential the provider needs is set
    pub fn has_credentials(&self) -> bool {
        match self.provider_type.parse::<ProviderId>() {
            Ok(ProviderId::Microsoft) => !self.api_key.is_empty() && !self.region.is_empty(),
            Ok(_) => !self.api_key.is_empty(),
            Err(_) => false,
        }
    }
}

/// Audio capture settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CaptureConfig {
    // @field: ffmpeg-compatible recorder program
    #[serde(default = "default_recorder_program")]
    pub program: String,

    // @field: Arguments selecting the audio source
    #[serde(default = "default_recorder_input_args")]
    pub input_args: Vec<String>,

    // @field: Time to keep recording after the last utterance
    #[serde(default = "default_tail_ms")]
    pub tail_ms: u64,

    // @field: MIME type of the recorded artifact
    #[serde(default = "default_capture_mime_type")]
    pub mime_type: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            program: default_recorder_program(),
            input_args: default_recorder_input_args(),
            tail_ms: default_tail_ms(),
            mime_type: default_capture_mime_type(),
        }
    }
}

/// Subtitle translation settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Gemini API key
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Model name
    #[serde(default = "default_translation_model")]
    pub model: String,

    /// Service endpoint URL override
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// Cues per request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Attempts per batch
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Fixed pause between attempts in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Request timeout in seconds
    #[serde(default = "default_translation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_translation_model(),
            endpoint: String::new(),
            batch_size: default_batch_size(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            timeout_secs: default_translation_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_minimum_gap_ms() -> u64 {
    crate::timeline::DEFAULT_MINIMUM_GAP_MS
}

fn default_duration_secs() -> f64 {
    crate::timeline::DEFAULT_CUE_DURATION_SECS
}

fn default_engine_program() -> String {
    "espeak-ng".to_string()
}

fn default_max_chunk_chars() -> usize {
    200
}

fn default_base_wpm() -> u32 {
    175
}

fn default_max_wpm() -> u32 {
    450
}

fn default_disclosure_phrase() -> String {
    crate::playback::dispatcher::DEFAULT_DISCLOSURE_PHRASE.to_string()
}

fn default_custom_base_language() -> String {
    "vi".to_string()
}

fn default_player_program() -> String {
    "ffplay".to_string()
}

fn default_player_args() -> Vec<String> {
    ["-nodisp", "-autoexit", "-loglevel", "error"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_recorder_program() -> String {
    "ffmpeg".to_string()
}

fn default_recorder_input_args() -> Vec<String> {
    ["-f", "pulse", "-i", "default"].iter().map(|s| s.to_string()).collect()
}

fn default_tail_ms() -> u64 {
    2000
}

fn default_capture_mime_type() -> String {
    "audio/webm".to_string()
}

fn default_translation_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_batch_size() -> usize {
    50
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_translation_timeout_secs() -> u64 {
    120
}

impl Config {
    /// Read a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write this configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    /// Load `path`, or create it with defaults when it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            log::warn!("Config file not found at '{}', creating default config.", path.display());
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let duration = self.timeline.default_duration_secs;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(anyhow!("timeline.default_duration_secs must be positive, got {}", duration));
        }

        if self.speech.local.max_chunk_chars == 0 {
            return Err(anyhow!("speech.local.max_chunk_chars must be greater than zero"));
        }

        for provider in &self.speech.providers {
            provider
                .provider_type
                .parse::<ProviderId>()
                .with_context(|| "Invalid entry in speech.providers")?;
        }

        // Remote voices used by the roster need credentials
        for speaker in &self.speakers {
            if let Some(VoiceRef::Remote(provider, _)) = VoiceRef::parse(&speaker.voice_id) {
                let configured = self
                    .speech
                    .provider_config(provider)
                    .is_some_and(SpeechProviderConfig::has_credentials);
                if !configured {
                    return Err(anyhow!(
                        "Speaker '{}' uses a {} voice but no credentials are configured for it",
                        speaker.speaker_name,
                        provider.display_name()
                    ));
                }
            }
        }

        if self.translation.batch_size == 0 {
            return Err(anyhow!("translation.batch_size must be greater than zero"));
        }
        if self.translation.retry_count == 0 {
            return Err(anyhow!("translation.retry_count must be at least 1"));
        }

        Ok(())
    }
}
