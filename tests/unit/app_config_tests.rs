/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use subdub::app_config::{Config, LogLevel, SpeechProviderConfig};
use subdub::voices::{ProviderId, SpeakerConfig};
use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.timeline.minimum_gap_ms, 1);
    assert_eq!(config.timeline.default_duration_secs, 2.0);
    assert_eq!(config.speech.local.program, "espeak-ng");
    assert_eq!(config.speech.local.max_chunk_chars, 200);
    assert!(config.speech.providers.is_empty());
    assert_eq!(config.capture.tail_ms, 2000);
    assert_eq!(config.translation.batch_size, 50);
    assert_eq!(config.translation.retry_count, 3);
    assert_eq!(config.translation.retry_backoff_ms, 1000);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

/// Missing sections fall back to defaults
#[test]
fn test_deserialize_withPartialJson_shouldFillDefaults() -> Result<()> {
    let json = r#"{
        "timeline": { "minimum_gap_ms": 250 },
        "speech": { "providers": [ { "type": "fpt", "api_key": "k" } ] },
        "speakers": [ { "id": 1, "speaker_name": "Alice", "voice_id": "fpt-banmai" } ],
        "log_level": "debug"
    }"#;
    let config: Config = serde_json::from_str(json)?;

    assert_eq!(config.timeline.minimum_gap_ms, 250);
    assert_eq!(config.timeline.default_duration_secs, 2.0);
    assert_eq!(config.speech.providers[0].timeout_secs, 30);
    assert_eq!(config.speakers[0].voice_id, "fpt-banmai");
    assert_eq!(config.log_level, LogLevel::Debug);
    assert!(config.validate().is_ok());
    Ok(())
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();

    config.timeline.default_duration_secs = 0.0;
    assert!(config.validate().is_err());
    config.timeline.default_duration_secs = f64::NAN;
    assert!(config.validate().is_err());
    config.timeline.default_duration_secs = 2.0;

    config.speech.local.max_chunk_chars = 0;
    assert!(config.validate().is_err());
    config.speech.local.max_chunk_chars = 200;

    config.speech.providers.push(SpeechProviderConfig {
        provider_type: "polly".to_string(),
        ..SpeechProviderConfig::new(ProviderId::Google)
    });
    assert!(config.validate().is_err());
    config.speech.providers.clear();

    config.translation.batch_size = 0;
    assert!(config.validate().is_err());
    config.translation.batch_size = 50;

    config.translation.retry_count = 0;
    assert!(config.validate().is_err());
    config.translation.retry_count = 3;

    assert!(config.validate().is_ok());
}

/// Remote voices in the roster need credentials
#[test]
fn test_config_validation_withRemoteVoiceWithoutCredentials_shouldFail() {
    let mut config = Config::default();
    config.speakers.push(SpeakerConfig::new(1, "Alice", "microsoft-vi-VN-HoaiMyNeural"));
    assert!(config.validate().is_err());

    let mut microsoft = SpeechProviderConfig::new(ProviderId::Microsoft);
    microsoft.api_key = "key".to_string();
    config.speech.providers.push(microsoft);
    // Microsoft also needs a region
    assert!(config.validate().is_err());

    config.speech.providers[0].region = "southeastasia".to_string();
    assert!(config.validate().is_ok());

    // Local and custom voices need nothing
    config.speakers.push(SpeakerConfig::new(2, "Bob", "custom-me"));
    config.speakers.push(SpeakerConfig::new(3, "Carol", "en-us"));
    assert!(config.validate().is_ok());
}

/// Test provider lookup
#[test]
fn test_providerConfig_withAlias_shouldFindEntry() {
    let mut config = Config::default();
    let mut azure = SpeechProviderConfig::new(ProviderId::Microsoft);
    azure.provider_type = "azure".to_string();
    config.speech.providers.push(azure);

    assert!(config.speech.provider_config(ProviderId::Microsoft).is_some());
    assert!(config.speech.provider_config(ProviderId::Google).is_none());
}

/// Test save and load, and default creation
#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let created = Config::load_or_create(&path)?;
    assert!(path.exists());
    assert_eq!(created.timeline.minimum_gap_ms, 1);

    let mut changed = created.clone();
    changed.capture.tail_ms = 500;
    changed.save(&path)?;

    let loaded = Config::load_or_create(&path)?;
    assert_eq!(loaded.capture.tail_ms, 500);
    Ok(())
}

/// Broken JSON is reported
#[test]
fn test_fromFile_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;

    assert!(Config::from_file(&path).is_err());
    Ok(())
}

/// Log levels map onto the log crate
#[test]
fn test_logLevel_toLevelFilter_shouldMap() {
    assert_eq!(LogLevel::Error.to_level_filter(), log::LevelFilter::Error);
    assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
}
