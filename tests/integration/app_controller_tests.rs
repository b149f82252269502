/*!
 * Controller workflows over mock speech, output and capture backends
 */

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use subdub::app_config::Config;
use subdub::app_controller::Controller;
use subdub::formatters::ExportFormat;
use subdub::playback::SessionOutcome;
use subdub::providers::mock::{MockEngine, MockOutput, MockRecorder, MockTextService, RecorderBehavior};
use subdub::voices::{ProviderId, SpeakerConfig, VoiceBackend};
use crate::common;

fn test_config() -> Config {
    let mut config = Config::default();
    config.capture.tail_ms = 0;
    config.capture.mime_type = "audio/ogg".to_string();
    config.translation.retry_backoff_ms = 0;
    config
}

fn controller(config: Config, engine: &MockEngine, recorder: &MockRecorder) -> Controller {
    Controller::with_backends(
        config,
        Arc::new(engine.clone()),
        Arc::new(MockOutput::working()),
        Arc::new(recorder.clone()),
    )
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

/// Test normalization to an adjusted SRT file
#[test]
fn test_normalize_withOverlap_shouldWriteAdjustedFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "clip.srt", common::OVERLAPPING_SUBTITLE)?;
    let controller = controller(test_config(), &MockEngine::working(), &MockRecorder::recording(b"x"));

    let output = controller.normalize(&input, temp_dir.path(), false)?;

    assert_eq!(output, temp_dir.path().join("clip.adjusted.srt"));
    assert!(read(&output).contains("00:00:02,002 --> 00:00:04,002"));
    Ok(())
}

/// Existing outputs are kept unless forced
#[test]
fn test_export_withExistingOutput_shouldRequireForce() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "talk.srt")?;
    let controller = controller(test_config(), &MockEngine::working(), &MockRecorder::recording(b"x"));

    let output = controller.export(&input, temp_dir.path(), ExportFormat::Txt, false, false)?;
    assert_eq!(output, temp_dir.path().join("talk.txt"));

    assert!(controller.export(&input, temp_dir.path(), ExportFormat::Txt, false, false).is_err());
    assert!(controller.export(&input, temp_dir.path(), ExportFormat::Txt, false, true).is_ok());
    Ok(())
}

/// Audio files are not accepted as subtitles
#[test]
fn test_loadCues_withAudioFile_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "song.mp3", "not really audio")?;
    let controller = controller(test_config(), &MockEngine::working(), &MockRecorder::recording(b"x"));

    assert!(controller.load_cues(&input).is_err());
    assert!(controller.load_cues(&temp_dir.path().join("missing.srt")).is_err());
    Ok(())
}

/// Capture writes the recording next to the subtitles
#[tokio::test]
async fn test_capture_withSpeakers_shouldWriteArtifact() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "talk.srt")?;
    let engine = MockEngine::working();
    let recorder = MockRecorder::recording(b"OggSdata");
    let controller = controller(test_config(), &engine, &recorder);

    let output = controller.capture(&input, temp_dir.path(), None, true, false).await?;

    let output = output.expect("capture should produce a file");
    assert_eq!(output, temp_dir.path().join("talk.dub.ogg"));
    assert_eq!(fs::read(&output)?, b"OggSdata");
    assert_eq!(
        engine.spoken_texts(),
        vec!["This is a test subtitle.", "It contains multiple entries.", "For testing purposes."]
    );
    assert_eq!(recorder.released(), 1);
    Ok(())
}

/// A failed recording leaves no file behind
#[tokio::test]
async fn test_capture_withSilentRecorder_shouldFailWithoutFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "talk.srt")?;
    let controller = controller(test_config(), &MockEngine::working(), &MockRecorder::new(RecorderBehavior::Silent));

    let result = controller.capture(&input, temp_dir.path(), None, false, false).await;

    assert!(result.is_err());
    assert!(!temp_dir.path().join("talk.dub.ogg").exists());
    Ok(())
}

/// Configured speakers keep their voices, new labels get the default
#[tokio::test]
async fn test_prepareRoster_withConfiguredSpeaker_shouldAddOthers() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "talk.srt")?;
    let mut config = test_config();
    config.speakers = vec![SpeakerConfig::new(1, "Bob", "en-us")];
    let controller = controller(config, &MockEngine::working(), &MockRecorder::recording(b"x"));

    let collection = controller.load_cues(&input)?;
    let registry = controller.voice_registry().await;

    let roster = controller.prepare_roster(&collection, &registry, None);
    assert_eq!(
        roster.speakers(),
        &[SpeakerConfig::new(1, "Bob", "en-us"), SpeakerConfig::new(2, "Alice", "vi")]
    );

    let overridden = controller.prepare_roster(&collection, &registry, Some("fpt-banmai"));
    assert!(overridden.speakers().iter().all(|s| s.voice_id == "fpt-banmai"));
    Ok(())
}

/// Preview plays every cue with the speaker's voice
#[tokio::test(start_paused = true)]
async fn test_preview_withSample_shouldSpeakEveryCue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "talk.srt")?;
    let engine = MockEngine::working();
    let controller = controller(test_config(), &engine, &MockRecorder::recording(b"x"));

    let outcome = controller.preview(&input, Some("en-us"), false).await?;

    assert_eq!(outcome, SessionOutcome::Completed { spoken: 3, skipped: 0 });
    assert!(engine.spoken().iter().all(|c| c.voice.as_deref() == Some("en-us")));
    Ok(())
}

/// Without any local voice, labelled speakers have no voice and are skipped
#[tokio::test(start_paused = true)]
async fn test_preview_withoutLocalVoices_shouldSkipEveryCue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "talk.srt")?;
    let engine = MockEngine::working().with_voices(Vec::new());
    let controller = controller(test_config(), &engine, &MockRecorder::recording(b"x"));

    let outcome = controller.preview(&input, None, false).await?;

    assert_eq!(outcome, SessionOutcome::Completed { spoken: 0, skipped: 3 });
    assert_eq!(engine.request_count(), 0);
    Ok(())
}

/// Test one-off speech
#[tokio::test]
async fn test_speak_withText_shouldUseVoice() -> Result<()> {
    let engine = MockEngine::working();
    let controller = controller(test_config(), &engine, &MockRecorder::recording(b"x"));

    let outcome = controller.speak("Xin chào", "vi").await?;

    assert_eq!(outcome, SessionOutcome::Completed { spoken: 1, skipped: 0 });
    assert_eq!(engine.spoken_texts(), vec!["Xin chào"]);
    assert!(controller.speak("   ", "vi").await.is_err());
    Ok(())
}

/// Remote voices without credentials fail clearly
#[tokio::test]
async fn test_speak_withUnconfiguredRemoteVoice_shouldFail() {
    let controller = controller(test_config(), &MockEngine::working(), &MockRecorder::recording(b"x"));

    let result = controller.speak("Hello", "fpt-banmai").await;

    let message = format!("{:#}", result.unwrap_err());
    assert!(message.contains("FPT.AI"), "{}", message);
}

/// Test recording one piece of text to a file
#[tokio::test]
async fn test_recordText_withOutputPath_shouldWriteFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output = temp_dir.path().join("hello.ogg");
    let controller = controller(test_config(), &MockEngine::working(), &MockRecorder::recording(b"hello"));

    let written = controller.record_text("Hello", "en-us", &output, false).await?;

    assert_eq!(written.as_deref(), Some(output.as_path()));
    assert_eq!(fs::read(&output)?, b"hello");
    Ok(())
}

/// Test voice listing filters
#[tokio::test]
async fn test_listVoices_withFilters_shouldNarrowCatalogue() -> Result<()> {
    let controller = controller(test_config(), &MockEngine::working(), &MockRecorder::recording(b"x"));

    let local_vi = controller.list_voices(Some("vi"), Some(VoiceBackend::Local)).await?;
    assert_eq!(local_vi.len(), 1);
    assert_eq!(local_vi[0].id, "vi");

    let fpt = controller.list_voices(None, Some(VoiceBackend::Remote(ProviderId::Fpt))).await?;
    assert_eq!(fpt.len(), 6);

    assert!(controller.list_voices(Some("zz"), None).await.is_err());
    Ok(())
}

/// Test translation to a new SRT file
#[tokio::test]
async fn test_translate_withTextService_shouldWriteTranslatedFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "talk.srt")?;
    let service = MockTextService::working();
    let controller = controller(test_config(), &MockEngine::working(), &MockRecorder::recording(b"x"))
        .with_text_service(Arc::new(service.clone()));

    let output = controller.translate(&input, temp_dir.path(), "en", "fr", false).await?;

    assert_eq!(output, temp_dir.path().join("talk.fr.srt"));
    let content = read(&output);
    assert!(content.contains("Alice: [fr] This is a test subtitle."));
    assert!(content.contains("00:00:10,000 --> 00:00:14,000\n[fr] For testing purposes."));
    assert_eq!(service.request_count(), 1);
    Ok(())
}

/// Translation needs a configured service
#[tokio::test]
async fn test_translate_withoutTextService_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "talk.srt")?;
    let controller = controller(test_config(), &MockEngine::working(), &MockRecorder::recording(b"x"));

    assert!(controller.translate(&input, temp_dir.path(), "en", "fr", false).await.is_err());
    Ok(())
}
