/*!
 * Tests for recording a capture run
 */

use std::sync::Arc;
use std::time::Duration;
use subdub::errors::{CaptureError, PlaybackError};
use subdub::playback::{CaptureHarness, CaptureOutcome, SessionState};
use subdub::providers::mock::{MockEngine, MockOutput, MockRecorder, RecorderBehavior};
use subdub::providers::SpeakOptions;
use subdub::voices::SpeakerConfig;
use crate::common;

fn harness(engine: &MockEngine, recorder: &MockRecorder) -> CaptureHarness {
    let scheduler = common::mock_scheduler(engine, &MockOutput::working(), &[]);
    CaptureHarness::new(scheduler, Arc::new(recorder.clone())).with_tail(Duration::ZERO)
}

fn cues() -> Vec<subdub::Cue> {
    vec![common::cue_at(1, 0.0, 1.0, "Hello"), common::cue_at(2, 30.0, 31.0, "Goodbye")]
}

fn speakers() -> Vec<SpeakerConfig> {
    vec![SpeakerConfig::new(1, "Speaker A", "vi")]
}

/// A completed run yields the recorded bytes
#[tokio::test]
async fn test_record_withWorkingRecorder_shouldReturnClip() {
    let engine = MockEngine::working();
    let recorder = MockRecorder::recording(b"RIFFdata");
    let harness = harness(&engine, &recorder).with_mime_type("audio/ogg");

    let outcome = harness.record(&cues(), &speakers(), |_| {}).await.unwrap();

    match outcome {
        CaptureOutcome::Recorded(clip) => {
            assert_eq!(&clip.data[..], b"RIFFdata");
            assert_eq!(clip.mime_type, "audio/ogg");
            assert_eq!(clip.extension(), "ogg");
        }
        CaptureOutcome::Cancelled => panic!("capture should have completed"),
    }
    assert!(recorder.was_started());
    assert_eq!(recorder.acquired(), 1);
    assert_eq!(recorder.released(), 1);
    assert!(engine.spoken().iter().all(|c| c.options == SpeakOptions::fast_silent()));
}

/// The tail keeps recording after the last cue
#[tokio::test(start_paused = true)]
async fn test_record_withTail_shouldWaitBeforeStopping() {
    let engine = MockEngine::working();
    let recorder = MockRecorder::recording(b"data");
    let scheduler = common::mock_scheduler(&engine, &MockOutput::working(), &[]);
    let harness = CaptureHarness::new(scheduler, Arc::new(recorder.clone()));

    let started = tokio::time::Instant::now();
    harness.record(&cues(), &speakers(), |_| {}).await.unwrap();

    // Cue gaps are not waited for, only the default two second tail
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3), "took {:?}", elapsed);
}

/// A refused source aborts before anything is spoken
#[tokio::test]
async fn test_record_withPermissionDenied_shouldFailWithoutSpeaking() {
    let engine = MockEngine::working();
    let recorder = MockRecorder::new(RecorderBehavior::Denied);

    let result = harness(&engine, &recorder).record(&cues(), &speakers(), |_| {}).await;

    assert!(matches!(result, Err(PlaybackError::Capture(CaptureError::PermissionDenied(_)))));
    assert_eq!(engine.request_count(), 0);
    assert!(!recorder.was_started());
}

/// A source without audio is released before recording starts
#[tokio::test]
async fn test_record_withNoAudioTrack_shouldReleaseAndFail() {
    let engine = MockEngine::working();
    let recorder = MockRecorder::new(RecorderBehavior::NoAudioTrack);

    let result = harness(&engine, &recorder).record(&cues(), &speakers(), |_| {}).await;

    assert!(matches!(result, Err(PlaybackError::Capture(CaptureError::NoAudioTrack))));
    assert!(!recorder.was_started());
    assert_eq!(recorder.released(), 1);
    assert_eq!(engine.request_count(), 0);
}

/// An empty recording is an error
#[tokio::test]
async fn test_record_withSilentRecorder_shouldReportNothingRecorded() {
    let engine = MockEngine::working();
    let recorder = MockRecorder::new(RecorderBehavior::Silent);

    let result = harness(&engine, &recorder).record(&cues(), &speakers(), |_| {}).await;

    assert!(matches!(result, Err(PlaybackError::Capture(CaptureError::NothingRecorded))));
    assert_eq!(recorder.released(), 1);
}

/// Cancelling mid-run produces no artifact and releases the source
#[tokio::test(start_paused = true)]
async fn test_record_withCancel_shouldReturnCancelledAndRelease() {
    let engine = MockEngine::slow(5000);
    let recorder = MockRecorder::recording(b"partial");
    let harness = harness(&engine, &recorder);

    let task = {
        let harness = harness.clone();
        tokio::spawn(async move { harness.record(&cues(), &speakers(), |_| {}).await })
    };

    tokio::time::sleep(Duration::from_secs(1)).await;
    harness.cancel();

    let outcome = task.await.unwrap().unwrap();
    assert!(matches!(outcome, CaptureOutcome::Cancelled));
    assert_eq!(engine.spoken_texts(), vec!["Hello"]);
    assert_eq!(recorder.released(), 1);
    assert_eq!(harness.scheduler().state(), SessionState::Cancelled);
}

/// Cancelling while the source is still being acquired speaks nothing
#[tokio::test(start_paused = true)]
async fn test_record_withCancelDuringAcquire_shouldReturnCancelledWithoutSpeaking() {
    let engine = MockEngine::working();
    let recorder = MockRecorder::recording(b"data").with_acquire_delay(Duration::from_secs(2));
    let harness = harness(&engine, &recorder);

    let task = {
        let harness = harness.clone();
        tokio::spawn(async move { harness.record(&cues(), &speakers(), |_| {}).await })
    };

    tokio::time::sleep(Duration::from_secs(1)).await;
    harness.cancel();

    let outcome = task.await.unwrap().unwrap();
    assert!(matches!(outcome, CaptureOutcome::Cancelled));
    assert_eq!(engine.request_count(), 0);
    assert!(!recorder.was_started());
}

/// Cancelling during the tail discards the recording
#[tokio::test(start_paused = true)]
async fn test_record_withCancelDuringTail_shouldReturnCancelledAndRelease() {
    let engine = MockEngine::working();
    let recorder = MockRecorder::recording(b"data");
    let scheduler = common::mock_scheduler(&engine, &MockOutput::working(), &[]);
    let harness = CaptureHarness::new(scheduler, Arc::new(recorder.clone())).with_tail(Duration::from_secs(5));

    let task = {
        let harness = harness.clone();
        tokio::spawn(async move { harness.record(&cues(), &speakers(), |_| {}).await })
    };

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(engine.request_count(), 2);
    harness.cancel();

    let started = tokio::time::Instant::now();
    let outcome = task.await.unwrap().unwrap();
    assert!(matches!(outcome, CaptureOutcome::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(recorder.was_started());
    assert_eq!(recorder.released(), 1);
}

/// A later capture on the same harness is not affected by an earlier cancel
#[tokio::test(start_paused = true)]
async fn test_record_afterCancelledRun_shouldRecordAgain() {
    let engine = MockEngine::working();
    let recorder = MockRecorder::recording(b"data").with_acquire_delay(Duration::from_secs(2));
    let harness = harness(&engine, &recorder);

    let task = {
        let harness = harness.clone();
        tokio::spawn(async move { harness.record(&cues(), &speakers(), |_| {}).await })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;
    harness.cancel();
    assert!(matches!(task.await.unwrap().unwrap(), CaptureOutcome::Cancelled));

    let outcome = harness.record(&cues(), &speakers(), |_| {}).await.unwrap();
    assert!(matches!(outcome, CaptureOutcome::Recorded(_)));
}

/// Backend failures still release the source
#[tokio::test]
async fn test_record_withFailingBackend_shouldReleaseAndFail() {
    let engine = MockEngine::failing();
    let recorder = MockRecorder::recording(b"data");

    let result = harness(&engine, &recorder).record(&cues(), &speakers(), |_| {}).await;

    assert!(matches!(result, Err(PlaybackError::Backend { .. })));
    assert!(recorder.was_started());
    assert_eq!(recorder.released(), 1);
}

/// Test recording one piece of text
#[tokio::test]
async fn test_recordText_withVoice_shouldSpeakOnceAndRecord() {
    let engine = MockEngine::working();
    let recorder = MockRecorder::recording(b"voice");

    let outcome = harness(&engine, &recorder)
        .record_text("Just this", "en-us", |_| {})
        .await
        .unwrap();

    assert!(matches!(outcome, CaptureOutcome::Recorded(_)));
    assert_eq!(engine.spoken_texts(), vec!["Just this"]);
    assert_eq!(engine.spoken()[0].voice.as_deref(), Some("en-us"));
}
