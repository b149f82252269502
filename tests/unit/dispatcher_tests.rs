/*!
 * Tests for routing utterances to speech backends
 */

use std::sync::Arc;
use std::time::Duration;
use subdub::errors::ProviderError;
use subdub::playback::dispatcher::DEFAULT_DISCLOSURE_PHRASE;
use subdub::playback::SpeechSession;
use subdub::providers::mock::{MockEngine, MockOutput, MockProvider};
use subdub::providers::SpeakOptions;
use subdub::voices::{ProviderId, VoiceRef};
use crate::common;

/// Local voices are chunked by line and by length
#[tokio::test]
async fn test_speak_withLocalVoice_shouldChunkByLineAndLength() {
    let engine = MockEngine::working();
    let output = MockOutput::working();
    let dispatcher = common::mock_dispatcher(&engine, &output, &[]).with_max_chunk_chars(5);
    let session = SpeechSession::new();

    dispatcher
        .speak(&session, "abcdefgh\n\nxyz", &VoiceRef::Local("vi".to_string()), SpeakOptions::audible())
        .await
        .unwrap();

    assert_eq!(engine.spoken_texts(), vec!["abcde", "fgh", "xyz"]);
    assert!(engine.spoken().iter().all(|c| c.voice.as_deref() == Some("vi")));
    assert_eq!(output.played(), 0);
}

/// Long lines split at 200 characters by default
#[tokio::test]
async fn test_speak_withLongLine_shouldUseDefaultChunkSize() {
    let engine = MockEngine::working();
    let output = MockOutput::working();
    let dispatcher = common::mock_dispatcher(&engine, &output, &[]);
    let session = SpeechSession::new();
    let text = "ã".repeat(450);

    dispatcher
        .speak(&session, &text, &VoiceRef::Local("vi".to_string()), SpeakOptions::audible())
        .await
        .unwrap();

    let lengths: Vec<usize> = engine.spoken_texts().iter().map(|t| t.chars().count()).collect();
    assert_eq!(lengths, vec![200, 200, 50]);
}

/// The disclosure stays audible even in fast silent mode
#[tokio::test]
async fn test_speak_withCustomVoiceInFastMode_shouldSpeakAudibleDisclosureFirst() {
    let engine = MockEngine::working();
    let output = MockOutput::working();
    let dispatcher = common::mock_dispatcher(&engine, &output, &[]);
    let session = SpeechSession::new();

    dispatcher
        .speak(&session, "Real text", &VoiceRef::Custom(Some("vi".to_string())), SpeakOptions::fast_silent())
        .await
        .unwrap();

    let spoken = engine.spoken();
    assert_eq!(spoken.len(), 2);
    assert_eq!(spoken[0].text, DEFAULT_DISCLOSURE_PHRASE);
    assert_eq!(spoken[0].options, SpeakOptions::audible());
    assert_eq!(spoken[1].text, "Real text");
    assert_eq!(spoken[1].options, SpeakOptions::fast_silent());
    assert!(spoken.iter().all(|c| c.voice.as_deref() == Some("vi")));
}

/// The disclosure phrase is configurable
#[tokio::test]
async fn test_speak_withCustomDisclosure_shouldUseIt() {
    let engine = MockEngine::working();
    let output = MockOutput::working();
    let dispatcher = common::mock_dispatcher(&engine, &output, &[]).with_disclosure_phrase("Synthetic voice.");
    let session = SpeechSession::new();

    dispatcher
        .speak(&session, "Hi", &VoiceRef::Custom(None), SpeakOptions::audible())
        .await
        .unwrap();

    assert_eq!(engine.spoken_texts(), vec!["Synthetic voice.", "Hi"]);
    assert_eq!(engine.spoken()[0].voice, None);
}

/// Remote voices go to their provider and play through the output
#[tokio::test]
async fn test_speak_withRemoteVoice_shouldSynthesizeAndPlay() {
    let engine = MockEngine::working();
    let output = MockOutput::working();
    let fpt = MockProvider::working(ProviderId::Fpt);
    let google = MockProvider::working(ProviderId::Google);
    let dispatcher = common::mock_dispatcher(&engine, &output, &[fpt.clone(), google.clone()]);
    let session = SpeechSession::new();

    dispatcher
        .speak(&session, "Xin chào", &VoiceRef::Remote(ProviderId::Fpt, "banmai".to_string()), SpeakOptions::fast_silent())
        .await
        .unwrap();

    assert_eq!(fpt.requests(), vec![("Xin chào".to_string(), "banmai".to_string())]);
    assert!(google.requests().is_empty());
    assert_eq!(output.played(), 1);
    assert_eq!(engine.request_count(), 0);
}

/// A provider without credentials is a hard failure
#[tokio::test]
async fn test_speak_withUnconfiguredProvider_shouldReportMissingCredentials() {
    let engine = MockEngine::working();
    let output = MockOutput::working();
    let dispatcher = common::mock_dispatcher(&engine, &output, &[]);
    let session = SpeechSession::new();

    let result = dispatcher
        .speak(&session, "Hi", &VoiceRef::Remote(ProviderId::Microsoft, "vi-VN-HoaiMyNeural".to_string()), SpeakOptions::audible())
        .await;

    assert!(matches!(result, Err(ProviderError::MissingCredentials { .. })));
    assert!(!dispatcher.has_provider(ProviderId::Microsoft));
}

/// Provider failures propagate
#[tokio::test]
async fn test_speak_withFailingProvider_shouldReturnProviderError() {
    let engine = MockEngine::working();
    let output = MockOutput::working();
    let google = MockProvider::failing(ProviderId::Google);
    let dispatcher = common::mock_dispatcher(&engine, &output, &[google]);
    let session = SpeechSession::new();

    let result = dispatcher
        .speak(&session, "Hi", &VoiceRef::Remote(ProviderId::Google, "vi-VN-Standard-A".to_string()), SpeakOptions::audible())
        .await;

    assert!(matches!(result, Err(ProviderError::ApiError { status_code: 500, .. })));
    assert_eq!(output.played(), 0);
}

/// Engine failures propagate
#[tokio::test]
async fn test_speak_withFailingEngine_shouldReturnEngineError() {
    let engine = MockEngine::failing();
    let output = MockOutput::working();
    let dispatcher = common::mock_dispatcher(&engine, &output, &[]);
    let session = SpeechSession::new();

    let result = dispatcher
        .speak(&session, "Hi", &VoiceRef::Local("vi".to_string()), SpeakOptions::audible())
        .await;

    assert!(matches!(result, Err(ProviderError::EngineError(_))));
}

/// A cancelled session speaks nothing
#[tokio::test]
async fn test_speak_withCancelledSession_shouldDoNothing() {
    let engine = MockEngine::working();
    let output = MockOutput::working();
    let fpt = MockProvider::working(ProviderId::Fpt);
    let dispatcher = common::mock_dispatcher(&engine, &output, &[fpt.clone()]);
    let session = SpeechSession::new();
    session.cancel();
    session.cancel();

    dispatcher
        .speak(&session, "Hi", &VoiceRef::Local("vi".to_string()), SpeakOptions::audible())
        .await
        .unwrap();
    dispatcher
        .speak(&session, "Hi", &VoiceRef::Remote(ProviderId::Fpt, "myan".to_string()), SpeakOptions::audible())
        .await
        .unwrap();

    assert_eq!(engine.request_count(), 0);
    assert!(fpt.requests().is_empty());
}

/// Cancelling mid-utterance stops the remaining chunks
#[tokio::test(start_paused = true)]
async fn test_speak_withCancelDuringUtterance_shouldSkipRemainingChunks() {
    let engine = MockEngine::slow(1000);
    let output = MockOutput::working();
    let dispatcher = Arc::new(common::mock_dispatcher(&engine, &output, &[]));
    let session = Arc::new(SpeechSession::new());

    let task = {
        let dispatcher = Arc::clone(&dispatcher);
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            dispatcher
                .speak(&session, "one\ntwo\nthree\nfour", &VoiceRef::Local("vi".to_string()), SpeakOptions::audible())
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(1500)).await;
    session.cancel();

    assert!(task.await.unwrap().is_ok());
    assert_eq!(engine.spoken_texts(), vec!["one", "two"]);
    assert!(!session.has_active_utterance());
}
