use serde_json::json;
use subdub::errors::ProviderError;
use subdub::providers::fpt::FptTts;
use subdub::providers::SpeechProvider;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Synthesis asks for a link, then downloads it
#[tokio::test]
async fn test_synthesize_withValidKey_shouldFollowAudioLink() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hmi/tts/v5"))
        .and(header("api-key", "fpt-key"))
        .and(header("voice", "banmai"))
        .and(body_string("Xin chào"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": 0,
            "async": format!("{}/files/1.mp3", server.uri()),
            "request_id": "abc"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/1.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fpt-audio".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let tts = FptTts::with_endpoint("fpt-key", server.uri(), 5);
    let clip = tts.synthesize("Xin chào", "banmai").await.unwrap();

    assert_eq!(&clip.data[..], b"fpt-audio");
}

/// A non-zero error code fails even with HTTP 200
#[tokio::test]
async fn test_synthesize_withErrorCode_shouldReturnApiError() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hmi/tts/v5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": 1,
            "message": "Quota exceeded"
        })))
        .mount(&server)
        .await;

    let tts = FptTts::with_endpoint("fpt-key", server.uri(), 5);
    let result = tts.synthesize("Hello", "leminh").await;

    match result {
        Err(ProviderError::ApiError { message, .. }) => assert!(message.contains("Quota exceeded")),
        other => panic!("expected an API error, got {:?}", other),
    }
}

/// A broken audio link is reported with its status
#[tokio::test]
async fn test_synthesize_withMissingAudioFile_shouldReturnApiError() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hmi/tts/v5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": 0,
            "async": format!("{}/files/gone.mp3", server.uri())
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/gone.mp3"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let tts = FptTts::with_endpoint("fpt-key", server.uri(), 5);
    let result = tts.synthesize("Hello", "leminh").await;

    assert!(matches!(result, Err(ProviderError::ApiError { status_code: 404, .. })));
}
