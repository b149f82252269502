use std::path::{Path, PathBuf};
use std::time::Duration;
use subdub::errors::ProviderError;
use subdub::providers::local::CommandEngine;
use subdub::providers::{SpeakOptions, SynthesisEngine};
use tokio_util::sync::CancellationToken;
use crate::common;

#[cfg(unix)]
fn write_engine(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("engine.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A chatty engine must not stall on its own diagnostics
#[cfg(unix)]
#[tokio::test]
async fn test_speak_withLargeStderrOutput_shouldFinish() {
    let dir = common::create_temp_dir().unwrap();
    let program = write_engine(dir.path(), "head -c 1048576 /dev/zero >&2\nexit 0");
    let engine = CommandEngine::new(program.to_string_lossy(), 175, 450);

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        engine.speak("Hello", Some("en-us"), SpeakOptions::audible(), &CancellationToken::new()),
    )
    .await
    .expect("engine stalled");

    assert!(result.is_ok());
}

/// Test a non-zero exit status
#[cfg(unix)]
#[tokio::test]
async fn test_speak_withFailingEngine_shouldReportExitStatus() {
    let dir = common::create_temp_dir().unwrap();
    let program = write_engine(dir.path(), "echo 'no such voice' >&2\nexit 3");
    let engine = CommandEngine::new(program.to_string_lossy(), 175, 450);

    let result = engine
        .speak("Hello", None, SpeakOptions::audible(), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(ProviderError::EngineError(message)) if message.contains("exited with")));
}

/// Blank text never starts the engine
#[tokio::test]
async fn test_speak_withBlankText_shouldSkipEngine() {
    let engine = CommandEngine::new("/nonexistent/engine", 175, 450);
    let result = engine
        .speak("   ", None, SpeakOptions::audible(), &CancellationToken::new())
        .await;
    assert!(result.is_ok());
}
