use std::fmt::Debug;
use std::process::Stdio;

use async_trait::async_trait;
use log::{debug, error};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::app_config::PlayerConfig;
use crate::errors::ProviderError;
use crate::providers::AudioClip;

/// Plays encoded audio returned by remote providers
#[async_trait]
pub trait AudioOutput: Send + Sync + Debug {
    /// Play `clip` to completion, or stop early when `cancel` fires
    async fn play(&self, clip: &AudioClip, cancel: &CancellationToken) -> Result<(), ProviderError>;
}

/// Plays clips with an external player program.
///
/// Each clip is written to a temporary file that is removed once playback
/// ends, fails or is cancelled.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &PlayerConfig) -> Self {
        Self::new(&config.program, config.args.clone())
    }
}

#[async_trait]
impl AudioOutput for CommandPlayer {
    async fn play(&self, clip: &AudioClip, cancel: &CancellationToken) -> Result<(), ProviderError> {
        if clip.is_empty() {
            return Err(ProviderError::PlaybackFailed("received an empty audio clip".to_string()));
        }
        if cancel.is_cancelled() {
            return Ok(());
        }

        let file = tempfile::Builder::new()
            .prefix("subdub-")
            .suffix(&format!(".{}", clip.extension()))
            .tempfile()
            .map_err(|e| ProviderError::PlaybackFailed(format!("Failed to create temporary audio file: {}", e)))?;

        tokio::fs::write(file.path(), &clip.data)
            .await
            .map_err(|e| ProviderError::PlaybackFailed(format!("Failed to write temporary audio file: {}", e)))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProviderError::PlaybackFailed(format!("Failed to start {}: {}", self.program, e)))?;

        let status = tokio::select! {
            status = child.wait() => {
                status.map_err(|e| ProviderError::PlaybackFailed(format!("{} did not finish: {}", self.program, e)))?
            },
            _ = cancel.cancelled() => {
                debug!("Playback cancelled, stopping {}", self.program);
                let _ = child.kill().await;
                return Ok(());
            }
        };

        if !status.success() {
            error!("{} exited with {}", self.program, status);
            return Err(ProviderError::PlaybackFailed(format!("{} exited with {}", self.program, status)));
        }

        Ok(())
    }
}
