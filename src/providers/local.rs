use std::process::Stdio;

use async_trait::async_trait;
use log::{debug, error};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::app_config::LocalEngineConfig;
use crate::errors::ProviderError;
use crate::providers::{SpeakOptions, SynthesisEngine};
use crate::voices::{Gender, Voice, VoiceBackend};

/// Split text into speakable chunks.
///
/// Lines are kept as separate chunks so pauses between them survive, blank
/// lines are dropped, and lines longer than `max_chars` characters are cut
/// into consecutive pieces of at most `max_chars`.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();

    for line in text.split('\n').filter(|line| !line.trim().is_empty()) {
        let chars: Vec<char> = line.chars().collect();
        for piece in chars.chunks(max_chars) {
            chunks.push(piece.iter().collect());
        }
    }

    chunks
}

/// Parse the voice table printed by `espeak-ng --voices`.
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File          Other Languages
///  5  vi              --/M      Vietnamese         aav/vi
/// ```
pub fn parse_voice_listing(output: &str) -> Vec<Voice> {
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("Pty"))
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return None;
            }
            let gender = match fields[2].rsplit('/').next() {
                Some("M") => Gender::Male,
                Some("F") => Gender::Female,
                _ => Gender::Neutral,
            };
            Some(Voice {
                id: fields[1].to_string(),
                name: fields[3].replace('_', " "),
                gender,
                language: fields[1].to_string(),
                backend: VoiceBackend::Local,
            })
        })
        .collect()
}

/// Local engine backed by an espeak-compatible command line program
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    base_words_per_minute: u32,
    max_words_per_minute: u32,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>, base_words_per_minute: u32, max_words_per_minute: u32) -> Self {
        Self {
            program: program.into(),
            base_words_per_minute,
            max_words_per_minute,
        }
    }

    pub fn from_config(config: &LocalEngineConfig) -> Self {
        Self::new(&config.program, config.base_words_per_minute, config.max_words_per_minute)
    }

    /// Speaking speed for a rate multiplier, clamped to the engine maximum
    pub fn words_per_minute(&self, rate: f32) -> u32 {
        let wpm = (self.base_words_per_minute as f32 * rate.max(0.1)).round() as u32;
        wpm.clamp(1, self.max_words_per_minute.max(1))
    }

    fn speak_args(&self, text: &str, voice: Option<&str>, options: SpeakOptions) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(voice) = voice {
            args.push("-v".to_string());
            args.push(voice.to_string());
        }
        args.push("-s".to_string());
        args.push(self.words_per_minute(options.rate).to_string());
        args.push("-a".to_string());
        args.push(if options.muted { "0" } else { "100" }.to_string());
        args.push("--".to_string());
        args.push(text.to_string());
        args
    }
}

#[async_trait]
impl SynthesisEngine for CommandEngine {
    async fn voices(&self) -> Result<Vec<Voice>, ProviderError> {
        let output = Command::new(&self.program)
            .arg("--voices")
            .output()
            .await
            .map_err(|e| ProviderError::EngineError(format!("Failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProviderError::EngineError(format!("{} --voices failed: {}", self.program, stderr.trim())));
        }

        Ok(parse_voice_listing(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn speak(
        &self,
        text: &str,
        voice: Option<&str>,
        options: SpeakOptions,
        cancel: &CancellationToken,
    ) -> Result<(), ProviderError> {
        if text.trim().is_empty() || cancel.is_cancelled() {
            return Ok(());
        }

        let mut child = Command::new(&self.program)
            .args(self.speak_args(text, voice, options))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProviderError::EngineError(format!("Failed to start {}: {}", self.program, e)))?;

        let status = tokio::select! {
            status = child.wait() => {
                status.map_err(|e| ProviderError::EngineError(format!("{} did not finish: {}", self.program, e)))?
            },
            _ = cancel.cancelled() => {
                debug!("Utterance cancelled, stopping {}", self.program);
                let _ = child.kill().await;
                return Ok(());
            }
        };

        if !status.success() {
            error!("{} failed with {}", self.program, status);
            return Err(ProviderError::EngineError(format!("{} exited with {}", self.program, status)));
        }

        Ok(())
    }
}
