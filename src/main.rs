// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use subdub::app_config::{self, Config};
use subdub::app_controller::Controller;
use subdub::formatters::ExportFormat;
use subdub::voices::{ProviderId, VoiceBackend};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for export formats
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliExportFormat {
    Srt,
    Ass,
    Txt,
    Script,
}

impl From<CliExportFormat> for ExportFormat {
    fn from(format: CliExportFormat) -> Self {
        match format {
            CliExportFormat::Srt => ExportFormat::Srt,
            CliExportFormat::Ass => ExportFormat::Ass,
            CliExportFormat::Txt => ExportFormat::Txt,
            CliExportFormat::Script => ExportFormat::Script,
        }
    }
}

/// CLI Wrapper for voice backends
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliBackend {
    Local,
    Google,
    Fpt,
    Microsoft,
    Custom,
}

impl From<CliBackend> for VoiceBackend {
    fn from(backend: CliBackend) -> Self {
        match backend {
            CliBackend::Local => VoiceBackend::Local,
            CliBackend::Google => VoiceBackend::Remote(ProviderId::Google),
            CliBackend::Fpt => VoiceBackend::Remote(ProviderId::Fpt),
            CliBackend::Microsoft => VoiceBackend::Remote(ProviderId::Microsoft),
            CliBackend::Custom => VoiceBackend::Custom,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Repair overlapping or invalid cue timings and write an adjusted SRT
    Normalize {
        /// Input subtitle file
        #[arg(value_name = "INPUT_FILE")]
        input_file: PathBuf,

        /// Output directory (defaults to the input's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Minimum gap between cues in milliseconds
        #[arg(long)]
        minimum_gap_ms: Option<u64>,

        /// Force overwrite of existing output files
        #[arg(short, long)]
        force_overwrite: bool,
    },

    /// Export subtitles as SRT, ASS, plain text or a narration script
    Export {
        /// Input subtitle file
        #[arg(value_name = "INPUT_FILE")]
        input_file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "srt")]
        format: CliExportFormat,

        /// Output directory (defaults to the input's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Normalize the timeline before exporting
        #[arg(short, long)]
        normalize: bool,

        /// Force overwrite of existing output files
        #[arg(short, long)]
        force_overwrite: bool,
    },

    /// Play subtitles through the speech backends in real time
    Preview {
        /// Input subtitle file
        #[arg(value_name = "INPUT_FILE")]
        input_file: PathBuf,

        /// Voice used for every speaker, overriding the roster
        #[arg(short, long)]
        voice: Option<String>,

        /// Normalize the timeline before playing
        #[arg(short, long)]
        normalize: bool,
    },

    /// Render subtitles at accelerated rate and record the audio source
    Capture {
        /// Input subtitle file
        #[arg(value_name = "INPUT_FILE")]
        input_file: PathBuf,

        /// Output directory (defaults to the input's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Voice used for every speaker, overriding the roster
        #[arg(short, long)]
        voice: Option<String>,

        /// Normalize the timeline before recording
        #[arg(short, long)]
        normalize: bool,

        /// Force overwrite of existing output files
        #[arg(short, long)]
        force_overwrite: bool,
    },

    /// Speak a piece of text, or record it with --record
    Speak {
        /// Text to speak
        #[arg(value_name = "TEXT")]
        text: String,

        /// Voice identifier (see `subdub voices`)
        #[arg(short, long)]
        voice: String,

        /// Record the speech to this file instead of only playing it
        #[arg(short, long)]
        record: Option<PathBuf>,

        /// Force overwrite of existing output files
        #[arg(short, long)]
        force_overwrite: bool,
    },

    /// List available voices
    Voices {
        /// Only voices for this language or locale (e.g. 'vi', 'en-US')
        #[arg(short, long)]
        language: Option<String>,

        /// Only voices of this backend
        #[arg(short, long, value_enum)]
        backend: Option<CliBackend>,
    },

    /// Translate subtitle text, keeping timings and speakers
    Translate {
        /// Input subtitle file
        #[arg(value_name = "INPUT_FILE")]
        input_file: PathBuf,

        /// Source language code (e.g., 'en', 'vi')
        #[arg(short, long)]
        source_language: String,

        /// Target language code (e.g., 'en', 'vi')
        #[arg(short, long)]
        target_language: String,

        /// Output directory (defaults to the input's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Force overwrite of existing output files
        #[arg(short, long)]
        force_overwrite: bool,
    },

    /// Generate shell completions for subdub
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// subdub - subtitle dubbing with multi-backend speech synthesis
///
/// Turns subtitle files into narrated audio using the local speech engine,
/// Google Cloud TTS, FPT.AI or Microsoft Azure voices.
#[derive(Parser, Debug)]
#[command(name = "subdub")]
#[command(version)]
#[command(about = "Subtitle dubbing with multi-backend speech synthesis")]
#[command(long_about = "subdub normalizes subtitle timelines, previews them through speech backends and records the narration.

EXAMPLES:
    subdub normalize movie.srt                      # Repair overlapping cues
    subdub export --format ass -n movie.srt         # Normalize and export as ASS
    subdub preview movie.srt                        # Play the cues in real time
    subdub capture -v vi-VN-Wavenet-A movie.srt     # Record with a Google voice
    subdub speak -v fpt-banmai \"Xin chào\"           # Speak a single line
    subdub voices -l vi                             # List Vietnamese voices
    subdub translate -s en -t vi movie.srt          # Translate the cue text
    subdub completions bash > subdub.bash           # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }

    // @returns: Marker for log level
    fn marker_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "✖",
            Level::Warn => "▲",
            Level::Info => " ",
            Level::Debug => "·",
            Level::Trace => "…",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        // Dependencies log at their own pace; only our crate goes below Info
        metadata.level() <= self.level
            && (metadata.target().starts_with("subdub") || metadata.level() <= Level::Warn)
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::color_for_level(level),
                now,
                Self::marker_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The level is lowered or raised once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "subdub", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(cmd_log_level) = &cli.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&cli.config_path)?;

    // Apply command line overrides before validating
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }
    if let Commands::Normalize {
        minimum_gap_ms: Some(gap),
        ..
    } = &cli.command
    {
        config.timeline.minimum_gap_ms = *gap;
    }

    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config)?;
    run_command(&controller, cli.command).await
}

async fn run_command(controller: &Controller, command: Commands) -> Result<()> {
    match command {
        Commands::Normalize {
            input_file,
            output_dir,
            force_overwrite,
            ..
        } => {
            let output_dir = output_dir_for(&input_file, output_dir);
            let output = controller.normalize(&input_file, &output_dir, force_overwrite)?;
            info!("Success: {:?}", output);
        }
        Commands::Export {
            input_file,
            format,
            output_dir,
            normalize,
            force_overwrite,
        } => {
            let output_dir = output_dir_for(&input_file, output_dir);
            let output = controller.export(&input_file, &output_dir, format.into(), normalize, force_overwrite)?;
            info!("Success: {:?}", output);
        }
        Commands::Preview {
            input_file,
            voice,
            normalize,
        } => {
            controller.preview(&input_file, voice.as_deref(), normalize).await?;
        }
        Commands::Capture {
            input_file,
            output_dir,
            voice,
            normalize,
            force_overwrite,
        } => {
            let output_dir = output_dir_for(&input_file, output_dir);
            if let Some(output) = controller
                .capture(&input_file, &output_dir, voice.as_deref(), normalize, force_overwrite)
                .await?
            {
                info!("Success: {:?}", output);
            }
        }
        Commands::Speak {
            text,
            voice,
            record,
            force_overwrite,
        } => match record {
            Some(output_path) => {
                if let Some(output) = controller.record_text(&text, &voice, &output_path, force_overwrite).await? {
                    info!("Success: {:?}", output);
                }
            }
            None => {
                controller.speak(&text, &voice).await?;
            }
        },
        Commands::Voices { language, backend } => {
            let voices = controller.list_voices(language.as_deref(), backend.map(Into::into)).await?;
            if voices.is_empty() {
                return Err(anyhow!("No voices match the given filters"));
            }
            let mut stdout = std::io::stdout();
            for voice in voices {
                writeln!(stdout, "{:<36} {:<12} {}", voice.id, voice.language, voice.name)?;
            }
        }
        Commands::Translate {
            input_file,
            source_language,
            target_language,
            output_dir,
            force_overwrite,
        } => {
            let output_dir = output_dir_for(&input_file, output_dir);
            let output = controller
                .translate(&input_file, &output_dir, &source_language, &target_language, force_overwrite)
                .await?;
            info!("Success: {:?}", output);
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Output directory, defaulting to the input file's directory
fn output_dir_for(input_file: &Path, output_dir: Option<PathBuf>) -> PathBuf {
    output_dir.unwrap_or_else(|| input_file.parent().unwrap_or(Path::new(".")).to_path_buf())
}
