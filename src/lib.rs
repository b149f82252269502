/*!
 * # subdub - subtitle dubbing with multi-backend speech synthesis
 *
 * A Rust library that turns subtitle files into narrated audio.
 *
 * ## Features
 *
 * - Parse SRT-like subtitle text, with optional `Speaker: text` labels
 * - Repair timelines: overlaps, invalid durations, minimum gaps
 * - Speak cues through several backends:
 *   - The local speech engine (espeak-compatible)
 *   - Google Cloud TTS
 *   - FPT.AI
 *   - Microsoft Azure TTS
 *   - Custom voices rendered locally behind an audible disclosure
 * - Real-time preview and accelerated capture into a single audio file
 * - Export to SRT, ASS, plain text and narration scripts
 * - Batch translation of cues through a text generation service
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: Cue parsing and speaker extraction
 * - `timeline`: Timecode conversion and timeline normalization
 * - `formatters`: Subtitle and script exporters
 * - `voices`: Voice identifiers, catalogue and speaker roster
 * - `providers`: Speech backends and the text service client:
 *   - `providers::local`: Local engine driven through its command line
 *   - `providers::google`, `providers::fpt`, `providers::microsoft`: Remote TTS clients
 *   - `providers::gemini`: Translation client
 *   - `providers::mock`: In-memory backends for tests
 * - `playback`: Sessions, dispatch, scheduling and capture
 * - `translation`: Batched cue translation with retries
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod formatters;
pub mod language_utils;
pub mod playback;
pub mod providers;
pub mod subtitle_processor;
pub mod timeline;
pub mod translation;
pub mod voices;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, CaptureError, PlaybackError, ProviderError, TranslationError};
pub use formatters::ExportFormat;
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part3};
pub use playback::{BackendDispatcher, PlaybackMode, PlaybackScheduler, SessionOutcome, SpeechSession};
pub use subtitle_processor::{parse_subtitle, Cue, CueCollection, CueParser};
pub use timeline::{adjust_timings, AdjustmentResult, TimelineNormalizer};
pub use voices::{SpeakerConfig, SpeakerRoster, VoiceRef, VoiceRegistry};
