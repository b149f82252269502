/*!
 * Timecode conversion and timeline normalization.
 *
 * Subtitle editors reject overlapping or zero-length cues. The normalizer
 * performs a single forward pass that pushes colliding cues later and gives
 * invalid cues a default duration, changing as little as possible and never
 * reordering, adding or removing cues.
 */

use log::debug;

use crate::subtitle_processor::Cue;

/// Duration given to cues whose own duration is zero or negative
pub const DEFAULT_CUE_DURATION_SECS: f64 = 2.0;

/// Minimum gap enforced between consecutive cues unless configured otherwise
pub const DEFAULT_MINIMUM_GAP_MS: u64 = 1;

/// Convert an `HH:MM:SS,mmm` timecode to seconds.
///
/// Malformed input (wrong field count or a non-numeric field) yields `0.0`;
/// callers feeding untrusted text must validate it first.
pub fn to_seconds(timecode: &str) -> f64 {
    let parts: Vec<&str> = timecode.split(&[':', ','][..]).collect();
    if parts.len() != 4 {
        return 0.0;
    }

    let mut fields = [0u64; 4];
    for (slot, part) in fields.iter_mut().zip(parts.iter()) {
        match part.trim().parse::<u64>() {
            Ok(value) => *slot = value,
            Err(_) => return 0.0,
        }
    }

    let [hours, minutes, seconds, millis] = fields;
    let whole = hours
        .checked_mul(3600)
        .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
        .and_then(|hm| hm.checked_add(seconds));
    match whole {
        Some(whole) => whole as f64 + millis as f64 / 1000.0,
        None => 0.0,
    }
}

/// Convert seconds to an `HH:MM:SS,mmm` timecode.
///
/// The fractional millisecond is rounded half up; negative or non-finite input
/// encodes as `00:00:00,000`.
pub fn seconds_to_timecode(total_seconds: f64) -> String {
    if !total_seconds.is_finite() || total_seconds < 0.0 {
        return "00:00:00,000".to_string();
    }
    format_millis(to_millis(total_seconds))
}

/// Format whole milliseconds as `HH:MM:SS,mmm`
pub fn format_millis(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Snap a non-negative number of seconds to whole milliseconds
fn to_millis(seconds: f64) -> u64 {
    (seconds * 1000.0 + 0.5).floor().max(0.0) as u64
}

/// Outcome of one normalization pass
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustmentResult {
    /// Rewritten cues, same order and count as the input
    pub adjusted_cues: Vec<Cue>,
    /// Number of cues that needed any change
    pub adjustments_count: usize,
}

/// Configuration for the timeline normalizer
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Minimum gap between the end of a cue and the start of the next
    pub minimum_gap_ms: u64,
    /// Duration assigned to cues whose end is not after their start
    pub default_duration_secs: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            minimum_gap_ms: DEFAULT_MINIMUM_GAP_MS,
            default_duration_secs: DEFAULT_CUE_DURATION_SECS,
        }
    }
}

/// Repairs overlaps, invalid durations and sub-minimum gaps
#[derive(Debug, Clone, Default)]
pub struct TimelineNormalizer {
    config: NormalizerConfig,
}

impl TimelineNormalizer {
    /// Create a normalizer with the given configuration
    pub fn with_config(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Create a normalizer enforcing `minimum_gap_ms` with the default duration
    pub fn with_minimum_gap(minimum_gap_ms: u64) -> Self {
        Self::with_config(NormalizerConfig {
            minimum_gap_ms,
            ..Default::default()
        })
    }

    /// The active configuration
    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Run one normalization pass over `cues`.
    ///
    /// Times are read as seconds and compared at millisecond resolution so a
    /// timeline that already satisfies the invariants comes back unchanged.
    /// A cue that only needed to move keeps its original duration.
    pub fn adjust(&self, cues: &[Cue]) -> AdjustmentResult {
        let gap_ms = self.config.minimum_gap_ms;
        let default_duration_ms = to_millis(self.config.default_duration_secs).max(1);

        let mut adjusted_cues = Vec::with_capacity(cues.len());
        let mut adjustments_count = 0;
        let mut last_end_ms: u64 = 0;

        for cue in cues {
            let mut was_adjusted = false;

            let original_start_ms = to_millis(cue.start_seconds());
            let original_end_ms = to_millis(cue.end_seconds());

            let earliest_start_ms = last_end_ms + gap_ms;
            let start_ms = if original_start_ms < earliest_start_ms {
                was_adjusted = true;
                earliest_start_ms
            } else {
                original_start_ms
            };

            let duration_ms = if original_end_ms <= original_start_ms {
                was_adjusted = true;
                default_duration_ms
            } else {
                original_end_ms - original_start_ms
            };

            let end_ms = start_ms + duration_ms;

            let mut repaired = cue.clone();
            repaired.start_time = format_millis(start_ms);
            repaired.end_time = format_millis(end_ms);

            if was_adjusted {
                adjustments_count += 1;
                debug!(
                    "Adjusted cue {}: {} --> {} became {} --> {}",
                    cue.index, cue.start_time, cue.end_time, repaired.start_time, repaired.end_time
                );
            }

            adjusted_cues.push(repaired);
            last_end_ms = end_ms;
        }

        AdjustmentResult {
            adjusted_cues,
            adjustments_count,
        }
    }
}

/// Normalize `cues` with the default duration policy
pub fn adjust_timings(cues: &[Cue], minimum_gap_ms: u64) -> AdjustmentResult {
    TimelineNormalizer::with_minimum_gap(minimum_gap_ms).adjust(cues)
}
