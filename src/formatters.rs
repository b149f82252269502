/*!
 * Subtitle exporters.
 *
 * Turns cues back into text formats:
 * - SRT (SubRip)
 * - ASS (Advanced SubStation Alpha) with a fixed default style
 * - Plain text, one line per cue
 * - Narration script with per-cue headers for voice-over work
 */

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};

use crate::subtitle_processor::Cue;

const ASS_HEADER: &str = "[Script Info]
Title: Generated Subtitles
ScriptType: v4.00+
WrapStyle: 0
PlayResX: 1920
PlayResY: 1080
ScaledBorderAndShadow: yes

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: Default,Arial,48,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,2,2,2,10,10,10,1

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

const SCRIPT_RULE: &str = "===================================";

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Srt,
    Ass,
    Txt,
    Script,
}

impl ExportFormat {
    /// File extension used when writing this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Ass => "ass",
            Self::Txt => "txt",
            Self::Script => "script.txt",
        }
    }

    /// Render `cues` in this format
    pub fn render(&self, cues: &[Cue], source_name: &str) -> String {
        match self {
            Self::Srt => to_srt(cues),
            Self::Ass => to_ass(cues),
            Self::Txt => to_txt(cues),
            Self::Script => to_script(cues, source_name),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Srt => "srt",
            Self::Ass => "ass",
            Self::Txt => "txt",
            Self::Script => "script",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "srt" => Ok(Self::Srt),
            "ass" | "ssa" => Ok(Self::Ass),
            "txt" | "text" => Ok(Self::Txt),
            "script" => Ok(Self::Script),
            _ => Err(anyhow!("Unsupported export format: {}", s)),
        }
    }
}

fn labeled_text(cue: &Cue) -> String {
    match &cue.speaker {
        Some(speaker) => format!("{}: {}", speaker, cue.text),
        None => cue.text.clone(),
    }
}

/// Render cues as SRT, speaker labels folded back into the text
pub fn to_srt(cues: &[Cue]) -> String {
    cues.iter()
        .map(|cue| format!("{}\n{} --> {}\n{}", cue.index, cue.start_time, cue.end_time, labeled_text(cue)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Convert `00:00:01,234` to the ASS form `0:00:01.23`.
///
/// Centiseconds are the first two millisecond digits, not a rounded value.
fn srt_time_to_ass(srt_time: &str) -> String {
    let (hms, ms) = srt_time.split_once(',').unwrap_or((srt_time, "000"));
    let mut fields = hms.splitn(3, ':');
    let hours = fields.next().unwrap_or("0");
    let minutes = fields.next().unwrap_or("00");
    let seconds = fields.next().unwrap_or("00");
    let hours = hours.parse::<u64>().unwrap_or(0);
    let centiseconds: String = ms.chars().take(2).collect();

    format!("{}:{}:{}.{:0<2}", hours, minutes, seconds, centiseconds)
}

/// Render cues as an ASS script with one `Dialogue` event per cue
pub fn to_ass(cues: &[Cue]) -> String {
    let events = cues
        .iter()
        .map(|cue| {
            let start = srt_time_to_ass(&cue.start_time);
            let end = srt_time_to_ass(&cue.end_time);
            let speaker = cue.speaker.as_deref().unwrap_or("");
            let text = cue.text.replace('\n', "\\N");
            format!("Dialogue: 0,{},{},Default,{},0,0,0,,{}", start, end, speaker, text)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("{}\n{}", ASS_HEADER, events)
}

/// Render cues as plain text, one line per cue
pub fn to_txt(cues: &[Cue]) -> String {
    cues.iter()
        .map(labeled_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render cues as a voice-over script
pub fn to_script(cues: &[Cue], file_name: &str) -> String {
    let header = format!(
        "DUBBING SCRIPT\n\nSource file: {}\nTotal lines: {}\n{}\n\n",
        file_name,
        cues.len(),
        SCRIPT_RULE
    );

    let body = cues
        .iter()
        .map(|cue| {
            let speaker_line = match &cue.speaker {
                Some(speaker) => format!("Speaker: {}", speaker),
                None => "Speaker: (Default)".to_string(),
            };
            format!(
                "[Line {}]\nTime: {} --> {}\n{}\nText: {}\n",
                cue.index,
                cue.start_time,
                cue.end_time,
                speaker_line,
                cue.text.replace('\n', " ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    header + &body
}
