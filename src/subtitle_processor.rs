use std::fmt;
use std::path::{Path, PathBuf};
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context};
use log::{debug, warn};

use crate::file_utils::FileManager;
use crate::timeline;

// @module: Subtitle cue parsing

// @const: Timestamp arrow line, either separator accepted
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}:\d{2}:\d{2}[,.]\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2}[,.]\d{3})").unwrap()
});

// @const: One or more blank lines between blocks
static BLOCK_SEPARATOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n(?:[ \t]*\n)+").unwrap()
});

// @const: Bare non-negative integer index line
static INDEX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+$").unwrap()
});

// @const: "Name: dialogue" label heuristic
static SPEAKER_LABEL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^([A-Za-z0-9 _-]+):\s*(.+)").unwrap()
});

// @struct: Single subtitle cue
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    // @field: Declared (or synthesized) 1-based sequence number
    pub index: usize,

    // @field: Start timecode, HH:MM:SS,mmm
    pub start_time: String,

    // @field: End timecode, HH:MM:SS,mmm
    pub end_time: String,

    // @field: Dialogue text, may span several lines
    pub text: String,

    // @field: Speaker label if one was detected
    pub speaker: Option<String>,
}

impl Cue {
    /// Creates a cue without a speaker label
    pub fn new(index: usize, start_time: impl Into<String>, end_time: impl Into<String>, text: impl Into<String>) -> Self {
        Cue {
            index,
            start_time: start_time.into(),
            end_time: end_time.into(),
            text: text.into(),
            speaker: None,
        }
    }

    /// Attach a speaker label
    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    /// Start time in seconds (0 for a malformed timecode)
    pub fn start_seconds(&self) -> f64 {
        timeline::to_seconds(&self.start_time)
    }

    /// End time in seconds (0 for a malformed timecode)
    pub fn end_seconds(&self) -> f64 {
        timeline::to_seconds(&self.end_time)
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(f, "{} --> {}", self.start_time, self.end_time)?;
        match &self.speaker {
            Some(speaker) => writeln!(f, "{}: {}", speaker, self.text),
            None => writeln!(f, "{}", self.text),
        }
    }
}

/// Result of running a speaker extractor over cue text
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerSplit {
    /// Detected speaker, if any
    pub speaker: Option<String>,
    /// Remaining dialogue text
    pub text: String,
}

/// Strategy for pulling a speaker label out of dialogue text.
///
/// The parser only deals with block structure and timestamps; deciding who
/// speaks a line is delegated to an implementation of this trait so other
/// strategies (explicit tags, diarization output) can be plugged in.
pub trait SpeakerExtractor: Send + Sync + fmt::Debug {
    /// Split `text` into an optional speaker and the dialogue
    fn extract(&self, text: &str) -> SpeakerSplit;
}

/// Treats a leading `Name:` as a speaker label.
///
/// This is a heuristic: any leading run of letters, digits, spaces, `_` or `-`
/// followed by a colon is taken as a label, so dialogue such as
/// `Note: the door is open` yields the speaker `Note`. Names with non-ASCII
/// letters are not recognized.
#[derive(Debug, Default, Clone)]
pub struct LabelPrefixExtractor;

impl SpeakerExtractor for LabelPrefixExtractor {
    fn extract(&self, text: &str) -> SpeakerSplit {
        if let Some(caps) = SPEAKER_LABEL_REGEX.captures(text) {
            let speaker = caps.get(1).map_or("", |m| m.as_str()).trim();
            let dialogue = caps.get(2).map_or("", |m| m.as_str()).trim();
            if !speaker.is_empty() && !dialogue.is_empty() {
                return SpeakerSplit {
                    speaker: Some(speaker.to_string()),
                    text: dialogue.to_string(),
                };
            }
        }

        SpeakerSplit {
            speaker: None,
            text: text.to_string(),
        }
    }
}

/// Leaves the text untouched and never assigns a speaker
#[derive(Debug, Default, Clone)]
pub struct NoSpeakerExtractor;

impl SpeakerExtractor for NoSpeakerExtractor {
    fn extract(&self, text: &str) -> SpeakerSplit {
        SpeakerSplit {
            speaker: None,
            text: text.to_string(),
        }
    }
}

/// Lenient SRT-like cue parser.
///
/// Blocks that cannot be parsed (fewer than two lines, a non-numeric index,
/// no timestamp arrow) are dropped without an error; everything else becomes a
/// [`Cue`] in source order.
#[derive(Debug)]
pub struct CueParser {
    extractor: Box<dyn SpeakerExtractor>,
}

impl Default for CueParser {
    fn default() -> Self {
        Self::new(Box::new(LabelPrefixExtractor))
    }
}

impl CueParser {
    /// Create a parser with a specific speaker extraction strategy
    pub fn new(extractor: Box<dyn SpeakerExtractor>) -> Self {
        Self { extractor }
    }

    /// Parse raw subtitle text into cues
    pub fn parse(&self, content: &str) -> Vec<Cue> {
        let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
        let normalized = normalized.trim();
        let mut cues: Vec<Cue> = Vec::new();
        let mut skipped = 0usize;

        if normalized.is_empty() {
            return cues;
        }

        for block in BLOCK_SEPARATOR_REGEX.split(normalized) {
            match self.parse_block(block, cues.len()) {
                Some(cue) => cues.push(cue),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!("Dropped {} unparseable subtitle block(s)", skipped);
        }

        cues
    }

    fn parse_block(&self, block: &str, parsed_so_far: usize) -> Option<Cue> {
        let lines: Vec<&str> = block.split('\n').collect();
        if lines.len() < 2 {
            return None;
        }

        // A block may start directly with its timestamp line
        let (index_line, time_line, text_lines) = if TIMESTAMP_REGEX.is_match(lines[0]) {
            (None, lines[0], &lines[1..])
        } else {
            (Some(lines[0].trim()), lines[1], &lines[2..])
        };

        let index = match index_line {
            None => parsed_so_far + 1,
            Some(line) => {
                if !INDEX_REGEX.is_match(line) {
                    return None;
                }
                line.parse::<usize>().ok()?
            }
        };

        let caps = TIMESTAMP_REGEX.captures(time_line)?;
        let start_time = caps.get(1)?.as_str().replace('.', ",");
        let end_time = caps.get(2)?.as_str().replace('.', ",");

        let raw_text = text_lines.join("\n");
        let split = self.extractor.extract(raw_text.trim());

        Some(Cue {
            index,
            start_time,
            end_time,
            text: split.text,
            speaker: split.speaker,
        })
    }
}

/// Parse subtitle text with the default speaker heuristic
pub fn parse_subtitle(content: &str) -> Vec<Cue> {
    CueParser::default().parse(content)
}

/// Collection of cues with the file they came from
#[derive(Debug, Clone)]
pub struct CueCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// Parsed cues in source order
    pub cues: Vec<Cue>,
}

impl CueCollection {
    /// Create an empty collection
    pub fn new(source_file: PathBuf) -> Self {
        CueCollection {
            source_file,
            cues: Vec::new(),
        }
    }

    /// Read and parse a subtitle file
    pub fn load<P: AsRef<Path>>(path: P, parser: &CueParser) -> Result<Self> {
        let path = path.as_ref();
        let content = FileManager::read_to_string(path)
            .with_context(|| format!("Failed to load subtitle file: {}", path.display()))?;
        let cues = parser.parse(&content);

        if cues.is_empty() {
            warn!("No subtitle cues could be parsed from {}", path.display());
        } else {
            debug!("Parsed {} cue(s) from {}", cues.len(), path.display());
        }

        Ok(CueCollection {
            source_file: path.to_path_buf(),
            cues,
        })
    }

    /// Distinct speaker labels in order of first appearance
    pub fn speakers(&self) -> Vec<String> {
        let mut speakers: Vec<String> = Vec::new();
        for cue in &self.cues {
            if let Some(speaker) = &cue.speaker {
                if !speakers.iter().any(|s| s == speaker) {
                    speakers.push(speaker.clone());
                }
            }
        }
        speakers
    }

    /// File name of the source, for headers and reports
    pub fn source_name(&self) -> String {
        self.source_file
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| String::from("Unknown file"))
    }
}

impl fmt::Display for CueCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Collection")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Cues: {}", self.cues.len())?;
        writeln!(f, "Speakers: {}", self.speakers().join(", "))?;
        Ok(())
    }
}
