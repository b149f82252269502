/*!
 * Voice catalogue, voice references and the speaker roster.
 *
 * A voice identifier is a string whose prefix names the backend that owns
 * it. Identifiers are turned into a [`VoiceRef`] once, when a session is
 * configured, so the dispatcher never inspects strings again.
 */

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::language_utils;

/// Prefix of caller-registered custom (cloned) voices
pub const CUSTOM_VOICE_PREFIX: &str = "custom-";

/// Prefix of FPT.AI voices
pub const FPT_VOICE_PREFIX: &str = "fpt-";

/// Prefix of Microsoft Azure voices
pub const MICROSOFT_VOICE_PREFIX: &str = "microsoft-";

/// Locale prefixes that identify Google Cloud voices
pub const GOOGLE_VOICE_PREFIXES: &[&str] = &["vi-VN-", "en-US-", "ja-JP-"];

/// Remote speech providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Google,
    Fpt,
    Microsoft,
}

impl ProviderId {
    /// Every remote provider
    pub const ALL: [ProviderId; 3] = [ProviderId::Google, ProviderId::Fpt, ProviderId::Microsoft];

    // @returns: Human readable provider name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Google => "Google Cloud TTS",
            Self::Fpt => "FPT.AI",
            Self::Microsoft => "Microsoft Azure TTS",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Fpt => "fpt",
            Self::Microsoft => "microsoft",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "fpt" => Ok(Self::Fpt),
            "microsoft" | "azure" => Ok(Self::Microsoft),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Voice gender as advertised by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Neutral,
}

/// Which backend family a voice belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceBackend {
    Local,
    Remote(ProviderId),
    Custom,
}

/// Voice descriptor shown to the user
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    /// Identifier, namespaced by backend
    pub id: String,
    /// Display name
    pub name: String,
    /// Advertised gender
    pub gender: Gender,
    /// Locale or language code of the voice
    pub language: String,
    /// Owning backend
    pub backend: VoiceBackend,
}

impl Voice {
    fn remote(provider: ProviderId, id: &str, name: &str, gender: Gender, language: &str) -> Self {
        Voice {
            id: id.to_string(),
            name: name.to_string(),
            gender,
            language: language.to_string(),
            backend: VoiceBackend::Remote(provider),
        }
    }
}

/// A voice identifier resolved to the backend that speaks it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceRef {
    /// Local engine voice, by engine handle
    Local(String),
    /// Remote provider voice, by provider-native name
    Remote(ProviderId, String),
    /// Custom voice rendered by the local engine with the given base voice
    Custom(Option<String>),
}

impl VoiceRef {
    /// Resolve a voice identifier by its namespace prefix.
    ///
    /// Unrecognized identifiers are treated as local engine handles. An empty
    /// identifier resolves to nothing. Custom voices carry no base voice here;
    /// [`VoiceRegistry::resolve`] picks one from the local engine.
    pub fn parse(voice_id: &str) -> Option<Self> {
        let voice_id = voice_id.trim();
        if voice_id.is_empty() {
            return None;
        }

        if voice_id.starts_with(CUSTOM_VOICE_PREFIX) {
            return Some(Self::Custom(None));
        }
        if let Some(name) = voice_id.strip_prefix(FPT_VOICE_PREFIX) {
            return Some(Self::Remote(ProviderId::Fpt, name.to_string()));
        }
        if let Some(name) = voice_id.strip_prefix(MICROSOFT_VOICE_PREFIX) {
            return Some(Self::Remote(ProviderId::Microsoft, name.to_string()));
        }
        if GOOGLE_VOICE_PREFIXES.iter().any(|prefix| voice_id.starts_with(prefix)) {
            return Some(Self::Remote(ProviderId::Google, voice_id.to_string()));
        }

        Some(Self::Local(voice_id.to_string()))
    }

    /// Display name of the backend this voice routes to
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Local(_) => "Local engine",
            Self::Remote(provider, _) => provider.display_name(),
            Self::Custom(_) => "Custom voice",
        }
    }
}

impl fmt::Display for VoiceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(handle) => write!(f, "local:{}", handle),
            Self::Remote(provider, name) => write!(f, "{}:{}", provider, name),
            Self::Custom(base) => write!(f, "custom:{}", base.as_deref().unwrap_or("default")),
        }
    }
}

/// Maps a speaker label to a voice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerConfig {
    /// Stable roster id
    pub id: u32,
    /// Speaker label as it appears in the subtitle text
    pub speaker_name: String,
    /// Voice identifier, empty when unassigned
    #[serde(default)]
    pub voice_id: String,
}

impl SpeakerConfig {
    pub fn new(id: u32, speaker_name: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            id,
            speaker_name: speaker_name.into(),
            voice_id: voice_id.into(),
        }
    }
}

/// Editable list of speakers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeakerRoster {
    speakers: Vec<SpeakerConfig>,
}

impl SpeakerRoster {
    pub fn new(speakers: Vec<SpeakerConfig>) -> Self {
        Self { speakers }
    }

    /// Roster entries in display order
    pub fn speakers(&self) -> &[SpeakerConfig] {
        &self.speakers
    }

    pub fn len(&self) -> usize {
        self.speakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }

    /// Add a speaker named "Speaker A", "Speaker B", ... using `default_voice`
    pub fn add_speaker(&mut self, default_voice: Option<&str>) -> &SpeakerConfig {
        let id = self.speakers.iter().map(|s| s.id).max().map_or(1, |max| max + 1);
        let letter = (b'A' + (self.speakers.len() % 26) as u8) as char;
        self.speakers.push(SpeakerConfig::new(
            id,
            format!("Speaker {}", letter),
            default_voice.unwrap_or_default(),
        ));
        &self.speakers[self.speakers.len() - 1]
    }

    /// Add a speaker for every label that is not in the roster yet
    pub fn add_missing(&mut self, labels: &[String], default_voice: Option<&str>) -> usize {
        let mut added = 0;
        for label in labels {
            if !self.speakers.iter().any(|s| &s.speaker_name == label) {
                let id = self.speakers.iter().map(|s| s.id).max().map_or(1, |max| max + 1);
                self.speakers.push(SpeakerConfig::new(id, label.clone(), default_voice.unwrap_or_default()));
                added += 1;
            }
        }
        added
    }

    /// Remove a speaker; the last remaining speaker cannot be removed
    pub fn remove_speaker(&mut self, id: u32) -> bool {
        if self.speakers.len() <= 1 {
            return false;
        }
        let before = self.speakers.len();
        self.speakers.retain(|s| s.id != id);
        self.speakers.len() != before
    }

    /// Rename a speaker
    pub fn rename(&mut self, id: u32, speaker_name: impl Into<String>) -> bool {
        match self.speakers.iter_mut().find(|s| s.id == id) {
            Some(speaker) => {
                speaker.speaker_name = speaker_name.into();
                true
            }
            None => false,
        }
    }

    /// Assign a voice to a speaker
    pub fn set_voice(&mut self, id: u32, voice_id: impl Into<String>) -> bool {
        match self.speakers.iter_mut().find(|s| s.id == id) {
            Some(speaker) => {
                speaker.voice_id = voice_id.into();
                true
            }
            None => false,
        }
    }

    /// Re-validate voice assignments against a new voice list.
    ///
    /// Unknown or empty assignments move to the first available voice; with
    /// no voices at all every assignment is cleared. Returns whether anything
    /// changed.
    pub fn reconcile(&mut self, voices: &[Voice]) -> bool {
        let mut changed = false;
        match voices.first() {
            Some(fallback) => {
                for speaker in &mut self.speakers {
                    let known = !speaker.voice_id.is_empty() && voices.iter().any(|v| v.id == speaker.voice_id);
                    if !known {
                        speaker.voice_id = fallback.id.clone();
                        changed = true;
                    }
                }
            }
            None => {
                for speaker in &mut self.speakers {
                    if !speaker.voice_id.is_empty() {
                        speaker.voice_id.clear();
                        changed = true;
                    }
                }
            }
        }
        changed
    }
}

/// Bundled Google Cloud voices
fn google_voices() -> Vec<Voice> {
    use Gender::*;
    [
        ("vi-VN-Standard-A", "Google Standard A (Female)", Female),
        ("vi-VN-Standard-B", "Google Standard B (Male)", Male),
        ("vi-VN-Standard-C", "Google Standard C (Female)", Female),
        ("vi-VN-Standard-D", "Google Standard D (Male)", Male),
        ("vi-VN-Wavenet-A", "Google Wavenet A (Female)", Female),
        ("vi-VN-Wavenet-B", "Google Wavenet B (Male)", Male),
        ("vi-VN-Wavenet-C", "Google Wavenet C (Female)", Female),
        ("vi-VN-Wavenet-D", "Google Wavenet D (Male)", Male),
    ]
    .iter()
    .map(|(id, name, gender)| Voice::remote(ProviderId::Google, id, name, *gender, "vi-VN"))
    .collect()
}

/// Bundled FPT.AI voices
fn fpt_voices() -> Vec<Voice> {
    use Gender::*;
    [
        ("fpt-leminh", "Le Minh (Male, Northern)", Male),
        ("fpt-banmai", "Ban Mai (Female, Northern)", Female),
        ("fpt-giahuy", "Gia Huy (Male, Southern)", Male),
        ("fpt-myan", "My An (Female, Southern)", Female),
        ("fpt-lientrang", "Lien Trang (Female, Central)", Female),
        ("fpt-thuminh", "Thu Minh (Female, Central)", Female),
    ]
    .iter()
    .map(|(id, name, gender)| Voice::remote(ProviderId::Fpt, id, name, *gender, "vi-VN"))
    .collect()
}

/// Bundled Microsoft Azure voices
fn microsoft_voices() -> Vec<Voice> {
    vec![
        Voice::remote(ProviderId::Microsoft, "microsoft-vi-VN-HoaiMyNeural", "Microsoft Hoai My (Female)", Gender::Female, "vi-VN"),
        Voice::remote(ProviderId::Microsoft, "microsoft-vi-VN-NamMinhNeural", "Microsoft Nam Minh (Male)", Gender::Male, "vi-VN"),
    ]
}

/// Catalogue of every voice the dispatcher can route to
#[derive(Debug, Clone)]
pub struct VoiceRegistry {
    local: Vec<Voice>,
    custom: Vec<Voice>,
    custom_base_language: String,
}

impl Default for VoiceRegistry {
    fn default() -> Self {
        Self::new(Vec::new(), "vi")
    }
}

impl VoiceRegistry {
    /// Create a registry over the local engine's voices
    pub fn new(local: Vec<Voice>, custom_base_language: impl Into<String>) -> Self {
        Self {
            local,
            custom: Vec::new(),
            custom_base_language: custom_base_language.into(),
        }
    }

    /// Register a custom (cloned) voice; the id is namespaced if needed
    pub fn register_custom(&mut self, id: &str, name: &str) -> &Voice {
        let id = if id.starts_with(CUSTOM_VOICE_PREFIX) {
            id.to_string()
        } else {
            format!("{}{}", CUSTOM_VOICE_PREFIX, id)
        };
        self.custom.retain(|v| v.id != id);
        self.custom.push(Voice {
            id,
            name: name.to_string(),
            gender: Gender::Neutral,
            language: self.custom_base_language.clone(),
            backend: VoiceBackend::Custom,
        });
        &self.custom[self.custom.len() - 1]
    }

    /// Voices of the local engine
    pub fn local_voices(&self) -> &[Voice] {
        &self.local
    }

    /// Bundled voices of one remote provider
    pub fn provider_voices(provider: ProviderId) -> Vec<Voice> {
        match provider {
            ProviderId::Google => google_voices(),
            ProviderId::Fpt => fpt_voices(),
            ProviderId::Microsoft => microsoft_voices(),
        }
    }

    /// Every known voice, local first
    pub fn all(&self) -> Vec<Voice> {
        let mut voices = self.local.clone();
        for provider in ProviderId::ALL {
            voices.extend(Self::provider_voices(provider));
        }
        voices.extend(self.custom.iter().cloned());
        voices
    }

    /// Voices for a language (`vi`, `vi-VN`), optionally limited to one backend
    pub fn voices_for(&self, language: &str, backend: Option<VoiceBackend>) -> Vec<Voice> {
        self.all()
            .into_iter()
            .filter(|voice| backend.is_none_or(|wanted| voice.backend == wanted))
            .filter(|voice| language_utils::language_codes_match(&voice.language, language))
            .collect()
    }

    /// Look up a voice by id
    pub fn find(&self, voice_id: &str) -> Option<Voice> {
        self.all().into_iter().find(|voice| voice.id == voice_id)
    }

    /// Local voice used to render custom voices: the configured language
    /// first, otherwise the engine's first voice.
    pub fn custom_base_voice(&self) -> Option<&Voice> {
        self.local
            .iter()
            .find(|voice| language_utils::language_codes_match(&voice.language, &self.custom_base_language))
            .or_else(|| self.local.first())
    }

    /// Resolve a voice identifier, filling in the custom base voice
    pub fn resolve(&self, voice_id: &str) -> Option<VoiceRef> {
        match VoiceRef::parse(voice_id)? {
            VoiceRef::Custom(_) => Some(VoiceRef::Custom(self.custom_base_voice().map(|v| v.id.clone()))),
            other => Some(other),
        }
    }
}
