use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for voice locales
///
/// Voices are tagged with BCP-47 style locales (`vi-VN`, `en-US`, `cmn-CN`)
/// while users type ISO 639 codes (`vi`, `vie`). These helpers reduce both to
/// a comparable ISO 639-3 code.

/// Locales the bundled voice catalogues and sample texts cover
pub const SUPPORTED_LOCALES: &[&str] = &[
    "vi-VN", "en-US", "ja-JP", "ko-KR", "es-ES", "fr-FR", "de-DE", "cmn-CN", "ru-RU", "hi-IN",
];

/// ISO 639-2/B codes that differ from their 639-2/T form
fn bibliographic_to_terminology(code: &str) -> Option<&'static str> {
    match code {
        "fre" => Some("fra"),
        "ger" => Some("deu"),
        "dut" => Some("nld"),
        "gre" => Some("ell"),
        "chi" => Some("zho"),
        "cze" => Some("ces"),
        "ice" => Some("isl"),
        "alb" => Some("sqi"),
        "arm" => Some("hye"),
        "baq" => Some("eus"),
        "bur" => Some("mya"),
        "per" => Some("fas"),
        "geo" => Some("kat"),
        "may" => Some("msa"),
        "mac" => Some("mkd"),
        "rum" => Some("ron"),
        "slo" => Some("slk"),
        "wel" => Some("cym"),
        _ => None,
    }
}

/// Primary language subtag of a locale (`vi-VN` -> `vi`, `en_us` -> `en`)
pub fn primary_subtag(locale: &str) -> String {
    locale
        .trim()
        .split(&['-', '_'][..])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Normalize a language code or locale to ISO 639-3
pub fn normalize_to_part3(code: &str) -> Result<String> {
    let primary = primary_subtag(code);

    let language = match primary.len() {
        2 => Language::from_639_1(&primary),
        3 => {
            let terminology = bibliographic_to_terminology(&primary).unwrap_or(primary.as_str());
            Language::from_639_3(terminology)
        }
        _ => None,
    };

    language
        .map(|lang| lang.to_639_3().to_string())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Check whether two codes or locales refer to the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part3(code1), normalize_to_part3(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// English name of a language code or locale
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part3(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Locale encoded at the front of a provider voice name.
///
/// `vi-VN-Standard-A` and `vi-VN-HoaiMyNeural` both yield `vi-VN`.
pub fn locale_of_voice_name(voice_name: &str) -> Option<String> {
    let mut parts = voice_name.splitn(3, '-');
    let language = parts.next()?;
    let region = parts.next()?;

    let language_ok = (2..=3).contains(&language.len()) && language.chars().all(|c| c.is_ascii_lowercase());
    let region_ok = region.len() == 2 && region.chars().all(|c| c.is_ascii_uppercase());

    if language_ok && region_ok {
        Some(format!("{}-{}", language, region))
    } else {
        None
    }
}
