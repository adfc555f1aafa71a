//! Voice catalog: canonical speaker names and their friendly aliases.

use std::collections::HashSet;

/// Alias → canonical speaker
pub const VOICE_ALIASES: &[(&str, &str)] = &[
    ("custom_female", "vivian"),
    ("default_female", "vivian"),
    ("female", "vivian"),
    ("warm_female", "serena"),
    ("storyteller", "serena"),
    ("narrator", "serena"),
    ("custom_male", "aiden"),
    ("default_male", "aiden"),
    ("male", "aiden"),
    ("english_male", "ryan"),
];

/// Speakers the custom-voice checkpoints ship with
pub const SUPPORTED_SPEAKERS: &[&str] = &[
    "vivian", "serena", "uncle_fu", "dylan", "eric", "ryan", "aiden", "ono_anna", "sohee",
];

/// Normalize a requested voice: trim, lowercase, resolve aliases.
///
/// Blank input yields `None`.
pub fn canonical_voice_name(name: Option<&str>) -> Option<String> {
    let trimmed = name?.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lowered = trimmed.to_lowercase();
    let mapped = VOICE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, target)| target.to_string())
        .unwrap_or(lowered);
    Some(mapped)
}

/// Canonicalize a list of voices, dropping blanks and duplicates but keeping order
pub fn canonicalize_voice_list<S: AsRef<str>>(voices: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    for voice in voices {
        if let Some(canonical) = canonical_voice_name(Some(voice.as_ref())) {
            if seen.insert(canonical.clone()) {
                ordered.push(canonical);
            }
        }
    }
    ordered
}

/// Append every alias whose target is already in the list
pub fn augment_with_aliases(voices: Vec<String>) -> Vec<String> {
    let mut combined: Vec<String> = voices.into_iter().filter(|v| !v.is_empty()).collect();
    let present: HashSet<String> = combined.iter().cloned().collect();
    for (alias, target) in VOICE_ALIASES {
        if present.contains(*target) && !present.contains(*alias) {
            combined.push(alias.to_string());
        }
    }
    combined
}

/// Pick the speaker for a request.
///
/// An explicit voice wins; otherwise the first known voice, then the first
/// fallback, then the first supported speaker.
pub fn resolve_speaker(requested: Option<&str>, known: &[String], fallback: &[String]) -> String {
    canonical_voice_name(requested)
        .or_else(|| known.first().cloned())
        .or_else(|| fallback.first().cloned())
        .unwrap_or_else(|| SUPPORTED_SPEAKERS[0].to_string())
}
