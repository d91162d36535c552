//! Pitch tokens and their resolution to MIDI note numbers
//!
//! Melodic voices use letter names (`C4`, `Bb3`, `F#5`); percussion uses
//! General MIDI drum-map numbers (`"38"`). The older float-based schema
//! sent bare MIDI integers for every voice, so integers are accepted too.

use super::voice::Voice;
use crate::error::{RenderError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sharp spellings used when naming a MIDI number
const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Octave assumed when a letter name has no octave digits
pub const DEFAULT_OCTAVE: i32 = 4;

/// Pitch as it arrives from the generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PitchToken {
    Name(String),
    Number(i64),
}

impl fmt::Display for PitchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PitchToken::Name(name) => write!(f, "{}", name),
            PitchToken::Number(number) => write!(f, "{}", number),
        }
    }
}

impl From<&str> for PitchToken {
    fn from(value: &str) -> Self {
        PitchToken::Name(value.to_string())
    }
}

/// Resolve an optional token for a voice
///
/// `None` is a rest and resolves to `Ok(None)` without any range check.
pub fn resolve_pitch(voice: Voice, token: Option<&PitchToken>) -> Result<Option<u8>> {
    match token {
        None => Ok(None),
        Some(token) => resolve_token(voice, token).map(Some),
    }
}

/// Resolve a token to a MIDI note number in 0..=127
pub fn resolve_token(voice: Voice, token: &PitchToken) -> Result<u8> {
    match token {
        PitchToken::Number(number) => check_range(&token.to_string(), *number),
        PitchToken::Name(name) if voice.is_percussion() => parse_drum_code(name),
        PitchToken::Name(name) => parse_note_name(name),
    }
}

fn check_range(token: &str, value: i64) -> Result<u8> {
    if (0..=127).contains(&value) {
        Ok(value as u8)
    } else {
        Err(RenderError::invalid_pitch(
            token,
            format!("{} is outside the MIDI range 0-127", value),
        ))
    }
}

/// Percussion codes are plain decimal integers
fn parse_drum_code(token: &str) -> Result<u8> {
    let trimmed = token.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(RenderError::invalid_pitch(
            token,
            "percussion expects a numeric drum-map code",
        ));
    }
    let value: i64 = trimmed
        .parse()
        .map_err(|_| RenderError::invalid_pitch(token, "drum-map code is out of range"))?;
    check_range(token, value)
}

/// Semitone offset of a natural note letter from C
pub(crate) fn letter_offset(letter: char) -> Option<i32> {
    match letter.to_ascii_uppercase() {
        'C' => Some(0),
        'D' => Some(2),
        'E' => Some(4),
        'F' => Some(5),
        'G' => Some(7),
        'A' => Some(9),
        'B' => Some(11),
        _ => None,
    }
}

/// Parse `<letter>[#|b][octave]` into a MIDI number
///
/// `12 * (octave + 1) + offset(letter) + accidental`, so C4 = 60.
pub fn parse_note_name(token: &str) -> Result<u8> {
    let trimmed = token.trim();
    let mut chars = trimmed.chars();

    let letter = chars
        .next()
        .ok_or_else(|| RenderError::invalid_pitch(token, "empty pitch name"))?;
    let offset = letter_offset(letter).ok_or_else(|| {
        RenderError::invalid_pitch(token, format!("unknown note letter '{}'", letter))
    })?;

    let rest = chars.as_str();
    let (accidental, octave_text) = match rest.chars().next() {
        Some(c @ ('#' | '♯')) => (1, &rest[c.len_utf8()..]),
        Some(c @ ('b' | '♭')) => (-1, &rest[c.len_utf8()..]),
        _ => (0, rest),
    };

    let octave = if octave_text.is_empty() {
        DEFAULT_OCTAVE
    } else {
        let digits = octave_text.strip_prefix('-').unwrap_or(octave_text);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(RenderError::invalid_pitch(
                token,
                format!("invalid octave '{}'", octave_text),
            ));
        }
        octave_text
            .parse::<i32>()
            .map_err(|_| RenderError::invalid_pitch(token, "octave out of range"))?
    };

    let value = 12 * (octave as i64 + 1) + offset as i64 + accidental as i64;
    check_range(token, value)
}

/// Name a MIDI number with sharps (60 -> "C4")
pub fn pitch_name(midi: u8) -> String {
    let octave = (midi / 12) as i32 - 1;
    format!("{}{}", NOTE_NAMES[(midi % 12) as usize], octave)
}
