//! Key signature parsing
//!
//! The generator writes keys as free text ("C Major", "F# minor", "Bbm").
//! Only the tonic and the mode matter here: they pick the closing chord
//! that final-measure enrichment writes into a truncated phrase ending.

use super::pitch::letter_offset;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tonic as spelled: a natural letter and a sharp/flat offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tonic {
    pub letter: char,
    /// -1 flat, 0 natural, +1 sharp
    pub accidental: i8,
}

impl Tonic {
    pub const fn natural(letter: char) -> Self {
        Tonic { letter, accidental: 0 }
    }

    /// Pitch class, C = 0
    pub fn semitone(&self) -> u8 {
        let offset = letter_offset(self.letter).unwrap_or(0) + self.accidental as i32;
        offset.rem_euclid(12) as u8
    }
}

impl fmt::Display for Tonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let accidental = match self.accidental {
            1 => "#",
            -1 => "b",
            _ => "",
        };
        write!(f, "{}{}", self.letter, accidental)
    }
}

impl FromStr for Tonic {
    type Err = String;

    /// `<letter>[#|b|♯|♭]`, letter case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let letter = chars
            .next()
            .map(|c| c.to_ascii_uppercase())
            .filter(|c| letter_offset(*c).is_some())
            .ok_or_else(|| format!("invalid tonic: {:?}", s))?;
        let accidental = match chars.as_str() {
            "" => 0,
            "#" | "♯" => 1,
            "b" | "♭" => -1,
            _ => return Err(format!("invalid tonic: {:?}", s)),
        };
        Ok(Tonic { letter, accidental })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
}

/// Tonic plus mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub tonic: Tonic,
    pub mode: Mode,
}

impl Key {
    pub const C_MAJOR: Key = Key {
        tonic: Tonic::natural('C'),
        mode: Mode::Major,
    };

    /// Parse free-form key text, `None` when no tonic can be found
    ///
    /// Handles "C Major", "f# minor", "Bb", "Am", "E♭ major".
    pub fn parse(text: &str) -> Option<Key> {
        let trimmed = text.trim();
        let mut words = trimmed.split_whitespace();
        let first = words.next()?;
        let rest = words.collect::<Vec<_>>().join(" ").to_lowercase();

        // Tonic is one letter, optionally followed by an accidental
        let letter_len = first.chars().next()?.len_utf8();
        let accidental_len = first[letter_len..]
            .chars()
            .next()
            .filter(|c| matches!(c, '#' | 'b' | '♯' | '♭'))
            .map_or(0, char::len_utf8);
        let (tonic_text, suffix) = first.split_at(letter_len + accidental_len);

        let tonic = tonic_text.parse::<Tonic>().ok()?;

        let suffix = suffix.to_lowercase();
        let mode = if rest.starts_with("min") || suffix == "m" || suffix.starts_with("min") {
            Mode::Minor
        } else {
            Mode::Major
        };

        Some(Key { tonic, mode })
    }

    /// Parse, defaulting to C major
    pub fn parse_or_default(text: &str) -> Key {
        Key::parse(text).unwrap_or_else(|| {
            log::warn!("unrecognized key signature {:?}; assuming C major", text);
            Key::C_MAJOR
        })
    }

    /// Semitones from tonic to third
    pub fn third_interval(&self) -> u8 {
        match self.mode {
            Mode::Major => 4,
            Mode::Minor => 3,
        }
    }

    /// Closing chord as MIDI numbers for bass, tenor, alto, soprano
    ///
    /// Tonic in octave 3, fifth above it, third in octave 4, tonic in
    /// octave 5.
    pub fn closing_chord(&self) -> [u8; 4] {
        let tonic = self.tonic.semitone();
        let bass = 48 + tonic;
        [bass, bass + 7, 60 + tonic + self.third_interval(), 72 + tonic]
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            Mode::Major => "major",
            Mode::Minor => "minor",
        };
        write!(f, "{} {}", self.tonic, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tonic(letter: char, accidental: i8) -> Tonic {
        Tonic { letter, accidental }
    }

    #[test]
    fn test_from_str_naturals_and_accidentals() {
        assert_eq!("C".parse::<Tonic>().unwrap(), Tonic::natural('C'));
        assert_eq!("f#".parse::<Tonic>().unwrap(), tonic('F', 1));
        assert_eq!("bb".parse::<Tonic>().unwrap(), tonic('B', -1));
        assert_eq!("E♭".parse::<Tonic>().unwrap(), tonic('E', -1));
        assert!("H".parse::<Tonic>().is_err());
        assert!("C##".parse::<Tonic>().is_err());
    }

    #[test]
    fn test_semitones_wrap() {
        assert_eq!(tonic('C', 1).semitone(), tonic('D', -1).semitone());
        assert_eq!(tonic('C', -1).semitone(), 11);
        assert_eq!(tonic('B', 1).semitone(), 0);
        assert_eq!(tonic('F', 1).to_string(), "F#");
    }

    #[test]
    fn test_parse_key_text() {
        assert_eq!(Key::parse("C Major"), Some(Key::C_MAJOR));
        assert_eq!(
            Key::parse("F# minor"),
            Some(Key { tonic: tonic('F', 1), mode: Mode::Minor })
        );
        assert_eq!(
            Key::parse("Bb major"),
            Some(Key { tonic: tonic('B', -1), mode: Mode::Major })
        );
        assert_eq!(Key::parse("Am"), Some(Key { tonic: Tonic::natural('A'), mode: Mode::Minor }));
        assert_eq!(Key::parse("g"), Some(Key { tonic: Tonic::natural('G'), mode: Mode::Major }));
        assert_eq!(Key::parse(""), None);
        assert_eq!(Key::parse("Lydian"), None);
    }

    #[test]
    fn test_parse_or_default() {
        assert_eq!(Key::parse_or_default("whatever"), Key::C_MAJOR);
    }

    #[test]
    fn test_closing_chord() {
        // C3 G3 E4 C5
        assert_eq!(Key::C_MAJOR.closing_chord(), [48, 55, 64, 72]);
        // A minor: A3 E4 C5 A5
        let a_minor = Key { tonic: Tonic::natural('A'), mode: Mode::Minor };
        assert_eq!(a_minor.closing_chord(), [57, 64, 72, 81]);
        // B major wraps to the B below middle C
        let b_major = Key { tonic: Tonic::natural('B'), mode: Mode::Major };
        assert_eq!(b_major.closing_chord()[0], 59);
    }
}
