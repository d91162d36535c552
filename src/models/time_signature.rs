//! Time signature parsing and the beats-per-measure quantity derived from it

use super::duration::{beats, Rational};
use crate::error::RenderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numerators above this are treated as garbage rather than a meter
const MAX_NUMERATOR: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

impl TimeSignature {
    /// Fallback used whenever the signature cannot be parsed
    pub const COMMON: TimeSignature = TimeSignature {
        numerator: 4,
        denominator: 4,
    };

    /// Parse, falling back to 4/4
    ///
    /// Returns the signature and whether the fallback was used.
    pub fn parse_or_default(text: &str) -> (TimeSignature, bool) {
        match text.parse::<TimeSignature>() {
            Ok(ts) => (ts, false),
            Err(err) => {
                log::warn!("{}; falling back to 4/4", err);
                (TimeSignature::COMMON, true)
            }
        }
    }

    /// Length of one measure in beats: `numerator * 4 / denominator`
    pub fn beats_per_measure(&self) -> Rational {
        Rational::new(self.numerator as i64 * 4, self.denominator as i64)
    }

    /// Integer number of beat slots per measure (nearest integer, at least 1)
    pub fn beat_slots(&self) -> usize {
        let rounded = self.beats_per_measure().round().to_integer();
        rounded.max(1) as usize
    }

    /// Denominator as a power of two, as SMF time signature events want it
    pub fn denominator_power(&self) -> u8 {
        self.denominator.trailing_zeros() as u8
    }

    /// Beats left in a measure from a given beat slot
    pub fn beats_remaining(&self, beat_index: usize) -> Rational {
        self.beats_per_measure() - beats(beat_index as i64)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature::COMMON
    }
}

impl FromStr for TimeSignature {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || RenderError::MalformedTimeSignature(s.to_string());

        let (num, den) = s.trim().split_once('/').ok_or_else(malformed)?;
        let numerator: u32 = num.trim().parse().map_err(|_| malformed())?;
        let denominator: u32 = den.trim().parse().map_err(|_| malformed())?;

        if numerator == 0 || numerator > MAX_NUMERATOR {
            return Err(malformed());
        }
        if denominator == 0 || !denominator.is_power_of_two() || denominator > 64 {
            return Err(malformed());
        }

        Ok(TimeSignature {
            numerator,
            denominator,
        })
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_common_meters() {
        let ts: TimeSignature = "3/4".parse().unwrap();
        assert_eq!(ts.beats_per_measure(), beats(3));
        assert_eq!(ts.beat_slots(), 3);

        let ts: TimeSignature = "6/8".parse().unwrap();
        assert_eq!(ts.beats_per_measure(), beats(3));
        assert_eq!(ts.denominator_power(), 3);

        let ts: TimeSignature = " 2/2 ".parse().unwrap();
        assert_eq!(ts.beats_per_measure(), beats(4));
    }

    #[test]
    fn test_fractional_meter() {
        let ts: TimeSignature = "5/8".parse().unwrap();
        assert_eq!(ts.beats_per_measure(), Rational::new(5, 2));
        assert_eq!(ts.beat_slots(), 3);
        assert_eq!(ts.beats_remaining(2), Rational::new(1, 2));
    }

    #[test]
    fn test_malformed_signatures() {
        for bad in ["", "4", "four/four", "0/4", "4/0", "4/3", "4/-4", "100/4"] {
            assert!(
                matches!(bad.parse::<TimeSignature>(), Err(RenderError::MalformedTimeSignature(_))),
                "{:?} should be malformed",
                bad
            );
        }
    }

    #[test]
    fn test_parse_or_default() {
        assert_eq!(TimeSignature::parse_or_default("3/4"), ("3/4".parse::<TimeSignature>().unwrap(), false));
        let (ts, fell_back) = TimeSignature::parse_or_default("waltz");
        assert!(fell_back);
        assert_eq!(ts.beat_slots(), 4);
    }
}
