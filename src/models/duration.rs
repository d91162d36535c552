//! Exact beat arithmetic
//!
//! Durations and positions are kept as exact rationals from parsing all the
//! way to the encoder. Summing thirds and sixths in floating point drifts,
//! and the drift shows up as notes starting a few ticks off their beat.
//! The only float conversion is `to_seconds`, used at the output boundary.

use crate::error::{RenderError, Result};
use num_rational::{Ratio, Rational64};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Beats as an exact fraction (1 = one beat)
pub type Rational = Rational64;

/// Largest denominator accepted in a fraction literal
pub const MAX_DENOMINATOR: i64 = 1024;

/// Decimal literals within this distance of a simple fraction snap to it
const SNAP_MAX_DENOMINATOR: i128 = 64;
const SNAP_TOLERANCE_INV: i128 = 1_000_000;

/// Integer part limit for literals; anything larger is not a duration
const MAX_WHOLE_BEATS: i64 = 1_000_000_000;

const MAX_DECIMAL_DIGITS: usize = 15;

/// Duration as it arrives from the generator: a fraction/decimal string,
/// or a bare JSON number from the older float-based schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationToken {
    Text(String),
    Number(f64),
}

impl DurationToken {
    /// Parse into exact beats
    pub fn to_rational(&self) -> Result<Rational> {
        match self {
            DurationToken::Text(text) => parse_duration(text),
            DurationToken::Number(value) => {
                if !value.is_finite() {
                    return Err(RenderError::invalid_duration(
                        value.to_string(),
                        "not a finite number",
                    ));
                }
                // Display for f64 is the shortest round-trip form and never
                // uses an exponent, so it parses as a plain decimal.
                parse_duration(&value.to_string())
            }
        }
    }
}

impl From<Rational> for DurationToken {
    fn from(value: Rational) -> Self {
        DurationToken::Text(value.to_string())
    }
}

impl From<&str> for DurationToken {
    fn from(value: &str) -> Self {
        DurationToken::Text(value.to_string())
    }
}

impl fmt::Display for DurationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationToken::Text(text) => write!(f, "{}", text),
            DurationToken::Number(value) => write!(f, "{}", value),
        }
    }
}

/// Whole number of beats
pub fn beats(count: i64) -> Rational {
    Rational::from_integer(count)
}

/// Parse a duration literal into exact beats
///
/// Accepted forms:
/// - `"1/3"` fraction
/// - `"2"` integer
/// - `"1 1/2"` mixed number
/// - `"0.5"` decimal (legacy encodings; snapped to a simple fraction when
///   within 1e-6, otherwise rounded to the 1/64 grid)
///
/// Zero, negative and unparseable values are `InvalidDuration`.
pub fn parse_duration(token: &str) -> Result<Rational> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(RenderError::invalid_duration(token, "empty duration"));
    }

    let parsed = if let Some((whole, fraction)) = trimmed.split_once(char::is_whitespace) {
        parse_integer(whole)
            .and_then(|w| parse_fraction(fraction.trim()).map(|f| Rational::from_integer(w) + f))
    } else if trimmed.contains('/') {
        parse_fraction(trimmed)
    } else if trimmed.contains('.') {
        parse_decimal(trimmed)
    } else {
        parse_integer(trimmed).map(Rational::from_integer)
    };

    let value = parsed.map_err(|reason| RenderError::invalid_duration(token, reason))?;
    if value <= beats(0) {
        return Err(RenderError::invalid_duration(token, "duration must be positive"));
    }
    Ok(value)
}

fn parse_integer(text: &str) -> std::result::Result<i64, String> {
    let value: i64 = text
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not an integer", text))?;
    if value.abs() > MAX_WHOLE_BEATS {
        return Err(format!("{} beats is out of range", value));
    }
    Ok(value)
}

fn parse_fraction(text: &str) -> std::result::Result<Rational, String> {
    let (numer, denom) = text
        .split_once('/')
        .ok_or_else(|| format!("'{}' is not a fraction", text))?;
    let numer = parse_integer(numer)?;
    let denom = parse_integer(denom)?;
    if denom == 0 {
        return Err("zero denominator".to_string());
    }
    if denom.abs() > MAX_DENOMINATOR {
        return Err(format!("denominator {} finer than 1/{}", denom, MAX_DENOMINATOR));
    }
    Ok(Rational::new(numer, denom))
}

fn parse_decimal(text: &str) -> std::result::Result<Rational, String> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (whole, frac) = digits
        .split_once('.')
        .ok_or_else(|| format!("'{}' is not a decimal", text))?;

    let whole_ok = whole.chars().all(|c| c.is_ascii_digit());
    let frac_ok = frac.chars().all(|c| c.is_ascii_digit());
    if !whole_ok || !frac_ok || (whole.is_empty() && frac.is_empty()) {
        return Err(format!("'{}' is not a decimal", text));
    }

    let whole: i128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| format!("'{}' is not a decimal", text))?
    };
    if whole > MAX_WHOLE_BEATS as i128 {
        return Err(format!("{} beats is out of range", whole));
    }

    let frac = &frac[..frac.len().min(MAX_DECIMAL_DIGITS)];
    let scale = 10i128.pow(frac.len() as u32);
    let frac_value: i128 = if frac.is_empty() {
        0
    } else {
        frac.parse().map_err(|_| format!("'{}' is not a decimal", text))?
    };

    let mut numer = whole * scale + frac_value;
    if negative {
        numer = -numer;
    }
    Ok(snap_decimal(numer, scale))
}

/// Snap `numer / scale` to the simplest nearby fraction
fn snap_decimal(numer: i128, scale: i128) -> Rational {
    for denom in 1..=SNAP_MAX_DENOMINATOR {
        let candidate = div_round(numer * denom, scale);
        let error = (numer * denom - candidate * scale).abs();
        if error * SNAP_TOLERANCE_INV <= scale * denom {
            return Rational::new(candidate as i64, denom as i64);
        }
    }
    let steps = div_round(numer * SNAP_MAX_DENOMINATOR, scale);
    Rational::new(steps as i64, SNAP_MAX_DENOMINATOR as i64)
}

/// Integer division rounding half away from zero
fn div_round(numer: i128, denom: i128) -> i128 {
    let half = denom / 2;
    if numer >= 0 {
        (numer + half) / denom
    } else {
        (numer - half) / denom
    }
}

/// Convert beats to MIDI ticks (one beat = one quarter note), rounding to
/// the nearest tick. Negative values map to 0.
pub fn to_ticks(value: Rational, tpq: u16) -> u64 {
    let numer = *value.numer() as i128 * tpq as i128;
    let denom = *value.denom() as i128;
    let ticks = div_round(numer, denom);
    if ticks < 0 {
        0
    } else {
        ticks as u64
    }
}

/// Convert beats to seconds at the given tempo
pub fn to_seconds(value: Rational, bpm: u32) -> f64 {
    let beats_f = *value.numer() as f64 / *value.denom() as f64;
    beats_f * 60.0 / bpm.max(1) as f64
}

/// Exact sum, or `None` when the result no longer fits in a `Rational`
///
/// A few coprime denominators near `MAX_DENOMINATOR` already push the
/// common denominator past `i64`, where plain `+` panics.
pub fn checked_sum(a: Rational, b: Rational) -> Option<Rational> {
    let (an, ad) = (*a.numer() as i128, *a.denom() as i128);
    let (bn, bd) = (*b.numer() as i128, *b.denom() as i128);
    let numer = an.checked_mul(bd)?.checked_add(bn.checked_mul(ad)?)?;
    let wide = Ratio::<i128>::new(numer, ad.checked_mul(bd)?);
    let numer = i64::try_from(*wide.numer()).ok()?;
    let denom = i64::try_from(*wide.denom()).ok()?;
    Some(Rational::new_raw(numer, denom))
}

/// Round to the nearest multiple of `grid`, never below one step
pub fn quantize(value: Rational, grid: Rational) -> Rational {
    if grid <= beats(0) {
        return value;
    }
    let steps = (value / grid).round();
    if steps < beats(1) {
        grid
    } else {
        steps * grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fractions() {
        assert_eq!(parse_duration("1/3").unwrap(), Rational::new(1, 3));
        assert_eq!(parse_duration("2/4").unwrap(), Rational::new(1, 2));
        assert_eq!(parse_duration("5/2").unwrap(), Rational::new(5, 2));
        assert_eq!(parse_duration(" 3/8 ").unwrap(), Rational::new(3, 8));
    }

    #[test]
    fn test_parse_integers_and_mixed() {
        assert_eq!(parse_duration("2").unwrap(), beats(2));
        assert_eq!(parse_duration("1 1/2").unwrap(), Rational::new(3, 2));
    }

    #[test]
    fn test_parse_decimals() {
        assert_eq!(parse_duration("0.5").unwrap(), Rational::new(1, 2));
        assert_eq!(parse_duration("1.5").unwrap(), Rational::new(3, 2));
        assert_eq!(parse_duration(".25").unwrap(), Rational::new(1, 4));
        assert_eq!(parse_duration("2.").unwrap(), beats(2));
        // Truncated thirds snap back to exact thirds
        assert_eq!(parse_duration("0.3333333333").unwrap(), Rational::new(1, 3));
        assert_eq!(parse_duration("0.6666667").unwrap(), Rational::new(2, 3));
        // Nothing simple nearby: 1/64 grid
        assert_eq!(parse_duration("0.123").unwrap(), Rational::new(1, 8));
    }

    #[test]
    fn test_parse_rejects_non_positive() {
        assert!(matches!(parse_duration("0"), Err(RenderError::InvalidDuration { .. })));
        assert!(matches!(parse_duration("-1/2"), Err(RenderError::InvalidDuration { .. })));
        assert!(matches!(parse_duration("-0.5"), Err(RenderError::InvalidDuration { .. })));
        assert!(matches!(parse_duration("0/4"), Err(RenderError::InvalidDuration { .. })));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("quarter").is_err());
        assert!(parse_duration("1/0").is_err());
        assert!(parse_duration("1/2/3").is_err());
        assert!(parse_duration("1.2.3").is_err());
        assert!(parse_duration("1/4096").is_err());
        assert!(parse_duration("0.0001").is_err());
    }

    #[test]
    fn test_number_tokens() {
        assert_eq!(DurationToken::Number(0.5).to_rational().unwrap(), Rational::new(1, 2));
        assert_eq!(DurationToken::Number(1.0).to_rational().unwrap(), beats(1));
        assert_eq!(
            DurationToken::Number(1.0 / 3.0).to_rational().unwrap(),
            Rational::new(1, 3)
        );
        assert!(DurationToken::Number(f64::NAN).to_rational().is_err());
        assert!(DurationToken::Number(-2.0).to_rational().is_err());
    }

    #[test]
    fn test_token_from_rational() {
        assert_eq!(DurationToken::from(Rational::new(1, 2)), DurationToken::from("1/2"));
        assert_eq!(DurationToken::from(beats(2)), DurationToken::from("2"));
    }

    #[test]
    fn test_to_ticks() {
        assert_eq!(to_ticks(beats(1), 480), 480);
        assert_eq!(to_ticks(Rational::new(1, 3), 480), 160);
        assert_eq!(to_ticks(Rational::new(1, 7), 480), 69); // 68.57 rounds up
        assert_eq!(to_ticks(Rational::new(-1, 2), 480), 0);
    }

    #[test]
    fn test_thirds_sum_exactly() {
        let third = Rational::new(1, 3);
        let total = (0..12).fold(beats(0), |acc, _| acc + third);
        assert_eq!(total, beats(4));
        assert_eq!(to_ticks(total, 480), 1920);
    }

    #[test]
    fn test_to_seconds() {
        assert!((to_seconds(beats(2), 120) - 1.0).abs() < 1e-12);
        assert!((to_seconds(Rational::new(1, 2), 60) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_quantize() {
        let grid = Rational::new(1, 4);
        assert_eq!(quantize(Rational::new(1, 3), grid), Rational::new(1, 4));
        assert_eq!(quantize(Rational::new(3, 8), grid), Rational::new(1, 2));
        assert_eq!(quantize(Rational::new(1, 16), grid), grid);
        assert_eq!(quantize(beats(2), grid), beats(2));
    }

    #[test]
    fn test_checked_sum() {
        assert_eq!(
            checked_sum(Rational::new(1, 3), Rational::new(1, 6)),
            Some(Rational::new(1, 2))
        );

        let mut total = Some(beats(0));
        for denom in [1021, 1019, 1013, 1009, 997, 991, 983] {
            total = total.and_then(|t| checked_sum(t, Rational::new(1, denom)));
        }
        assert_eq!(total, None);
    }
}
