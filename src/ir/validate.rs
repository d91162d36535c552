//! Note validation
//!
//! Turns raw timeline tokens into renderable notes. Anything that cannot be
//! rendered is dropped and recorded rather than failing the render:
//!
//! - rests carry no onset in an absolute timeline and are dropped silently
//! - an invalid pitch drops its note (the time it covered stays silent)
//! - an invalid or non-positive duration drops its note
//! - a duration above the ceiling is clamped to the ceiling
//!
//! Voices left with no notes are removed entirely.

use super::timeline::Timeline;
use crate::config::RenderSettings;
use crate::models::duration::{beats, quantize};
use crate::models::{pitch::resolve_token, Rational, Voice};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A renderable note: resolved pitch, exact position and length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedEvent {
    pub start: Rational,
    pub pitch: u8,
    pub duration: Rational,
}

impl ValidatedEvent {
    pub fn end(&self) -> Rational {
        self.start + self.duration
    }
}

/// Per-voice renderable notes; every voice present has at least one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedTimeline {
    pub voices: BTreeMap<Voice, Vec<ValidatedEvent>>,
}

impl ValidatedTimeline {
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn events(&self, voice: Voice) -> &[ValidatedEvent] {
        self.voices.get(&voice).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn note_count(&self) -> usize {
        self.voices.values().map(Vec::len).sum()
    }

    /// Latest note end across all voices
    pub fn end(&self) -> Rational {
        self.voices
            .values()
            .flatten()
            .map(ValidatedEvent::end)
            .max()
            .unwrap_or_else(|| beats(0))
    }
}

/// What validation dropped or adjusted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub rests_dropped: usize,
    pub invalid_pitches: usize,
    pub invalid_durations: usize,
    pub durations_clamped: usize,
    pub durations_quantized: usize,
    pub voices_dropped: Vec<Voice>,
    pub notes_kept: usize,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn warn(&mut self, message: String) {
        log::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Resolve, filter and clamp every event of a timeline
pub fn validate(
    timeline: &Timeline,
    settings: &RenderSettings,
    report: &mut ValidationReport,
) -> ValidatedTimeline {
    let ceiling = settings.max_duration();
    let grid = settings.quantize_grid();
    let mut validated = ValidatedTimeline::default();

    for (voice, events) in &timeline.voices {
        let mut kept = Vec::with_capacity(events.len());

        for event in events {
            let Some(token) = &event.pitch else {
                report.rests_dropped += 1;
                continue;
            };

            let pitch = match resolve_token(*voice, token) {
                Ok(pitch) => pitch,
                Err(err) => {
                    report.invalid_pitches += 1;
                    report.warn(format!("{} at beat {}: {}; note dropped", voice, event.start, err));
                    continue;
                }
            };

            let mut duration = match event.duration.to_rational() {
                Ok(duration) => duration,
                Err(err) => {
                    report.invalid_durations += 1;
                    report.warn(format!("{} at beat {}: {}; note dropped", voice, event.start, err));
                    continue;
                }
            };

            if let Some(grid) = grid {
                let snapped = quantize(duration, grid);
                if snapped != duration {
                    report.durations_quantized += 1;
                    duration = snapped;
                }
            }

            if duration > ceiling {
                report.durations_clamped += 1;
                report.warn(format!(
                    "{} at beat {}: duration {} exceeds {} beats; clamped",
                    voice, event.start, duration, ceiling
                ));
                duration = ceiling;
            }

            kept.push(ValidatedEvent {
                start: event.start,
                pitch,
                duration,
            });
        }

        if kept.is_empty() {
            log::info!("{} has no renderable notes; dropping the voice", voice);
            report.voices_dropped.push(*voice);
        } else {
            report.notes_kept += kept.len();
            validated.voices.insert(*voice, kept);
        }
    }

    validated
}
