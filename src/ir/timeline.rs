//! Timeline aggregation
//!
//! Flattens the nested structure into absolute beat positions. A cursor
//! advances by the measure length once per measure; beat `k` of a measure
//! starts at `measure_start + k`. Positions are exact rationals, so a 5/8
//! measure (5/2 beats) adds exactly 5/2 to the cursor.

use crate::models::duration::beats;
use crate::models::{Composition, DurationToken, PitchToken, Rational, TimeSignature, Voice};
use std::collections::BTreeMap;

/// A raw note or rest at an absolute position, tokens still unparsed
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEvent {
    /// Absolute start in beats from the top of the piece
    pub start: Rational,
    /// `None` is a rest
    pub pitch: Option<PitchToken>,
    pub duration: DurationToken,
}

/// One start-ordered event list per voice
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    pub voices: BTreeMap<Voice, Vec<TimelineEvent>>,
    /// Total length of the aggregated measures in beats
    pub length: Rational,
}

impl Timeline {
    pub fn events(&self, voice: Voice) -> &[TimelineEvent] {
        self.voices.get(&voice).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn event_count(&self) -> usize {
        self.voices.values().map(Vec::len).sum()
    }
}

/// Build the per-voice timeline
///
/// Sections play in document order, each repeated `section_repeats` times
/// back to back (a value of 0 is treated as 1). Each voice's list is then
/// stable-sorted by start, which only reorders anything when an over-full
/// measure spills past its nominal end.
pub fn aggregate(
    composition: &Composition,
    time_signature: &TimeSignature,
    section_repeats: usize,
) -> Timeline {
    let measure_length = time_signature.beats_per_measure();
    let repeats = section_repeats.max(1);
    let mut timeline = Timeline::default();
    let mut cursor = beats(0);

    for section in &composition.sections {
        for _ in 0..repeats {
            for phrase in &section.phrases {
                for measure in &phrase.measures {
                    for (beat_index, beat) in measure.beats.iter().enumerate() {
                        let start = cursor + beats(beat_index as i64);
                        for (voice, notes) in &beat.voices {
                            let events = timeline.voices.entry(*voice).or_default();
                            events.extend(notes.iter().map(|note| TimelineEvent {
                                start,
                                pitch: note.note.clone(),
                                duration: note.duration.clone(),
                            }));
                        }
                    }
                    cursor += measure_length;
                }
            }
        }
    }

    for events in timeline.voices.values_mut() {
        events.sort_by(|a, b| a.start.cmp(&b.start));
    }
    timeline.length = cursor;

    log::debug!(
        "aggregated {} events over {} beats across {} voices",
        timeline.event_count(),
        timeline.length,
        timeline.voices.len()
    );
    timeline
}
