//! Cross-barline splitting
//!
//! A note that starts on beat `i` and lasts longer than the `bpm - i` beats
//! left in its measure is cut at the barline. The remainder starts on beat
//! 0 of the next measure of the same phrase, where it is checked (and cut)
//! again, so a long note becomes a chain whose pieces sum to the original.
//! When the phrase runs out of measures an empty one is appended to hold
//! the remainder. Notes longer than the duration ceiling are first cut to
//! the ceiling, which bounds how many measures a single note can add.

use super::RepairReport;
use crate::models::duration::beats;
use crate::models::{Beat, Composition, Measure, NoteEvent, Rational, TimeSignature, Voice};
use std::collections::BTreeSet;

pub fn split_long_notes(
    composition: &mut Composition,
    time_signature: &TimeSignature,
    voices: &BTreeSet<Voice>,
    ceiling: Rational,
    report: &mut RepairReport,
) {
    let bpm = time_signature.beats_per_measure();
    let slots = time_signature.beat_slots();
    let mut split = 0;

    for phrase in composition.phrases_mut() {
        let mut m = 0;
        while m < phrase.measures.len() {
            let mut carried: Vec<(Voice, NoteEvent)> = Vec::new();

            for (beat_index, beat) in phrase.measures[m].beats.iter_mut().enumerate() {
                let remaining = bpm - beats(beat_index as i64);
                if remaining <= beats(0) {
                    // Beats past the nominal end of an over-full measure
                    continue;
                }
                for (voice, notes) in beat.voices.iter_mut() {
                    for note in notes.iter_mut() {
                        let Ok(mut duration) = note.duration.to_rational() else {
                            continue;
                        };
                        if !note.is_rest() && duration > ceiling {
                            report.notes_truncated += 1;
                            report.warn(format!(
                                "phrase {:?} measure {} {}: {} beats cut to {}",
                                phrase.phrase_label,
                                m + 1,
                                voice,
                                duration,
                                ceiling
                            ));
                            duration = ceiling;
                            note.duration = ceiling.into();
                        }
                        if duration <= remaining {
                            continue;
                        }
                        note.duration = remaining.into();
                        // Rests are only shortened; silence needs no tie
                        if !note.is_rest() {
                            carried.push((
                                *voice,
                                NoteEvent {
                                    note: note.note.clone(),
                                    duration: (duration - remaining).into(),
                                },
                            ));
                            split += 1;
                        }
                    }
                }
            }

            if !carried.is_empty() {
                if m + 1 == phrase.measures.len() {
                    let number = phrase.measures.len() as u32 + 1;
                    phrase.measures.push(Measure::empty(Some(number), slots, voices));
                    report.measures_added += 1;
                    log::debug!(
                        "phrase {:?}: appended measure {} for tied remainders",
                        phrase.phrase_label,
                        number
                    );
                }
                let next = &mut phrase.measures[m + 1];
                if next.beats.is_empty() {
                    next.beats.push(Beat::default());
                }
                let downbeat = &mut next.beats[0];
                for (voice, note) in carried {
                    downbeat.notes_mut(voice).push(note);
                }
            }
            m += 1;
        }
    }

    if split > 0 {
        log::debug!("split {} note(s) across barlines", split);
    }
    report.notes_split += split;
}
