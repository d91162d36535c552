//! Final-measure enrichment
//!
//! Generated phrases often end with a measure that is nearly silent: one
//! or two stray notes and then nothing. When a phrase's last measure has
//! fewer than two beats or fewer than four real onsets across the melodic
//! voices, a tonic closing chord is written at the first beat where
//! nothing is sounding any more, held to the end of the measure.
//!
//! A composition with no renderable note at all is left alone: a complete
//! generation failure must surface as an empty render, not as a piece made
//! only of synthesized chords.

use super::RepairReport;
use crate::models::duration::beats;
use crate::models::pitch::resolve_token;
use crate::models::{pitch_name, Composition, Key, Measure, NoteEvent, Rational, TimeSignature, Voice};

const MIN_FINAL_BEATS: usize = 2;
const MIN_FINAL_ONSETS: usize = 4;

pub fn enrich_final_measures(
    composition: &mut Composition,
    time_signature: &TimeSignature,
    key: Key,
    report: &mut RepairReport,
) {
    if !has_renderable_note(composition) {
        log::debug!("no renderable notes; skipping final-measure enrichment");
        return;
    }
    let melodic: Vec<Voice> = Voice::ALL.iter().copied().filter(|v| v.is_melodic()).collect();
    let chord = key.closing_chord();
    let bpm = time_signature.beats_per_measure();

    for phrase in composition.phrases_mut() {
        let Some(last) = phrase.measures.last_mut() else {
            continue;
        };
        if last.beats.len() >= MIN_FINAL_BEATS && last.onset_count(&melodic) >= MIN_FINAL_ONSETS {
            continue;
        }

        let target = first_silent_beat(last, &melodic);
        let Some(beat) = last.beats.get_mut(target) else {
            // Something sounds through the end of the measure
            continue;
        };
        let duration = bpm - beats(target as i64);
        if duration <= beats(0) {
            continue;
        }

        let mut written = 0;
        for (voice, midi) in Voice::CHOIR.iter().zip(chord) {
            let notes = beat.notes_mut(*voice);
            if notes.iter().any(|n| !n.is_rest()) {
                continue;
            }
            notes.clear();
            notes.push(NoteEvent::new(pitch_name(midi).as_str(), duration));
            written += 1;
        }

        if written > 0 {
            report.closing_chords_added += 1;
            log::info!(
                "phrase {:?}: closing {} chord on beat {} of the final measure",
                phrase.phrase_label,
                key,
                target + 1
            );
        }
    }
}

/// True when at least one note has a valid pitch and duration
fn has_renderable_note(composition: &Composition) -> bool {
    composition.beats().any(|beat| {
        beat.voices.iter().any(|(voice, notes)| {
            notes.iter().any(|note| {
                note.note
                    .as_ref()
                    .is_some_and(|token| resolve_token(*voice, token).is_ok())
                    && note.duration.to_rational().is_ok()
            })
        })
    })
}

/// Index of the first beat at or after which no melodic note is sounding
///
/// Notes are checked by where they end, not just where they start, so a
/// held note keeps the beats it covers occupied. Unparseable durations are
/// ignored here; validation reports them later.
fn first_silent_beat(measure: &Measure, voices: &[Voice]) -> usize {
    let mut sounding_until = beats(0);
    for (index, beat) in measure.beats.iter().enumerate() {
        for voice in voices {
            for note in beat.notes(*voice).iter().filter(|n| !n.is_rest()) {
                if let Ok(duration) = note.duration.to_rational() {
                    let end: Rational = beats(index as i64) + duration;
                    sounding_until = sounding_until.max(end);
                }
            }
        }
    }
    sounding_until.ceil().to_integer().max(0) as usize
}
