//! Measure duration audit
//!
//! Reports voices whose durations inside a measure do not add up to the
//! measure length. Nothing is changed: a mismatch is often a deliberate
//! pickup or an early rest, but it is worth seeing in the log.
//!
//! A voice's measure total is the sum, over beats, of the longest note or
//! rest the voice starts on that beat. Notes starting together form a
//! chord and count once.

use super::RepairReport;
use crate::models::duration::{beats, checked_sum};
use crate::models::{Composition, Measure, Rational, TimeSignature, Voice};
use serde::Serialize;

/// Shown as the total when the sum overflows
pub const UNREPRESENTABLE: &str = "unrepresentable";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DurationMismatch {
    pub voice: Voice,
    pub total: String,
    pub expected: String,
}

/// Exact total duration a voice declares within one measure
///
/// `None` when the total is too finely divided to represent.
pub fn voice_measure_total(measure: &Measure, voice: Voice) -> Option<Rational> {
    measure
        .beats
        .iter()
        .filter_map(|beat| {
            beat.notes(voice)
                .iter()
                .filter_map(|n| n.duration.to_rational().ok())
                .max()
        })
        .try_fold(beats(0), checked_sum)
}

/// Voices with notes in this measure whose totals differ from the measure
/// length. Voices that start nothing in the measure are not reported; an
/// unrepresentable total always counts as a mismatch.
pub fn measure_duration_mismatches(
    measure: &Measure,
    time_signature: &TimeSignature,
) -> Vec<DurationMismatch> {
    let expected = time_signature.beats_per_measure();
    Voice::ALL
        .iter()
        .filter(|v| measure.beats.iter().any(|b| !b.notes(**v).is_empty()))
        .filter_map(|v| {
            let total = voice_measure_total(measure, *v);
            (total != Some(expected)).then(|| DurationMismatch {
                voice: *v,
                total: total.map_or_else(|| UNREPRESENTABLE.to_string(), |t| t.to_string()),
                expected: expected.to_string(),
            })
        })
        .collect()
}

pub fn audit_measure_durations(
    composition: &Composition,
    time_signature: &TimeSignature,
    report: &mut RepairReport,
) {
    for phrase in composition.phrases() {
        for (index, measure) in phrase.measures.iter().enumerate() {
            for mismatch in measure_duration_mismatches(measure, time_signature) {
                if mismatch.total == UNREPRESENTABLE {
                    report.warn(format!(
                        "phrase {:?} measure {} {}: durations are too finely divided to sum exactly",
                        phrase.phrase_label,
                        index + 1,
                        mismatch.voice
                    ));
                }
                log::debug!(
                    "phrase {:?} measure {} {}: durations sum to {}, expected {}",
                    phrase.phrase_label,
                    index + 1,
                    mismatch.voice,
                    mismatch.total,
                    mismatch.expected
                );
                report.duration_mismatches += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::models::{Beat, NoteEvent};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    const STEPS: [(i64, i64); 7] = [(1, 3), (1, 2), (2, 3), (5, 6), (1, 1), (7, 6), (4, 3)];

    /// A measure of `slots` beats whose per-beat durations sum exactly to
    /// `bpm`, each note fitting inside the measure.
    fn exact_measure(rng: &mut StdRng, slots: usize, bpm: Rational) -> Measure {
        loop {
            let mut durations: Vec<Rational> = (0..slots - 1)
                .map(|_| {
                    let (n, d) = *STEPS.choose(rng).unwrap();
                    Rational::new(n, d)
                })
                .collect();
            let used = durations.iter().fold(beats(0), |acc, d| acc + *d);
            let last = bpm - used;
            let last_room = bpm - beats(slots as i64 - 1);
            if last <= beats(0) || last > last_room {
                continue;
            }
            durations.push(last);

            let fits = durations
                .iter()
                .enumerate()
                .all(|(i, d)| *d <= bpm - beats(i as i64));
            if !fits {
                continue;
            }

            let filled = durations
                .into_iter()
                .map(|d| {
                    let mut beat = Beat::default();
                    beat.notes_mut(Voice::Alto).push(NoteEvent::new("E4", d));
                    beat
                })
                .collect();
            return measure(filled);
        }
    }

    #[test]
    fn test_exact_fraction_sets_pass() {
        let mut rng = StdRng::seed_from_u64(7);
        for signature in ["4/4", "3/4", "5/4"] {
            let ts: TimeSignature = signature.parse().unwrap();
            for _ in 0..50 {
                let m = exact_measure(&mut rng, ts.beat_slots(), ts.beats_per_measure());
                assert_eq!(voice_measure_total(&m, Voice::Alto), Some(ts.beats_per_measure()));
                assert!(measure_duration_mismatches(&m, &ts).is_empty());
            }
        }
    }

    #[test]
    fn test_perturbed_fraction_sets_are_flagged() {
        let mut rng = StdRng::seed_from_u64(11);
        let ts: TimeSignature = "4/4".parse().unwrap();
        for _ in 0..50 {
            let mut m = exact_measure(&mut rng, 4, ts.beats_per_measure());
            let target = rng.gen_range(0..4);
            let note = &mut m.beats[target].notes_mut(Voice::Alto)[0];
            let d = note.duration.to_rational().unwrap();
            // Shrink by a sixth or lengthen by a seventh
            let nudged = if rng.gen_bool(0.5) && d > Rational::new(1, 6) {
                d - Rational::new(1, 6)
            } else {
                d + Rational::new(1, 7)
            };
            note.duration = nudged.into();

            let mismatches = measure_duration_mismatches(&m, &ts);
            assert_eq!(mismatches.len(), 1);
            assert_eq!(mismatches[0].voice, Voice::Alto);
        }
    }

    #[test]
    fn test_chord_counts_once() {
        let m = measure(vec![
            beat(&[(Voice::Piano, Some("C4"), "2"), (Voice::Piano, Some("E4"), "2")]),
            beat(&[]),
            beat(&[(Voice::Piano, Some("G4"), "2"), (Voice::Piano, None, "1")]),
            beat(&[]),
        ]);
        assert_eq!(voice_measure_total(&m, Voice::Piano), Some(beats(4)));
    }

    #[test]
    fn test_silent_voice_not_reported() {
        let ts = TimeSignature::COMMON;
        let mut m = measure(vec![beat(&[(Voice::Bass, Some("C3"), "4")])]);
        m.beats[0].notes_mut(Voice::Tenor);
        assert!(measure_duration_mismatches(&m, &ts).is_empty());
    }

    #[test]
    fn test_audit_counts_into_report() {
        let comp = composition("4/4", vec![measure(vec![beat(&[(Voice::Bass, Some("C3"), "3")])])]);
        let mut report = RepairReport::default();
        audit_measure_durations(&comp, &TimeSignature::COMMON, &mut report);
        assert_eq!(report.duration_mismatches, 1);
    }

    #[test]
    fn test_coprime_denominators_are_flagged_not_summed() {
        let denominators = ["1/1021", "1/1019", "1/1013", "1/1009", "1/997", "1/991", "1/983"];
        let beats_in = denominators
            .iter()
            .map(|d| beat(&[(Voice::Bass, Some("C3"), *d)]))
            .collect();
        let comp = composition("7/4", vec![measure(beats_in)]);
        let ts = comp.time_signature().0;
        let mut report = RepairReport::default();

        assert_eq!(voice_measure_total(&first_phrase(&comp).measures[0], Voice::Bass), None);
        audit_measure_durations(&comp, &ts, &mut report);

        assert_eq!(report.duration_mismatches, 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("too finely divided"));
    }
}
