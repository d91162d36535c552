//! Beat completion: pad short measures out to the time signature

use super::RepairReport;
use crate::models::{Beat, Composition, TimeSignature, Voice};
use std::collections::BTreeSet;

/// Append empty beats to every measure shorter than the signature's slots
///
/// Appended beats carry an explicit empty entry for each voice in `voices`.
/// Measures with too many beats are left alone and counted as over-full;
/// their extra beats still play, after the measure's nominal end.
pub fn complete_measure_beats(
    composition: &mut Composition,
    time_signature: &TimeSignature,
    voices: &BTreeSet<Voice>,
    report: &mut RepairReport,
) {
    let slots = time_signature.beat_slots();
    let mut overfull = Vec::new();

    for phrase in composition.phrases_mut() {
        for (index, measure) in phrase.measures.iter_mut().enumerate() {
            let present = measure.beats.len();
            if present < slots {
                measure
                    .beats
                    .extend((present..slots).map(|i| Beat::empty(i + 1, voices)));
                report.beats_added += slots - present;
                log::debug!(
                    "phrase {:?} measure {}: appended {} empty beat(s)",
                    phrase.phrase_label,
                    index + 1,
                    slots - present
                );
            } else if present > slots {
                overfull.push(format!(
                    "phrase {:?} measure {} has {} beats, expected {}",
                    phrase.phrase_label,
                    index + 1,
                    present,
                    slots
                ));
            }
        }
    }

    report.overfull_measures += overfull.len();
    for message in overfull {
        report.warn(message);
    }
}
