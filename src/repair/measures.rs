//! Measure completion: phrases get the measure count they declare

use super::RepairReport;
use crate::models::{Composition, Measure, TimeSignature, Voice};
use std::collections::BTreeSet;

/// Append empty measures to phrases shorter than their declared count
///
/// The declared count is the larger of `measures_per_phrase` and the
/// highest `phrase_measure_number`, capped at `max_declared` so a corrupt
/// number cannot make us synthesize thousands of measures.
pub fn complete_phrase_measures(
    composition: &mut Composition,
    time_signature: &TimeSignature,
    voices: &BTreeSet<Voice>,
    max_declared: usize,
    report: &mut RepairReport,
) {
    let slots = time_signature.beat_slots();

    for section in &mut composition.sections {
        for phrase in &mut section.phrases {
            let declared = phrase.declared_measure_count();
            if declared > max_declared {
                report.warn(format!(
                    "phrase {:?} declares {} measures; capping at {}",
                    phrase.phrase_label, declared, max_declared
                ));
            }
            let target = declared.min(max_declared);
            let present = phrase.measures.len();
            if present >= target {
                continue;
            }

            for n in present..target {
                phrase
                    .measures
                    .push(Measure::empty(Some(n as u32 + 1), slots, voices));
            }
            report.measures_added += target - present;
            log::info!(
                "section {:?} phrase {:?}: appended {} empty measure(s) ({} declared, {} present)",
                section.section_label,
                phrase.phrase_label,
                target - present,
                declared,
                present
            );
        }
    }
}
