//! Structural repair of generated compositions
//!
//! The generator regularly produces measures with missing beats, phrases
//! that stop short of their announced length, notes that run past the end
//! of their measure, voices that appear on some beats and not others, and
//! phrase endings that trail off into silence. Each pass below fixes one of
//! those without throwing away recoverable notes.
//!
//! # Passes
//!
//! ```text
//! beats     pad measures to the time signature's beat slots
//! measures  append measures a phrase declares but does not contain
//! ties      split notes that overrun their measure into tied chains
//! cadence   write a closing chord into near-empty phrase endings
//! voices    give every voice in use an explicit entry on every beat
//! audit     flag voices whose measure durations do not add up (no changes)
//! ```
//!
//! Every pass is idempotent: once the structure is well-formed, running the
//! whole sequence again changes nothing. Passes never fail; they log what
//! they changed and count it in the returned [`RepairReport`].

pub mod audit;
pub mod beats;
pub mod cadence;
pub mod measures;
pub mod ties;
pub mod voices;

use crate::config::RenderSettings;
use crate::models::Composition;
use serde::{Deserialize, Serialize};

pub use audit::{measure_duration_mismatches, DurationMismatch};
pub use voices::voices_in_use;

/// What repair changed, for the operator log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    /// The time signature did not parse and 4/4 was used
    pub time_signature_fallback: bool,
    pub beats_added: usize,
    /// Measures with more beats than the signature allows (kept as-is)
    pub overfull_measures: usize,
    pub measures_added: usize,
    pub voice_entries_added: usize,
    pub notes_split: usize,
    /// Notes cut to the duration ceiling before splitting
    pub notes_truncated: usize,
    pub closing_chords_added: usize,
    /// Voice/measure pairs whose durations do not sum to a full measure
    pub duration_mismatches: usize,
    pub warnings: Vec<String>,
}

impl RepairReport {
    /// Log a warning and keep it for the report
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.warnings.push(message);
    }

    /// True when repair changed nothing in the structure
    pub fn is_clean(&self) -> bool {
        self.beats_added == 0
            && self.measures_added == 0
            && self.voice_entries_added == 0
            && self.notes_split == 0
            && self.notes_truncated == 0
            && self.closing_chords_added == 0
    }
}

/// Run every repair pass over a working copy
pub fn repair_composition(composition: &mut Composition, settings: &RenderSettings) -> RepairReport {
    let mut report = RepairReport::default();

    let (time_signature, fell_back) = composition.time_signature();
    if fell_back {
        report.time_signature_fallback = true;
        report.warn(format!(
            "time signature {:?} is malformed; using 4/4",
            composition.metadata.time_signature
        ));
    }
    let key = composition.key();
    let in_use = voices_in_use(composition);

    beats::complete_measure_beats(composition, &time_signature, &in_use, &mut report);
    measures::complete_phrase_measures(
        composition,
        &time_signature,
        &in_use,
        settings.max_declared_measures,
        &mut report,
    );
    ties::split_long_notes(
        composition,
        &time_signature,
        &in_use,
        settings.max_duration(),
        &mut report,
    );
    if settings.enrich_final_measures {
        cadence::enrich_final_measures(composition, &time_signature, key, &mut report);
    }
    // Last, so voices introduced by the closing chord are covered too
    voices::ensure_voice_continuity(composition, &mut report);
    audit::audit_measure_durations(composition, &time_signature, &mut report);

    log::info!(
        "repair: +{} beats, +{} measures, +{} voice entries, {} split, {} truncated, {} closing chords, {} duration mismatches",
        report.beats_added,
        report.measures_added,
        report.voice_entries_added,
        report.notes_split,
        report.notes_truncated,
        report.closing_chords_added,
        report.duration_mismatches,
    );

    report
}
