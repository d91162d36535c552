//! Voice continuity

use super::RepairReport;
use crate::models::{Composition, Voice};
use std::collections::BTreeSet;

/// Voices with at least one real note anywhere in the composition
pub fn voices_in_use(composition: &Composition) -> BTreeSet<Voice> {
    let mut voices = BTreeSet::new();
    for beat in composition.beats() {
        for (voice, notes) in &beat.voices {
            if notes.iter().any(|n| !n.is_rest()) {
                voices.insert(*voice);
            }
        }
    }
    voices
}

/// Give every voice in use an explicit (possibly empty) entry on every beat
///
/// Downstream stages can then tell "present, nothing starts here" from
/// "voice absent" without guessing. Voices never used stay absent.
pub fn ensure_voice_continuity(composition: &mut Composition, report: &mut RepairReport) {
    let voices = voices_in_use(composition);
    let mut added = 0;

    for beat in composition.beats_mut() {
        for voice in &voices {
            if !beat.has_voice(*voice) {
                beat.notes_mut(*voice);
                added += 1;
            }
        }
    }

    if added > 0 {
        log::debug!("added {} empty voice entries for {:?}", added, voices);
    }
    report.voice_entries_added += added;
}
