//! Validated timeline to MIDI Score conversion
//!
//! One part per voice that survived validation, in fixed track order
//! (bass, tenor, alto, soprano, piano, percussion). Missing voices take no
//! track, so track indices are compacted while channels stay fixed.

use super::defaults::{channel_for, clamp_program};
use super::model::{Note, Part, Score, Tempo, TimeSig};
use crate::config::RenderSettings;
use crate::ir::{ValidatedEvent, ValidatedTimeline};
use crate::models::duration::to_ticks;
use crate::models::{SongMetadata, TimeSignature, Voice};

/// Convert a validated timeline to a MIDI Score
///
/// # Arguments
/// * `timeline` - Validated per-voice notes
/// * `metadata` - Tempo, time signature and instrument programs
/// * `settings` - Resolution, velocity and the tempo fallback
pub fn timeline_to_score(
    timeline: &ValidatedTimeline,
    metadata: &SongMetadata,
    settings: &RenderSettings,
) -> Score {
    let time_signature = metadata
        .time_signature
        .parse::<TimeSignature>()
        .unwrap_or_default();
    let tpq = settings.ticks_per_quarter;

    let mut score = Score {
        tpq,
        tempos: vec![Tempo {
            tick: 0,
            bpm: settings.tempo_for(metadata.tempo),
        }],
        timesigs: vec![TimeSig {
            tick: 0,
            num: time_signature.numerator as u8,
            den: time_signature.denominator as u8,
        }],
        parts: vec![],
    };

    for voice in Voice::ALL {
        let events = timeline.events(voice);
        if events.is_empty() {
            continue;
        }
        let program = metadata.instruments.program_for(voice).map(clamp_program);
        score.parts.push(Part {
            voice,
            name: voice.label().to_string(),
            channel: channel_for(voice),
            program,
            notes: convert_events(events, tpq, settings.velocity),
        });
    }

    log::debug!(
        "score: {} part(s), {} note(s), {} BPM, {}",
        score.parts.len(),
        score.note_count(),
        score.tempos[0].bpm,
        time_signature
    );
    score
}

/// Convert a voice's events to notes ordered by start, then pitch
fn convert_events(events: &[ValidatedEvent], tpq: u16, velocity: u8) -> Vec<Note> {
    let mut notes: Vec<Note> = events
        .iter()
        .map(|event| {
            let start_tick = to_ticks(event.start, tpq);
            // Exact end, so rounding never opens gaps between adjacent notes
            let end_tick = to_ticks(event.end(), tpq);
            Note {
                start_tick,
                dur_tick: end_tick.saturating_sub(start_tick).max(1),
                pitch: event.pitch,
                vel: velocity,
            }
        })
        .collect();
    notes.sort_by_key(|n| (n.start_tick, n.pitch));
    notes
}
