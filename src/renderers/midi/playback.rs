//! Scheduled playback events
//!
//! Flattens a score into note-on/note-off messages with times in seconds,
//! for an external player to emit against a clock. No device I/O here.

use super::model::Score;
use crate::models::duration::{to_seconds, Rational};
use serde::Serialize;

/// Message kind; the declaration order puts note-off first at equal times
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackKind {
    NoteOff,
    NoteOn,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScheduledEvent {
    /// Seconds from the start of the piece
    pub time: f64,
    pub kind: PlaybackKind,
    pub channel: u8,
    pub pitch: u8,
    pub velocity: u8,
}

/// Build the playback schedule at a tempo
///
/// Events are ordered by tick, then note-off before note-on, so a repeated
/// pitch is released before it is struck again.
pub fn schedule(score: &Score, bpm: u32) -> Vec<ScheduledEvent> {
    let mut timed: Vec<(u64, ScheduledEvent)> = Vec::with_capacity(score.note_count() * 2);

    for part in &score.parts {
        for note in &part.notes {
            let on = ScheduledEvent {
                time: 0.0,
                kind: PlaybackKind::NoteOn,
                channel: part.channel,
                pitch: note.pitch,
                velocity: note.vel,
            };
            let off = ScheduledEvent {
                kind: PlaybackKind::NoteOff,
                velocity: 0,
                ..on
            };
            timed.push((note.start_tick, on));
            timed.push((note.end_tick(), off));
        }
    }

    timed.sort_by_key(|(tick, event)| (*tick, event.kind));

    let tpq = score.tpq.max(1) as i64;
    timed
        .into_iter()
        .map(|(tick, event)| ScheduledEvent {
            time: to_seconds(Rational::new(tick as i64, tpq), bpm),
            ..event
        })
        .collect()
}
