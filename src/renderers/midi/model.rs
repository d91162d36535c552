//! Lean MIDI representation between the validated timeline and SMF bytes
//!
//! Just what the writer needs: absolute tick positions, one part per
//! voice, fixed channels and optional programs.

use crate::models::Voice;

#[derive(Debug, Clone)]
pub struct Score {
    pub tpq: u16,               // Ticks per quarter note (one beat)
    pub tempos: Vec<Tempo>,     // sorted by tick
    pub timesigs: Vec<TimeSig>, // sorted by tick
    pub parts: Vec<Part>,       // One per rendered voice, in track order
}

#[derive(Debug, Clone)]
pub struct Tempo {
    pub tick: u64,
    pub bpm: u32,
}

#[derive(Debug, Clone)]
pub struct TimeSig {
    pub tick: u64,
    pub num: u8, // Numerator (e.g., 3 in 3/4)
    pub den: u8, // Denominator (e.g., 4 in 3/4), a power of two
}

#[derive(Debug, Clone)]
pub struct Part {
    pub voice: Voice,
    pub name: String,
    pub channel: u8,         // MIDI channel 0-15 (9 = drums)
    pub program: Option<u8>, // MIDI program 0-127, none for drums
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub start_tick: u64,
    pub dur_tick: u64,
    pub pitch: u8, // MIDI note number 0-127
    pub vel: u8,   // Velocity 1-127
}

impl Note {
    pub fn end_tick(&self) -> u64 {
        self.start_tick + self.dur_tick
    }
}

impl Score {
    pub fn note_count(&self) -> usize {
        self.parts.iter().map(|p| p.notes.len()).sum()
    }

    /// Latest note-off tick across all parts
    pub fn end_tick(&self) -> u64 {
        self.parts
            .iter()
            .flat_map(|p| p.notes.iter())
            .map(Note::end_tick)
            .max()
            .unwrap_or(0)
    }

    /// Tempo in effect at tick 0
    pub fn initial_bpm(&self) -> Option<u32> {
        self.tempos.first().map(|t| t.bpm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_structure() {
        let score = Score {
            tpq: 480,
            tempos: vec![Tempo { tick: 0, bpm: 120 }],
            timesigs: vec![TimeSig { tick: 0, num: 4, den: 4 }],
            parts: vec![Part {
                voice: Voice::Piano,
                name: "Piano".to_string(),
                channel: 4,
                program: Some(0),
                notes: vec![
                    Note { start_tick: 0, dur_tick: 480, pitch: 60, vel: 100 },
                    Note { start_tick: 960, dur_tick: 240, pitch: 64, vel: 100 },
                ],
            }],
        };

        assert_eq!(score.note_count(), 2);
        assert_eq!(score.end_tick(), 1200);
        assert_eq!(score.initial_bpm(), Some(120));
    }
}
