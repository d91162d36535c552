//! Default values for MIDI export
//!
//! Tempo, velocity and resolution defaults, plus the fixed voice-to-channel
//! map and program clamping.

use crate::models::Voice;

/// Default tempo in beats per minute
pub const DEFAULT_TEMPO_BPM: u32 = 120;

/// Default MIDI velocity for every note
pub const DEFAULT_VELOCITY: u8 = 100;

/// Default MIDI program (0 = Acoustic Grand Piano in General MIDI)
pub const DEFAULT_PROGRAM: u8 = 0;

/// Default ticks per quarter note (MIDI resolution)
pub const DEFAULT_TPQ: u16 = 480;

/// General MIDI percussion channel (10 in 1-indexed terms)
pub const PERCUSSION_CHANNEL: u8 = 9;

/// Largest tick an SMF variable-length quantity can carry (28 bits)
pub const SMF_MAX_TICK: u64 = 0x0FFF_FFFF;

/// Largest tempo value (24-bit microseconds per quarter)
const MAX_TEMPO_MICROS: u32 = 0x00FF_FFFF;

/// Fixed MIDI channel for each voice
///
/// The choir voices and piano take channels 0-4 in track order; percussion
/// always goes to the General MIDI drum channel.
pub fn channel_for(voice: Voice) -> u8 {
    match voice {
        Voice::Bass => 0,
        Voice::Tenor => 1,
        Voice::Alto => 2,
        Voice::Soprano => 3,
        Voice::Piano => 4,
        Voice::Percussion => PERCUSSION_CHANNEL,
    }
}

/// Clamp a metadata program number into 0-127
pub fn clamp_program(program: i32) -> u8 {
    program.clamp(0, 127) as u8
}

/// Microseconds per quarter note for a tempo
pub fn microseconds_per_quarter(bpm: u32) -> u32 {
    (60_000_000 / bpm.max(1)).min(MAX_TEMPO_MICROS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_map() {
        let channels: Vec<u8> = Voice::ALL.iter().map(|v| channel_for(*v)).collect();
        assert_eq!(channels, vec![0, 1, 2, 3, 4, 9]);
    }

    #[test]
    fn test_clamp_program() {
        assert_eq!(clamp_program(-5), 0);
        assert_eq!(clamp_program(73), 73);
        assert_eq!(clamp_program(300), 127);
    }

    #[test]
    fn test_microseconds_per_quarter() {
        assert_eq!(microseconds_per_quarter(120), 500_000);
        assert_eq!(microseconds_per_quarter(60), 1_000_000);
        // 1 BPM does not fit in 24 bits
        assert_eq!(microseconds_per_quarter(1), 0x00FF_FFFF);
        assert_eq!(microseconds_per_quarter(0), 0x00FF_FFFF);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(DEFAULT_TEMPO_BPM, 120);
        assert_eq!(DEFAULT_VELOCITY, 100);
        assert_eq!(DEFAULT_PROGRAM, 0);
        assert_eq!(DEFAULT_TPQ, 480);
    }
}
