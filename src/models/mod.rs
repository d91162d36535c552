//! Composition model and the leaf value types it is built from
//!
//! Durations are exact rationals, pitches are validated MIDI numbers, and
//! the time signature and key are parsed with documented fallbacks.

pub mod composition;
pub mod duration;
pub mod pitch;
pub mod time_signature;
pub mod tonic;
pub mod voice;

// Re-export commonly used types
pub use composition::*;
pub use duration::{parse_duration, DurationToken, Rational};
pub use pitch::{pitch_name, resolve_pitch, PitchToken};
pub use time_signature::TimeSignature;
pub use tonic::{Key, Mode, Tonic};
pub use voice::Voice;
