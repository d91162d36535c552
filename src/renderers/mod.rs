//! Renderers module
//!
//! Output formats for a validated timeline. MIDI is the only one.

pub mod midi;

// Re-export commonly used types
pub use midi::{timeline_to_score, write_score_file, Score};
