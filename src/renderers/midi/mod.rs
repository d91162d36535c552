//! Validated timeline to Standard MIDI File
//!
//! Converts the validated per-voice timeline into a lean MIDI Score IR and
//! serializes it with `midly`.
//!
//! # Pipeline
//! ```text
//! ValidatedTimeline → timeline_to_score → Score → write_smf → SMF bytes
//!                                            └──→ schedule → timed events
//! ```
//!
//! # Usage
//! ```rust,ignore
//! use crate::renderers::midi::{timeline_to_score, write_score_file};
//!
//! let score = timeline_to_score(&validated, &composition.metadata, &settings);
//! let outcome = write_score_file(&score, Path::new("song.mid"))?;
//! ```

pub mod converter;
pub mod defaults;
pub mod model;
pub mod playback;
pub mod write;

// Re-export main conversion functions
pub use converter::timeline_to_score;
pub use defaults::{DEFAULT_PROGRAM, DEFAULT_TEMPO_BPM, DEFAULT_TPQ, DEFAULT_VELOCITY};
pub use model::{Note, Part, Score, Tempo, TimeSig};
pub use playback::{schedule, PlaybackKind, ScheduledEvent};
pub use write::{write_score_file, write_single_track_fallback, write_smf, WriteOutcome};
