//! Score rendering library
//!
//! Turns a generated composition (sections → phrases → measures → beats →
//! per-voice notes with fractional beat durations) into a multi-track
//! Standard MIDI File. Generated input is often structurally broken, so the
//! pipeline repairs it first, then flattens it onto an exact-rational
//! timeline, validates every note and encodes what survives.
//!
//! The library logs through the `log` facade and never installs a logger.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ir;
pub mod models;
pub mod pipeline;
pub mod renderers;
pub mod repair;

// Re-export commonly used types
pub use config::RenderSettings;
pub use diagnostics::{EmptyRenderableArtifact, RenderReport, RenderStatus};
pub use error::{RenderError, Result};
pub use models::{Composition, SongMetadata, TimeSignature, Voice};
pub use pipeline::{output_file_stem, render_batch, render_composition, render_to_file, RenderJob, Rendered};
pub use repair::{repair_composition, RepairReport};
