//! Intermediate Representation (IR) Module
//!
//! The absolute-time form of a composition, between the nested
//! section/phrase/measure/beat model and the MIDI encoder.
//!
//! # Architecture
//!
//! ```text
//! Composition (repaired)
//!     ↓
//! aggregate   (one start-ordered event list per voice, raw tokens)
//!     ↓
//! validate    (resolved pitches, exact durations, bad events dropped)
//!     ↓
//! MIDI encoder
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::ir::{aggregate, validate, ValidationReport};
//!
//! let timeline = aggregate(&composition, &time_signature, 1);
//! let mut report = ValidationReport::default();
//! let validated = validate(&timeline, &settings, &mut report);
//! ```

pub mod timeline;
pub mod validate;

pub use timeline::{aggregate, Timeline, TimelineEvent};
pub use validate::{validate, ValidatedEvent, ValidatedTimeline, ValidationReport};
