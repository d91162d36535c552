//! Error types for the render pipeline
//!
//! Most variants are recovered inside the pipeline (a bad pitch drops one
//! note, a bad time signature falls back to 4/4) and only show up in the
//! diagnostic log. `EmptyRenderable`, a fatal `EncodingFailure` and the I/O
//! variants are the ones that reach a caller.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// Time signature string is not `N/D` with positive integers
    #[error("malformed time signature: {0:?}")]
    MalformedTimeSignature(String),

    /// Pitch token outside the supported grammar or the 0-127 range
    #[error("invalid pitch {token:?}: {reason}")]
    InvalidPitch { token: String, reason: String },

    /// Duration token that is unparseable or not strictly positive
    #[error("invalid duration {token:?}: {reason}")]
    InvalidDuration { token: String, reason: String },

    /// Every voice ended up empty after validation
    #[error("nothing renderable: every voice is empty after validation (diagnostic written to {diagnostic_path:?})")]
    EmptyRenderable { diagnostic_path: Option<PathBuf> },

    /// The SMF writer failed and the single-track fallback failed too
    #[error("midi encoding failed: {0}")]
    EncodingFailure(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RenderError {
    pub fn invalid_pitch(token: impl Into<String>, reason: impl Into<String>) -> Self {
        RenderError::InvalidPitch {
            token: token.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_duration(token: impl Into<String>, reason: impl Into<String>) -> Self {
        RenderError::InvalidDuration {
            token: token.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
