//! Render settings
//!
//! Every knob has a default, so `RenderSettings::default()` renders the way
//! the generator's output was meant to be played. Settings can also be read
//! from YAML, where missing fields keep their defaults.

use crate::error::{RenderError, Result};
use crate::models::duration::{parse_duration, Rational};
use crate::renderers::midi::defaults::{DEFAULT_TEMPO_BPM, DEFAULT_TPQ, DEFAULT_VELOCITY};
use serde::{Deserialize, Serialize};

/// Durations longer than this many beats are clamped
pub const DEFAULT_MAX_DURATION_BEATS: u32 = 16;

/// Upper bound on measures a phrase may ask repair to synthesize up to
pub const DEFAULT_MAX_DECLARED_MEASURES: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// MIDI resolution
    pub ticks_per_quarter: u16,

    /// Velocity written on every note-on (1-127)
    pub velocity: u8,

    /// Ceiling for a single note's duration in beats
    pub max_duration_beats: u32,

    /// Optional quantization grid as a duration literal, e.g. "1/4"
    pub quantize_grid: Option<String>,

    /// How many times each section is played back to back
    pub section_repeats: usize,

    /// Cap on the measure count a phrase can declare
    pub max_declared_measures: usize,

    /// Write a closing chord into near-empty phrase endings
    pub enrich_final_measures: bool,

    /// Tempo used when the metadata carries none
    pub default_tempo_bpm: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            ticks_per_quarter: DEFAULT_TPQ,
            velocity: DEFAULT_VELOCITY,
            max_duration_beats: DEFAULT_MAX_DURATION_BEATS,
            quantize_grid: None,
            section_repeats: 1,
            max_declared_measures: DEFAULT_MAX_DECLARED_MEASURES,
            enrich_final_measures: true,
            default_tempo_bpm: DEFAULT_TEMPO_BPM,
        }
    }
}

impl RenderSettings {
    /// Parse settings from YAML and validate them
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let settings: RenderSettings = serde_yaml::from_str(yaml)
            .map_err(|e| RenderError::Config(format!("Failed to parse settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.ticks_per_quarter == 0 || self.ticks_per_quarter > 0x7FFF {
            return Err(RenderError::Config(format!(
                "ticks_per_quarter must be 1-32767, got {}",
                self.ticks_per_quarter
            )));
        }
        if self.velocity == 0 || self.velocity > 127 {
            return Err(RenderError::Config(format!(
                "velocity must be 1-127, got {}",
                self.velocity
            )));
        }
        if self.max_duration_beats == 0 {
            return Err(RenderError::Config("max_duration_beats must be positive".to_string()));
        }
        if self.section_repeats == 0 {
            return Err(RenderError::Config("section_repeats must be at least 1".to_string()));
        }
        if self.default_tempo_bpm == 0 {
            return Err(RenderError::Config("default_tempo_bpm must be positive".to_string()));
        }
        if let Some(grid) = &self.quantize_grid {
            parse_duration(grid)
                .map_err(|e| RenderError::Config(format!("quantize_grid: {}", e)))?;
        }
        Ok(())
    }

    /// Quantization grid in beats, if one is configured and valid
    pub fn quantize_grid(&self) -> Option<Rational> {
        self.quantize_grid
            .as_deref()
            .and_then(|grid| parse_duration(grid).ok())
    }

    pub fn max_duration(&self) -> Rational {
        Rational::from_integer(self.max_duration_beats as i64)
    }

    /// Tempo to encode for a metadata tempo (0 falls back to the default)
    pub fn tempo_for(&self, metadata_tempo: u32) -> u32 {
        if metadata_tempo == 0 {
            self.default_tempo_bpm
        } else {
            metadata_tempo
        }
    }
}
