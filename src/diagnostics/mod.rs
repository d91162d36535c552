//! Render diagnostics
//!
//! Everything repair and validation changed, plus what the encoder wrote,
//! collected into one serializable report. The report is returned to the
//! caller; nothing is kept in global state. When a composition has nothing
//! renderable, a JSON artifact explaining why is written in place of the
//! MIDI file.

use crate::error::Result;
use crate::ir::ValidationReport;
use crate::repair::RepairReport;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Outcome of a render
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RenderStatus {
    /// Multi-track file written
    #[default]
    Rendered,
    /// Only the reduced single-track file could be written
    Fallback,
    /// Nothing renderable; a diagnostic artifact was written instead
    Empty,
}

/// Everything that happened to one composition on its way to MIDI
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RenderReport {
    pub title: String,
    pub status: RenderStatus,
    pub repair: RepairReport,
    pub validation: ValidationReport,
    /// Pipeline-level warnings (repair and validation keep their own)
    pub warnings: Vec<String>,
    pub tracks_written: usize,
    pub notes_written: usize,
    pub used_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl RenderReport {
    /// Every warning from every stage, in pipeline order
    pub fn all_warnings(&self) -> impl Iterator<Item = &String> {
        self.repair
            .warnings
            .iter()
            .chain(self.validation.warnings.iter())
            .chain(self.warnings.iter())
    }

    /// Multi-line summary for the operator log
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{:?}: {:?}", self.title, self.status);
        let r = &self.repair;
        let _ = writeln!(
            out,
            "  repair: +{} beats, +{} measures, +{} voice entries, {} split, {} truncated, {} closing chords",
            r.beats_added,
            r.measures_added,
            r.voice_entries_added,
            r.notes_split,
            r.notes_truncated,
            r.closing_chords_added
        );
        if r.time_signature_fallback {
            let _ = writeln!(out, "  time signature fell back to 4/4");
        }
        if r.overfull_measures > 0 || r.duration_mismatches > 0 {
            let _ = writeln!(
                out,
                "  audit: {} over-full measures, {} duration mismatches",
                r.overfull_measures, r.duration_mismatches
            );
        }
        let v = &self.validation;
        let _ = writeln!(
            out,
            "  validation: {} kept, {} invalid pitches, {} invalid durations, {} clamped, {} rests dropped",
            v.notes_kept, v.invalid_pitches, v.invalid_durations, v.durations_clamped, v.rests_dropped
        );
        if !v.voices_dropped.is_empty() {
            let dropped: Vec<&str> = v.voices_dropped.iter().map(|voice| voice.as_str()).collect();
            let _ = writeln!(out, "  voices dropped: {}", dropped.join(", "));
        }
        let _ = write!(
            out,
            "  output: {} track(s), {} note(s){}",
            self.tracks_written,
            self.notes_written,
            if self.used_fallback { " (single-track fallback)" } else { "" }
        );
        out
    }

    /// Write the report as pretty JSON, the render log kept next to a song
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(&json)?;
        Ok(())
    }
}

/// JSON document written when nothing could be rendered
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EmptyRenderableArtifact {
    pub status: RenderStatus,
    pub cause: String,
    pub title: String,
    pub report: RenderReport,
}

impl EmptyRenderableArtifact {
    pub fn new(report: RenderReport) -> Self {
        let cause = if report.validation.voices_dropped.is_empty() {
            "composition contains no notes".to_string()
        } else {
            format!(
                "every voice was empty after validation ({} dropped)",
                report.validation.voices_dropped.len()
            )
        };
        Self {
            status: RenderStatus::Empty,
            cause,
            title: report.title.clone(),
            report,
        }
    }

    /// Path of the artifact for a requested MIDI output: `<stem>.diagnostic.json`
    pub fn path_for(output: &Path) -> PathBuf {
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "render".to_string());
        output.with_file_name(format!("{}.diagnostic.json", stem))
    }

    /// Write next to the requested output and return where it went
    pub fn write_next_to(&self, output: &Path) -> Result<PathBuf> {
        let path = Self::path_for(output);
        let json = serde_json::to_vec_pretty(self)?;
        let mut file = File::create(&path)?;
        file.write_all(&json)?;
        log::warn!("nothing renderable for {:?}; wrote {}", self.title, path.display());
        Ok(path)
    }
}
