//! Render pipeline
//!
//! ```text
//! Composition ─clone→ repair → aggregate → validate → Score → SMF file
//! ```
//!
//! The caller's composition is never modified; repair works on a copy.
//! Each render owns its data, so independent renders can run in parallel
//! with [`render_batch`].

use crate::config::RenderSettings;
use crate::diagnostics::{EmptyRenderableArtifact, RenderReport, RenderStatus};
use crate::error::{RenderError, Result};
use crate::ir::{aggregate, validate, ValidatedTimeline, ValidationReport};
use crate::models::{Composition, SongMetadata};
use crate::renderers::midi::{timeline_to_score, write_score_file, Score};
use crate::repair::repair_composition;
use std::path::{Path, PathBuf};

/// A composition carried through every stage short of writing
#[derive(Debug, Clone)]
pub struct Rendered {
    /// The repaired working copy
    pub composition: Composition,
    pub timeline: ValidatedTimeline,
    pub score: Score,
    pub report: RenderReport,
}

/// One entry of a batch render
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub composition: Composition,
    pub output: PathBuf,
}

/// Repair, aggregate, validate and convert a composition
///
/// Returns `EmptyRenderable` when no voice has a renderable note.
pub fn render_composition(composition: &Composition, settings: &RenderSettings) -> Result<Rendered> {
    let rendered = assemble(composition, settings)?;
    if rendered.timeline.is_empty() {
        log::warn!("{:?}: nothing renderable", rendered.report.title);
        return Err(RenderError::EmptyRenderable {
            diagnostic_path: None,
        });
    }
    Ok(rendered)
}

/// Render a composition to an SMF file at `path`
///
/// When nothing is renderable no `.mid` file is left at `path` (an old one
/// is removed); a `<stem>.diagnostic.json` artifact is written next to it
/// and `EmptyRenderable` names it.
pub fn render_to_file(
    composition: &Composition,
    path: &Path,
    settings: &RenderSettings,
) -> Result<RenderReport> {
    let Rendered {
        timeline,
        score,
        mut report,
        ..
    } = assemble(composition, settings)?;

    if timeline.is_empty() {
        report.status = RenderStatus::Empty;
        if path.is_file() {
            // A .mid left by an earlier render would contradict the artifact
            std::fs::remove_file(path)?;
            log::info!("removed stale {}", path.display());
        }
        let artifact = EmptyRenderableArtifact::new(report);
        let diagnostic_path = artifact.write_next_to(path)?;
        return Err(RenderError::EmptyRenderable {
            diagnostic_path: Some(diagnostic_path),
        });
    }

    let outcome = write_score_file(&score, path)?;
    report.tracks_written = outcome.tracks_written;
    report.notes_written = outcome.notes_written;
    report.used_fallback = outcome.used_fallback;
    report.output = Some(path.to_path_buf());
    if outcome.used_fallback {
        report.status = RenderStatus::Fallback;
        let dropped = score.note_count() - outcome.notes_written;
        report
            .warnings
            .push(format!("single-track fallback written; {} note(s) lost", dropped));
    }

    log::info!("{}", report.summary());
    Ok(report)
}

/// Render several compositions concurrently, one scoped thread per job
///
/// Results come back in job order. Renders share nothing but the settings.
pub fn render_batch(jobs: &[RenderJob], settings: &RenderSettings) -> Vec<Result<RenderReport>> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .iter()
            .map(|job| scope.spawn(move || render_to_file(&job.composition, &job.output, settings)))
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    Err(RenderError::EncodingFailure("render thread panicked".to_string()))
                })
            })
            .collect()
    })
}

/// Filesystem-safe file stem: `"<label> - <title> - <key> - <tempo>bpm"`
///
/// `label` is typically a date or the name of the generating model; it is
/// left out when empty.
pub fn output_file_stem(metadata: &SongMetadata, label: &str) -> String {
    let title = if metadata.title.trim().is_empty() {
        "Untitled"
    } else {
        metadata.title.trim()
    };
    let key = if metadata.key_signature.trim().is_empty() {
        "Unknown key"
    } else {
        metadata.key_signature.trim()
    };
    let tempo = format!("{}bpm", metadata.tempo);

    let parts: Vec<String> = [label.trim(), title, key, tempo.as_str()]
        .iter()
        .filter(|part| !part.is_empty())
        .map(|part| sanitize(part))
        .collect();
    parts.join(" - ")
}

fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

fn assemble(composition: &Composition, settings: &RenderSettings) -> Result<Rendered> {
    settings.validate()?;

    let mut working = composition.clone();
    let repair = repair_composition(&mut working, settings);

    let (time_signature, _) = working.time_signature();
    let timeline = aggregate(&working, &time_signature, settings.section_repeats);

    let mut validation = ValidationReport::default();
    let validated = validate(&timeline, settings, &mut validation);
    let score = timeline_to_score(&validated, &working.metadata, settings);

    let report = RenderReport {
        title: working.metadata.title.clone(),
        status: RenderStatus::Rendered,
        repair,
        validation,
        notes_written: score.note_count(),
        tracks_written: score.parts.len(),
        ..RenderReport::default()
    };

    Ok(Rendered {
        composition: working,
        timeline: validated,
        score,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Instrumentation, Voice};
    use crate::repair::test_support::*;

    #[test]
    fn test_input_is_not_modified() {
        let comp = composition("3/4", vec![measure(vec![beat(&[(Voice::Bass, Some("C3"), "1")])])]);
        let before = comp.clone();

        let rendered = render_composition(&comp, &RenderSettings::default()).unwrap();

        assert_eq!(comp, before);
        assert_ne!(rendered.composition, before);
        assert_eq!(rendered.report.repair.beats_added, 2);
    }

    #[test]
    fn test_only_rests_is_empty_renderable() {
        let comp = composition("4/4", vec![measure(vec![beat(&[(Voice::Alto, None, "4")])])]);
        let settings = RenderSettings {
            enrich_final_measures: false,
            ..RenderSettings::default()
        };
        let result = render_composition(&comp, &settings);
        assert!(matches!(
            result,
            Err(RenderError::EmptyRenderable { diagnostic_path: None })
        ));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let comp = composition("4/4", vec![]);
        let settings = RenderSettings {
            velocity: 0,
            ..RenderSettings::default()
        };
        assert!(matches!(render_composition(&comp, &settings), Err(RenderError::Config(_))));
    }

    #[test]
    fn test_output_file_stem() {
        let metadata = SongMetadata {
            title: "Rain / Shine".to_string(),
            tempo: 96,
            key_signature: "F# minor".to_string(),
            time_signature: "4/4".to_string(),
            instruments: Instrumentation::default(),
        };
        assert_eq!(
            output_file_stem(&metadata, "2024-05-01"),
            "2024-05-01 - Rain _ Shine - F# minor - 96bpm"
        );
        assert_eq!(output_file_stem(&metadata, ""), "Rain _ Shine - F# minor - 96bpm");
    }
}
