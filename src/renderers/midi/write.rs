use super::defaults::{microseconds_per_quarter, SMF_MAX_TICK};
use super::model::*;
use crate::error::{RenderError, Result};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Track name used when a score has no parts at all
const PLACEHOLDER_TRACK_NAME: &str = "Silence";

/// Track name of the single-track fallback file
const FALLBACK_TRACK_NAME: &str = "Salvaged";

/// What actually reached the disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub tracks_written: usize,
    pub notes_written: usize,
    pub used_fallback: bool,
}

/// Write Score IR to Standard MIDI File (SMF) Format 1
///
/// One track per part. Every track carries its name and the tempo; the
/// first also carries the time signature. A score without parts still gets
/// one silent placeholder track, since a file with no tracks is invalid.
pub fn write_smf(score: &Score, out: &mut Vec<u8>) -> Result<()> {
    check_tick_range(score)?;

    let mut tracks = Vec::new();
    for (index, part) in score.parts.iter().enumerate() {
        tracks.push(build_part_track(score, part, index == 0));
    }
    if tracks.is_empty() {
        log::warn!("score has no parts; writing a silent placeholder track");
        tracks.push(build_placeholder_track(score));
    }

    let header = Header {
        format: Format::Parallel,
        timing: Timing::Metrical(score.tpq.into()),
    };

    let smf = Smf { header, tracks };

    smf.write(out)
        .map_err(|e| RenderError::EncodingFailure(format!("Failed to write MIDI: {}", e)))?;

    Ok(())
}

/// Write a reduced Format 0 file holding every salvageable note
///
/// Notes whose ticks fit the SMF range are kept on their original channels;
/// the rest are dropped. Returns the number of notes written.
pub fn write_single_track_fallback(score: &Score, out: &mut Vec<u8>) -> Result<usize> {
    let mut events = Vec::new();
    push_track_header(&mut events, score, FALLBACK_TRACK_NAME.as_bytes(), true);

    let mut salvaged = 0;
    for part in &score.parts {
        push_program(&mut events, part);
        for note in part.notes.iter().filter(|n| n.end_tick() <= SMF_MAX_TICK) {
            push_note(&mut events, part.channel, note);
            salvaged += 1;
        }
    }
    let dropped = score.note_count() - salvaged;
    if dropped > 0 {
        log::warn!("fallback dropped {} note(s) past the SMF tick range", dropped);
    }

    let header = Header {
        format: Format::SingleTrack,
        timing: Timing::Metrical(score.tpq.into()),
    };
    let smf = Smf {
        header,
        tracks: vec![finish_track(events)],
    };

    smf.write(out)
        .map_err(|e| RenderError::EncodingFailure(format!("Failed to write fallback MIDI: {}", e)))?;

    Ok(salvaged)
}

/// Encode a score and write it to `path`
///
/// The bytes are fully built before any file is opened, then written to a
/// sibling `.partial` file that is renamed over `path`, so a failed write
/// never leaves a truncated `.mid` behind. If the multi-track encoding fails the reduced
/// single-track file is written instead; `EncodingFailure` is returned only
/// when both fail.
pub fn write_score_file(score: &Score, path: &Path) -> Result<WriteOutcome> {
    let mut bytes = Vec::new();
    let outcome = match write_smf(score, &mut bytes) {
        Ok(()) => WriteOutcome {
            tracks_written: score.parts.len().max(1),
            notes_written: score.note_count(),
            used_fallback: false,
        },
        Err(err) => {
            log::warn!("{}; trying single-track fallback", err);
            bytes.clear();
            let salvaged = write_single_track_fallback(score, &mut bytes).map_err(|fallback| {
                RenderError::EncodingFailure(format!("{}; fallback also failed: {}", err, fallback))
            })?;
            WriteOutcome {
                tracks_written: 1,
                notes_written: salvaged,
                used_fallback: true,
            }
        }
    };

    replace_file(path, &bytes)?;
    log::info!(
        "wrote {} ({} bytes, {} track(s), {} note(s))",
        path.display(),
        bytes.len(),
        outcome.tracks_written,
        outcome.notes_written
    );

    Ok(outcome)
}

/// Write `bytes` next to `path` and rename into place
fn replace_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "score.mid".to_string());
    let partial = path.with_file_name(format!(".{}.partial", name));

    let written = File::create(&partial)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.flush()
        })
        .and_then(|()| std::fs::rename(&partial, path));

    if let Err(err) = written {
        let _ = std::fs::remove_file(&partial);
        return Err(err.into());
    }
    Ok(())
}

fn check_tick_range(score: &Score) -> Result<()> {
    let end = score.end_tick();
    if end > SMF_MAX_TICK {
        return Err(RenderError::EncodingFailure(format!(
            "tick {} exceeds the SMF limit of {}",
            end, SMF_MAX_TICK
        )));
    }
    Ok(())
}

fn build_part_track<'a>(score: &Score, part: &'a Part, first: bool) -> Track<'a> {
    let mut events = Vec::new();
    push_track_header(&mut events, score, part.name.as_bytes(), first);
    push_program(&mut events, part);

    for note in &part.notes {
        push_note(&mut events, part.channel, note);
    }

    finish_track(events)
}

fn build_placeholder_track<'a>(score: &Score) -> Track<'a> {
    let mut events = Vec::new();
    push_track_header(&mut events, score, PLACEHOLDER_TRACK_NAME.as_bytes(), true);
    finish_track(events)
}

/// Track name, tempo map and (optionally) time signatures at their ticks
fn push_track_header<'a>(
    events: &mut Vec<TrackEvent<'a>>,
    score: &Score,
    name: &'a [u8],
    with_time_signature: bool,
) {
    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(name)),
    });

    for tempo in &score.tempos {
        events.push(TrackEvent {
            delta: (tempo.tick as u32).into(),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(
                microseconds_per_quarter(tempo.bpm).into(),
            )),
        });
    }

    if with_time_signature {
        for ts in &score.timesigs {
            events.push(TrackEvent {
                delta: (ts.tick as u32).into(),
                kind: TrackEventKind::Meta(MetaMessage::TimeSignature(
                    ts.num,
                    ts.den.trailing_zeros() as u8,
                    24, // MIDI clocks per metronome click
                    8,  // 32nd notes per quarter note
                )),
            });
        }
    }
}

fn push_program(events: &mut Vec<TrackEvent<'_>>, part: &Part) {
    if let Some(program) = part.program {
        events.push(TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Midi {
                channel: part.channel.into(),
                message: MidiMessage::ProgramChange {
                    program: program.into(),
                },
            },
        });
    }
}

/// Note-on and note-off at absolute ticks (held in `delta` until sorted)
fn push_note(events: &mut Vec<TrackEvent<'_>>, channel: u8, note: &Note) {
    events.push(TrackEvent {
        delta: (note.start_tick as u32).into(),
        kind: TrackEventKind::Midi {
            channel: channel.into(),
            message: MidiMessage::NoteOn {
                key: note.pitch.into(),
                vel: note.vel.into(),
            },
        },
    });

    events.push(TrackEvent {
        delta: (note.end_tick() as u32).into(),
        kind: TrackEventKind::Midi {
            channel: channel.into(),
            message: MidiMessage::NoteOff {
                key: note.pitch.into(),
                vel: 0.into(),
            },
        },
    });
}

/// Sort, convert to delta times and terminate a track
fn finish_track(mut events: Vec<TrackEvent<'_>>) -> Track<'_> {
    // Stable: setup events keep their order, and at equal ticks a note-off
    // lands before a note-on so repeated pitches re-strike cleanly
    events.sort_by_key(|e| (e.delta.as_int(), event_rank(&e.kind)));
    convert_to_delta_times(&mut events);

    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    events
}

fn event_rank(kind: &TrackEventKind<'_>) -> u8 {
    match kind {
        TrackEventKind::Midi {
            message: MidiMessage::NoteOff { .. },
            ..
        } => 1,
        TrackEventKind::Midi {
            message: MidiMessage::NoteOn { .. },
            ..
        } => 2,
        _ => 0,
    }
}

/// Convert absolute tick times to delta times (time since previous event)
fn convert_to_delta_times(events: &mut [TrackEvent]) {
    let mut prev_tick = 0u32;
    for event in events.iter_mut() {
        let current_tick = event.delta.as_int();
        let delta = current_tick.saturating_sub(prev_tick);
        event.delta = delta.into();
        prev_tick = current_tick;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Voice;

    fn part(voice: Voice, channel: u8, program: Option<u8>, notes: Vec<Note>) -> Part {
        Part {
            voice,
            name: voice.label().to_string(),
            channel,
            program,
            notes,
        }
    }

    fn note(start_tick: u64, dur_tick: u64, pitch: u8) -> Note {
        Note { start_tick, dur_tick, pitch, vel: 100 }
    }

    fn score(parts: Vec<Part>) -> Score {
        Score {
            tpq: 480,
            tempos: vec![Tempo { tick: 0, bpm: 120 }],
            timesigs: vec![TimeSig { tick: 0, num: 3, den: 4 }],
            parts,
        }
    }

    #[test]
    fn test_write_multi_track_smf() {
        let score = score(vec![
            part(Voice::Bass, 0, Some(32), vec![note(0, 480, 43)]),
            part(Voice::Percussion, 9, None, vec![note(0, 240, 36), note(240, 240, 38)]),
        ]);

        let mut out = Vec::new();
        write_smf(&score, &mut out).unwrap();

        assert_eq!(&out[0..4], b"MThd");
        let smf = Smf::parse(&out).unwrap();
        assert_eq!(smf.header.format, Format::Parallel);
        assert_eq!(smf.tracks.len(), 2);
    }

    #[test]
    fn test_every_track_has_tempo_first_has_meter() {
        let score = score(vec![
            part(Voice::Alto, 2, Some(40), vec![note(0, 480, 64)]),
            part(Voice::Soprano, 3, Some(73), vec![note(0, 480, 72)]),
        ]);
        let mut out = Vec::new();
        write_smf(&score, &mut out).unwrap();
        let smf = Smf::parse(&out).unwrap();

        for (index, track) in smf.tracks.iter().enumerate() {
            let has_tempo = track
                .iter()
                .any(|e| matches!(e.kind, TrackEventKind::Meta(MetaMessage::Tempo(t)) if t.as_int() == 500_000));
            let has_meter = track
                .iter()
                .any(|e| matches!(e.kind, TrackEventKind::Meta(MetaMessage::TimeSignature(3, 2, _, _))));
            assert!(has_tempo);
            assert_eq!(has_meter, index == 0);
        }
    }

    #[test]
    fn test_percussion_has_no_program_change() {
        let score = score(vec![part(Voice::Percussion, 9, None, vec![note(0, 240, 42)])]);
        let mut out = Vec::new();
        write_smf(&score, &mut out).unwrap();
        let smf = Smf::parse(&out).unwrap();

        let programs = smf.tracks[0]
            .iter()
            .filter(|e| {
                matches!(
                    e.kind,
                    TrackEventKind::Midi { message: MidiMessage::ProgramChange { .. }, .. }
                )
            })
            .count();
        assert_eq!(programs, 0);
    }

    #[test]
    fn test_note_off_before_note_on_at_same_tick() {
        // Repeated pitch: off at 480 must precede the next on at 480
        let score = score(vec![part(
            Voice::Tenor,
            1,
            Some(0),
            vec![note(0, 480, 55), note(480, 480, 55)],
        )]);
        let mut out = Vec::new();
        write_smf(&score, &mut out).unwrap();
        let smf = Smf::parse(&out).unwrap();

        let notes: Vec<(u32, bool)> = smf.tracks[0]
            .iter()
            .scan(0u32, |tick, e| {
                *tick += e.delta.as_int();
                Some((*tick, e.kind))
            })
            .filter_map(|(tick, kind)| match kind {
                TrackEventKind::Midi { message: MidiMessage::NoteOn { .. }, .. } => Some((tick, true)),
                TrackEventKind::Midi { message: MidiMessage::NoteOff { .. }, .. } => Some((tick, false)),
                _ => None,
            })
            .collect();
        assert_eq!(notes, vec![(0, true), (480, false), (480, true), (960, false)]);
    }

    #[test]
    fn test_empty_score_gets_placeholder_track() {
        let score = score(vec![]);
        let mut out = Vec::new();
        write_smf(&score, &mut out).unwrap();
        let smf = Smf::parse(&out).unwrap();
        assert_eq!(smf.tracks.len(), 1);
    }

    #[test]
    fn test_tick_overflow_is_encoding_failure() {
        let score = score(vec![part(Voice::Bass, 0, Some(0), vec![note(SMF_MAX_TICK, 480, 40)])]);
        let mut out = Vec::new();
        assert!(matches!(write_smf(&score, &mut out), Err(RenderError::EncodingFailure(_))));
    }

    #[test]
    fn test_fallback_salvages_in_range_notes() {
        let score = score(vec![
            part(Voice::Bass, 0, Some(32), vec![note(0, 480, 40), note(SMF_MAX_TICK, 480, 41)]),
            part(Voice::Percussion, 9, None, vec![note(0, 240, 36)]),
        ]);
        let mut out = Vec::new();

        let salvaged = write_single_track_fallback(&score, &mut out).unwrap();

        assert_eq!(salvaged, 2);
        let smf = Smf::parse(&out).unwrap();
        assert_eq!(smf.header.format, Format::SingleTrack);
        assert_eq!(smf.tracks.len(), 1);
        // Drums stay on the drum channel
        let drum_on = smf.tracks[0].iter().any(|e| {
            matches!(
                e.kind,
                TrackEventKind::Midi { channel, message: MidiMessage::NoteOn { .. } } if channel.as_int() == 9
            )
        });
        assert!(drum_on);
    }

    #[test]
    fn test_write_score_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overflow.mid");
        let score = score(vec![part(
            Voice::Soprano,
            3,
            Some(0),
            vec![note(0, 480, 72), note(SMF_MAX_TICK - 10, 480, 74)],
        )]);

        let outcome = write_score_file(&score, &path).unwrap();

        assert!(outcome.used_fallback);
        assert_eq!(outcome.notes_written, 1);
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(Smf::parse(&bytes).unwrap().header.format, Format::SingleTrack);
    }

    #[test]
    fn test_failed_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should go makes the final rename fail
        let path = dir.path().join("taken.mid");
        std::fs::create_dir(&path).unwrap();
        let score = score(vec![part(Voice::Bass, 0, Some(32), vec![note(0, 480, 48)])]);

        let result = write_score_file(&score, &path);

        assert!(matches!(result, Err(RenderError::Io(_))));
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["taken.mid".to_string()]);
        assert!(path.is_dir());
    }

    #[test]
    fn test_delta_time_conversion() {
        let mut events = vec![
            TrackEvent {
                delta: 0.into(),
                kind: TrackEventKind::Meta(MetaMessage::TrackName(b"Test")),
            },
            TrackEvent {
                delta: 100.into(),
                kind: TrackEventKind::Midi {
                    channel: 0.into(),
                    message: MidiMessage::NoteOn {
                        key: 60.into(),
                        vel: 64.into(),
                    },
                },
            },
            TrackEvent {
                delta: 200.into(),
                kind: TrackEventKind::Midi {
                    channel: 0.into(),
                    message: MidiMessage::NoteOff {
                        key: 60.into(),
                        vel: 0.into(),
                    },
                },
            },
        ];

        convert_to_delta_times(&mut events);

        assert_eq!(events[0].delta.as_int(), 0);
        assert_eq!(events[1].delta.as_int(), 100);
        assert_eq!(events[2].delta.as_int(), 100); // 200 - 100 = 100
    }
}
