//! Composition data model
//!
//! Mirrors the JSON the generator produces: sections → phrases → measures
//! → beats, each beat holding the notes that start on it, per voice.
//! A received `Composition` is treated as read-only; the pipeline clones it
//! and repairs the clone.

use super::duration::DurationToken;
use super::pitch::PitchToken;
use super::time_signature::TimeSignature;
use super::tonic::Key;
use super::voice::Voice;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    pub metadata: SongMetadata,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongMetadata {
    #[serde(default)]
    pub title: String,
    /// Tempo in BPM; 0 means "use the configured default"
    #[serde(default)]
    pub tempo: u32,
    #[serde(default)]
    pub key_signature: String,
    #[serde(default)]
    pub time_signature: String,
    #[serde(default)]
    pub instruments: Instrumentation,
}

/// Program numbers for the four choir voices. Piano is fixed to program 0
/// and percussion has no program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Instrumentation {
    #[serde(default)]
    pub bass: i32,
    #[serde(default)]
    pub tenor: i32,
    #[serde(default)]
    pub alto: i32,
    #[serde(default)]
    pub soprano: i32,
}

impl Instrumentation {
    /// Raw program number for a voice, `None` for percussion
    pub fn program_for(&self, voice: Voice) -> Option<i32> {
        match voice {
            Voice::Bass => Some(self.bass),
            Voice::Tenor => Some(self.tenor),
            Voice::Alto => Some(self.alto),
            Voice::Soprano => Some(self.soprano),
            Voice::Piano => Some(0),
            Voice::Percussion => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub section_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harmonic_direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rhythmic_direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub melodic_direction: Option<String>,
    #[serde(default)]
    pub phrases: Vec<Phrase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    #[serde(default)]
    pub phrase_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phrase_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,
    /// Measure count announced by the plan, when the generator sent one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measures_per_phrase: Option<u32>,
    #[serde(default)]
    pub measures: Vec<Measure>,
}

impl Phrase {
    /// Measure count the phrase claims to have
    ///
    /// The larger of the announced count and the highest
    /// `phrase_measure_number` seen on a measure.
    pub fn declared_measure_count(&self) -> usize {
        let numbered = self
            .measures
            .iter()
            .filter_map(|m| m.phrase_measure_number)
            .max()
            .unwrap_or(0);
        numbered.max(self.measures_per_phrase.unwrap_or(0)) as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harmony_plan_for_this_measure: Option<String>,
    /// 1-based position within the phrase, as labelled by the generator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phrase_measure_number: Option<u32>,
    #[serde(default)]
    pub beats: Vec<Beat>,
}

impl Measure {
    /// A measure of `slots` empty beats
    pub fn empty(number: Option<u32>, slots: usize, voices: &BTreeSet<Voice>) -> Self {
        Measure {
            harmony_plan_for_this_measure: None,
            phrase_measure_number: number,
            beats: (0..slots).map(|i| Beat::empty(i + 1, voices)).collect(),
        }
    }

    /// Real (non-rest) onsets across the given voices
    pub fn onset_count(&self, voices: &[Voice]) -> usize {
        self.beats.iter().map(|b| b.onset_count(voices)).sum()
    }
}

/// One synchronization point: the notes each voice starts here
///
/// A voice key with an empty list means "present, nothing starts"; a
/// missing key means the voice is absent from this beat. Repair makes the
/// two cases coincide for every voice in use.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "BeatRecord", into = "BeatRecord")]
pub struct Beat {
    pub beat_counter: Option<String>,
    pub voices: BTreeMap<Voice, Vec<NoteEvent>>,
}

impl Beat {
    /// Beat with an explicit empty entry for each voice
    pub fn empty(counter: usize, voices: &BTreeSet<Voice>) -> Self {
        Beat {
            beat_counter: Some(counter.to_string()),
            voices: voices.iter().map(|v| (*v, Vec::new())).collect(),
        }
    }

    /// Notes starting on this beat for a voice (empty when absent)
    pub fn notes(&self, voice: Voice) -> &[NoteEvent] {
        self.voices.get(&voice).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mutable note list, creating an explicit entry if needed
    pub fn notes_mut(&mut self, voice: Voice) -> &mut Vec<NoteEvent> {
        self.voices.entry(voice).or_default()
    }

    pub fn has_voice(&self, voice: Voice) -> bool {
        self.voices.contains_key(&voice)
    }

    /// Real (non-rest) onsets across the given voices
    pub fn onset_count(&self, voices: &[Voice]) -> usize {
        voices
            .iter()
            .map(|v| self.notes(*v).iter().filter(|n| !n.is_rest()).count())
            .sum()
    }
}

/// A note or rest starting on a beat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// `None` is a rest
    #[serde(default)]
    pub note: Option<PitchToken>,
    pub duration: DurationToken,
}

impl NoteEvent {
    pub fn new(note: impl Into<PitchToken>, duration: impl Into<DurationToken>) -> Self {
        NoteEvent {
            note: Some(note.into()),
            duration: duration.into(),
        }
    }

    pub fn rest(duration: impl Into<DurationToken>) -> Self {
        NoteEvent {
            note: None,
            duration: duration.into(),
        }
    }

    pub fn is_rest(&self) -> bool {
        self.note.is_none()
    }
}

/// Wire form of a beat: one optional list per voice key
#[derive(Serialize, Deserialize)]
struct BeatRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    beat_counter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bass: Option<Vec<NoteEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tenor: Option<Vec<NoteEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alto: Option<Vec<NoteEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    soprano: Option<Vec<NoteEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    piano: Option<Vec<NoteEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    percussion: Option<Vec<NoteEvent>>,
}

impl From<BeatRecord> for Beat {
    fn from(record: BeatRecord) -> Self {
        let voices = [
            (Voice::Bass, record.bass),
            (Voice::Tenor, record.tenor),
            (Voice::Alto, record.alto),
            (Voice::Soprano, record.soprano),
            (Voice::Piano, record.piano),
            (Voice::Percussion, record.percussion),
        ]
        .into_iter()
        .filter_map(|(voice, notes)| notes.map(|n| (voice, n)))
        .collect();

        Beat {
            beat_counter: record.beat_counter,
            voices,
        }
    }
}

impl From<Beat> for BeatRecord {
    fn from(mut beat: Beat) -> Self {
        BeatRecord {
            beat_counter: beat.beat_counter,
            bass: beat.voices.remove(&Voice::Bass),
            tenor: beat.voices.remove(&Voice::Tenor),
            alto: beat.voices.remove(&Voice::Alto),
            soprano: beat.voices.remove(&Voice::Soprano),
            piano: beat.voices.remove(&Voice::Piano),
            percussion: beat.voices.remove(&Voice::Percussion),
        }
    }
}

impl Composition {
    /// Load the generator's JSON output
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_slice(json: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(json)?)
    }

    /// Time signature, with the 4/4 fallback flag
    pub fn time_signature(&self) -> (TimeSignature, bool) {
        TimeSignature::parse_or_default(&self.metadata.time_signature)
    }

    pub fn key(&self) -> Key {
        Key::parse_or_default(&self.metadata.key_signature)
    }

    pub fn phrases(&self) -> impl Iterator<Item = &Phrase> {
        self.sections.iter().flat_map(|s| s.phrases.iter())
    }

    pub fn phrases_mut(&mut self) -> impl Iterator<Item = &mut Phrase> {
        self.sections.iter_mut().flat_map(|s| s.phrases.iter_mut())
    }

    pub fn beats(&self) -> impl Iterator<Item = &Beat> {
        self.phrases()
            .flat_map(|p| p.measures.iter())
            .flat_map(|m| m.beats.iter())
    }

    pub fn beats_mut(&mut self) -> impl Iterator<Item = &mut Beat> {
        self.phrases_mut()
            .flat_map(|p| p.measures.iter_mut())
            .flat_map(|m| m.beats.iter_mut())
    }
}
