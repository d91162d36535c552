//! The six logical parts of a composition

use serde::{Deserialize, Serialize};
use std::fmt;

/// Voice enumeration, ordered the way tracks are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Bass,
    Tenor,
    Alto,
    Soprano,
    Piano,
    Percussion,
}

impl Voice {
    /// All voices in track order
    pub const ALL: [Voice; 6] = [
        Voice::Bass,
        Voice::Tenor,
        Voice::Alto,
        Voice::Soprano,
        Voice::Piano,
        Voice::Percussion,
    ];

    /// The four voices that carry a synthesized closing chord
    pub const CHOIR: [Voice; 4] = [Voice::Bass, Voice::Tenor, Voice::Alto, Voice::Soprano];

    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Bass => "bass",
            Voice::Tenor => "tenor",
            Voice::Alto => "alto",
            Voice::Soprano => "soprano",
            Voice::Piano => "piano",
            Voice::Percussion => "percussion",
        }
    }

    /// Display name used for track names
    pub fn label(&self) -> &'static str {
        match self {
            Voice::Bass => "Bass",
            Voice::Tenor => "Tenor",
            Voice::Alto => "Alto",
            Voice::Soprano => "Soprano",
            Voice::Piano => "Piano",
            Voice::Percussion => "Percussion",
        }
    }

    pub fn is_percussion(&self) -> bool {
        matches!(self, Voice::Percussion)
    }

    /// Everything except percussion has pitched notes
    pub fn is_melodic(&self) -> bool {
        !self.is_percussion()
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
