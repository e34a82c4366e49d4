// Data models for composition plans and generated tracks
// Field names follow the backend wire format (camelCase, `is_drum`, `abcNotes`)

use serde::{Deserialize, Serialize};

/// Song-level metadata decided by the plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongInfo {
    pub title: String,
    #[serde(default)]
    pub mood: Vec<String>,
    pub genre: String,
    /// Quarter notes per minute
    pub bpm: u32,
    pub key: String,
    pub time_signature: String,
    pub duration_seconds: f64,
}

/// Generation progress of a single instrument
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentStatus {
    #[default]
    Pending,
    Generating,
    Generated,
}

impl InstrumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentStatus::Pending => "pending",
            InstrumentStatus::Generating => "generating",
            InstrumentStatus::Generated => "generated",
        }
    }
}

/// One instrument in the plan's instrumentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentSpec {
    pub instrument_name: String,
    /// General MIDI program number (0-127)
    pub midi_program: u8,
    pub role: String,
    #[serde(rename = "is_drum", default, skip_serializing_if = "Option::is_none")]
    pub is_drum: Option<bool>,
    #[serde(default)]
    pub status: InstrumentStatus,
}

impl InstrumentSpec {
    pub fn new(name: impl Into<String>, midi_program: u8, role: impl Into<String>) -> Self {
        InstrumentSpec {
            instrument_name: name.into(),
            midi_program,
            role: role.into(),
            is_drum: None,
            status: InstrumentStatus::Pending,
        }
    }

    pub fn is_drum(&self) -> bool {
        self.is_drum.unwrap_or(false)
    }
}

/// A named section of the song structure (verse, chorus, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongSection {
    pub section: String,
    pub bars: u32,
    pub description: String,
}

/// Structural blueprint of a song
///
/// A plan is replaced wholesale on every revision. Only the `status` fields of
/// `instrumentation` change locally while tracks are generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub song_info: SongInfo,
    pub instrumentation: Vec<InstrumentSpec>,
    #[serde(default)]
    pub song_structure: Vec<SongSection>,
}

impl Plan {
    /// Total bar count across all sections
    pub fn total_bars(&self) -> u32 {
        self.song_structure.iter().map(|s| s.bars).sum()
    }

    pub fn count_with_status(&self, status: InstrumentStatus) -> usize {
        self.instrumentation
            .iter()
            .filter(|i| i.status == status)
            .count()
    }
}

/// Staff clef of a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clef {
    Treble,
    Bass,
    Alto,
    Tenor,
    #[serde(rename = "perc", alias = "percussion")]
    Percussion,
}

impl Clef {
    /// Clef keyword as written in a voice header
    pub fn as_str(&self) -> &'static str {
        match self {
            Clef::Treble => "treble",
            Clef::Bass => "bass",
            Clef::Alto => "alto",
            Clef::Tenor => "tenor",
            Clef::Percussion => "perc",
        }
    }
}

/// Generated notation for one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub instrument_name: String,
    /// ABC notation body (no tune header, no voice declaration)
    #[serde(rename = "abcNotes")]
    pub notation: String,
    pub clef: Clef,
    pub midi_program: u8,
}
