// Notation engine abstraction
// The engine parses ABC, renders and plays it, and converts it to MIDI bytes

use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

use super::assembler::assemble;
use crate::plan::{SongInfo, Track};

/// Errors reported by a notation engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Notation parse error: {0}")]
    Parse(String),

    #[error("Binary conversion failed: {0}")]
    Conversion(String),

    #[error("Notation engine unavailable: {0}")]
    Unavailable(String),
}

/// Output type requested from a binary conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Binary,
}

/// Options passed through to the engine's conversion call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryOptions {
    pub format: OutputFormat,
}

/// One element of an engine conversion result
///
/// Engines return one payload per tune. Anything that is not a byte buffer
/// is kept as raw JSON so the caller can report what it got.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnginePayload {
    Bytes(Vec<u8>),
    Other(serde_json::Value),
}

impl EnginePayload {
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            EnginePayload::Bytes(bytes) => Some(bytes),
            EnginePayload::Other(_) => None,
        }
    }

    /// Short description of the payload type, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            EnginePayload::Bytes(_) => "bytes",
            EnginePayload::Other(serde_json::Value::Null) => "null",
            EnginePayload::Other(serde_json::Value::Bool(_)) => "boolean",
            EnginePayload::Other(serde_json::Value::Number(_)) => "number",
            EnginePayload::Other(serde_json::Value::String(_)) => "string",
            EnginePayload::Other(serde_json::Value::Array(_)) => "array",
            EnginePayload::Other(serde_json::Value::Object(_)) => "object",
        }
    }
}

/// Result of a successful render
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderHandle {
    /// Number of tunes the engine found in the document
    pub tunes: usize,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Rendering/playback engine for notation documents
pub trait NotationEngine: Send + Sync {
    /// Parse and display a document
    fn render(
        &self,
        document: &str,
    ) -> impl Future<Output = Result<RenderHandle, EngineError>> + Send;

    /// Convert a document to binary sound-file payloads, one per tune
    fn get_binary(
        &self,
        document: &str,
        options: BinaryOptions,
    ) -> impl Future<Output = Result<Vec<EnginePayload>, EngineError>> + Send;
}

/// Assemble the current score and render it
///
/// Returns `Ok(None)` without touching the engine when there is nothing to
/// render yet.
pub async fn preview<E: NotationEngine>(
    engine: &E,
    song: &SongInfo,
    tracks: &[Track],
) -> Result<Option<RenderHandle>, EngineError> {
    let document = assemble(song, tracks);
    if document.is_empty() {
        log::debug!("Skipping render: no tracks yet");
        return Ok(None);
    }

    let handle = engine.render(&document).await?;
    for warning in &handle.warnings {
        log::warn!("Notation warning: {}", warning);
    }
    Ok(Some(handle))
}
