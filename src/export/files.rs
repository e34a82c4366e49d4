// File seams for export: destination chooser and byte writer
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use crate::score::DEFAULT_TITLE;

/// Extension of exported score files
pub const MIDI_EXTENSION: &str = "mid";

/// Asks the user where to save a file
pub trait SavePathChooser: Send + Sync {
    /// Returns the chosen path, or `None` if the user cancelled
    fn choose(&self, suggested_name: &str) -> impl Future<Output = Option<PathBuf>> + Send;
}

/// Writes a byte buffer to a path
pub trait ByteWriter: Send + Sync {
    fn write(&self, path: &Path, bytes: &[u8]) -> impl Future<Output = io::Result<()>> + Send;
}

/// Writes files through tokio's filesystem API
#[derive(Debug, Clone, Copy, Default)]
pub struct FsWriter;

impl ByteWriter for FsWriter {
    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        tokio::fs::write(path, bytes).await
    }
}

/// Default export file name derived from the song title
///
/// Characters that are not valid in file names on common platforms are
/// replaced with `_`.
pub fn suggested_file_name(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = stem.trim_matches('.').trim();
    let stem = if stem.is_empty() { DEFAULT_TITLE } else { stem };
    format!("{}.{}", stem, MIDI_EXTENSION)
}
