// Export Pipeline - Score document to MIDI file
// Engine conversion, destination prompt, then a single file write

use std::path::PathBuf;
use thiserror::Error;

use super::files::{ByteWriter, SavePathChooser};
use crate::score::{BinaryOptions, EngineError, NotationEngine};

/// Errors that can occur while exporting a score
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("There is no score to export yet")]
    EmptyScore,

    #[error("Engine returned an unexpected format: {0}")]
    UnexpectedFormat(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Failed to write {}: {source}", .path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What an export run did
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    /// The file was written
    Saved { path: PathBuf, bytes: Vec<u8> },
    /// The user dismissed the save dialog; nothing was written
    Cancelled,
}

/// Convert a document to MIDI bytes through the engine
///
/// Takes the first payload of the conversion result, which must be a byte
/// buffer holding a Standard MIDI File.
pub async fn render_binary<E: NotationEngine>(
    engine: &E,
    document: &str,
) -> Result<Vec<u8>, ExportError> {
    if document.trim().is_empty() {
        return Err(ExportError::EmptyScore);
    }

    let payloads = engine.get_binary(document, BinaryOptions::default()).await?;
    let tune_count = payloads.len();
    let first = payloads.into_iter().next().ok_or_else(|| {
        ExportError::UnexpectedFormat("conversion returned no payloads".to_string())
    })?;

    let kind = first.kind();
    let bytes = first.into_bytes().ok_or_else(|| {
        ExportError::UnexpectedFormat(format!("expected a byte buffer, got {}", kind))
    })?;

    midly::Smf::parse(&bytes).map_err(|e| {
        ExportError::UnexpectedFormat(format!("payload is not a Standard MIDI File: {}", e))
    })?;

    if tune_count > 1 {
        log::warn!("Engine produced {} tunes, exporting the first", tune_count);
    }
    Ok(bytes)
}

/// Export pipeline wiring an engine, a destination chooser and a writer
pub struct ExportPipeline<E, C, W> {
    engine: E,
    chooser: C,
    writer: W,
}

impl<E, C, W> ExportPipeline<E, C, W>
where
    E: NotationEngine,
    C: SavePathChooser,
    W: ByteWriter,
{
    pub fn new(engine: E, chooser: C, writer: W) -> Self {
        ExportPipeline {
            engine,
            chooser,
            writer,
        }
    }

    /// Export a document as a MIDI file
    ///
    /// Conversion happens before the user is asked for a path, so a broken
    /// score never opens a dialog. Cancelling the dialog is not an error.
    pub async fn export(
        &self,
        document: &str,
        suggested_name: &str,
    ) -> Result<ExportOutcome, ExportError> {
        let bytes = render_binary(&self.engine, document).await?;

        let Some(path) = self.chooser.choose(suggested_name).await else {
            log::info!("Export cancelled");
            return Ok(ExportOutcome::Cancelled);
        };

        self.writer
            .write(&path, &bytes)
            .await
            .map_err(|source| ExportError::FileWrite {
                path: path.clone(),
                source,
            })?;

        log::info!("Exported {} bytes to {}", bytes.len(), path.display());
        Ok(ExportOutcome::Saved { path, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::files::FsWriter;
    use crate::score::{EnginePayload, RenderHandle};
    use midly::{Format, Header, MetaMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};
    use std::io;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    const DOCUMENT: &str = "X: 1\nT: Rain\nM: 4/4\nQ: 1/4=70\nV: 0 name=\"Piano\" clef=treble\n%%MIDI program 0\nC4 |";

    fn midi_bytes() -> Vec<u8> {
        let mut track = Track::new();
        track.push(TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        let smf = Smf {
            header: Header {
                format: Format::SingleTrack,
                timing: Timing::Metrical(480.into()),
            },
            tracks: vec![track],
        };
        let mut bytes = Vec::new();
        smf.write(&mut bytes).unwrap();
        bytes
    }

    struct FakeEngine {
        payloads: Vec<EnginePayload>,
        calls: AtomicUsize,
    }

    impl FakeEngine {
        fn returning(payloads: Vec<EnginePayload>) -> Self {
            FakeEngine {
                payloads,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl NotationEngine for FakeEngine {
        async fn render(&self, _document: &str) -> Result<RenderHandle, EngineError> {
            Ok(RenderHandle::default())
        }

        async fn get_binary(
            &self,
            _document: &str,
            _options: BinaryOptions,
        ) -> Result<Vec<EnginePayload>, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.payloads.clone())
        }
    }

    struct FixedChooser {
        path: Option<PathBuf>,
        asked: AtomicUsize,
    }

    impl FixedChooser {
        fn new(path: Option<PathBuf>) -> Self {
            FixedChooser {
                path,
                asked: AtomicUsize::new(0),
            }
        }
    }

    impl SavePathChooser for FixedChooser {
        async fn choose(&self, _suggested_name: &str) -> Option<PathBuf> {
            self.asked.fetch_add(1, Ordering::SeqCst);
            self.path.clone()
        }
    }

    #[derive(Default)]
    struct RecordingWriter {
        writes: Mutex<Vec<(PathBuf, Vec<u8>)>>,
    }

    impl ByteWriter for RecordingWriter {
        async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
            self.writes
                .lock()
                .unwrap()
                .push((path.to_path_buf(), bytes.to_vec()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_empty_document_fails_without_writing() {
        let pipeline = ExportPipeline::new(
            FakeEngine::returning(vec![EnginePayload::Bytes(midi_bytes())]),
            FixedChooser::new(Some(PathBuf::from("/tmp/x.mid"))),
            RecordingWriter::default(),
        );

        let result = pipeline.export("", "Rain.mid").await;
        assert!(matches!(result, Err(ExportError::EmptyScore)));
        assert_eq!(pipeline.engine.calls.load(Ordering::SeqCst), 0);
        assert_eq!(pipeline.chooser.asked.load(Ordering::SeqCst), 0);
        assert!(pipeline.writer.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_payloads_is_unexpected_format() {
        let engine = FakeEngine::returning(Vec::new());
        let result = render_binary(&engine, DOCUMENT).await;
        assert!(matches!(result, Err(ExportError::UnexpectedFormat(_))));
    }

    #[tokio::test]
    async fn test_non_bytes_payload_is_unexpected_format() {
        let engine = FakeEngine::returning(vec![EnginePayload::Other(serde_json::json!("MThd"))]);
        let err = render_binary(&engine, DOCUMENT).await.unwrap_err();
        assert!(err.to_string().contains("got string"));
    }

    #[tokio::test]
    async fn test_bytes_that_are_not_midi_are_rejected() {
        let engine = FakeEngine::returning(vec![EnginePayload::Bytes(vec![1, 2, 3, 4])]);
        let result = render_binary(&engine, DOCUMENT).await;
        assert!(matches!(result, Err(ExportError::UnexpectedFormat(_))));
    }

    #[tokio::test]
    async fn test_first_payload_is_exported() {
        let midi = midi_bytes();
        let pipeline = ExportPipeline::new(
            FakeEngine::returning(vec![
                EnginePayload::Bytes(midi.clone()),
                EnginePayload::Other(serde_json::Value::Null),
            ]),
            FixedChooser::new(Some(PathBuf::from("/music/Rain.mid"))),
            RecordingWriter::default(),
        );

        let outcome = pipeline.export(DOCUMENT, "Rain.mid").await.unwrap();
        assert_eq!(
            outcome,
            ExportOutcome::Saved {
                path: PathBuf::from("/music/Rain.mid"),
                bytes: midi.clone(),
            }
        );

        let writes = pipeline.writer.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1, midi);
    }

    #[tokio::test]
    async fn test_cancelled_dialog_is_a_no_op() {
        let pipeline = ExportPipeline::new(
            FakeEngine::returning(vec![EnginePayload::Bytes(midi_bytes())]),
            FixedChooser::new(None),
            RecordingWriter::default(),
        );

        let outcome = pipeline.export(DOCUMENT, "Rain.mid").await.unwrap();
        assert_eq!(outcome, ExportOutcome::Cancelled);
        assert!(pipeline.writer.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_is_file_write_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("no_such_dir").join("Rain.mid");
        let pipeline = ExportPipeline::new(
            FakeEngine::returning(vec![EnginePayload::Bytes(midi_bytes())]),
            FixedChooser::new(Some(path.clone())),
            FsWriter,
        );

        let err = pipeline.export(DOCUMENT, "Rain.mid").await.unwrap_err();
        match err {
            ExportError::FileWrite { path: failed, .. } => assert_eq!(failed, path),
            other => panic!("Expected FileWrite, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_repeated_export_writes_identical_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Rain.mid");
        let pipeline = ExportPipeline::new(
            FakeEngine::returning(vec![EnginePayload::Bytes(midi_bytes())]),
            FixedChooser::new(Some(path.clone())),
            FsWriter,
        );

        pipeline.export(DOCUMENT, "Rain.mid").await.unwrap();
        let first = std::fs::read(&path).unwrap();
        pipeline.export(DOCUMENT, "Rain.mid").await.unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert!(Smf::parse(&second).is_ok());
    }
}
