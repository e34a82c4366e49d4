// Export module
// Turns the assembled score into a MIDI file at a user-chosen location

pub mod files;
pub mod pipeline;

pub use files::{suggested_file_name, ByteWriter, FsWriter, SavePathChooser, MIDI_EXTENSION};
pub use pipeline::{render_binary, ExportError, ExportOutcome, ExportPipeline};
