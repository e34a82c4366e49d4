// Composition module
// Generation sequencing, composition state and the conversation transcript

pub mod conversation;
pub mod sequencer;

pub use conversation::{ConversationEntry, ConversationLog, Role};
pub use sequencer::{CompositionSnapshot, Sequencer, SequencerError};
