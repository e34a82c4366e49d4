// Score module
// Multi-voice document assembly and the notation engine seam

pub mod assembler;
pub mod engine;

pub use assembler::{assemble, normalize_body, DEFAULT_TEMPO, DEFAULT_TIME_SIGNATURE, DEFAULT_TITLE};
pub use engine::{
    preview, BinaryOptions, EngineError, EnginePayload, NotationEngine, OutputFormat, RenderHandle,
};
