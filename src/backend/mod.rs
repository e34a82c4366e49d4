// Generation backend module
// Request/response contract for plan and track generation, plus the LLM client

pub mod llm;
pub mod parse;
pub mod prompt;
pub mod types;

pub use llm::LlmBackend;
pub use parse::{decode_payload, strip_code_fence};
pub use types::{BackendError, GenerationBackend, PlanRequest, TrackRequest};
