// Backend contract types
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::plan::{InstrumentSpec, Plan, PlanError, Track};

/// Errors from a generation request
///
/// Every variant leaves composition state as it was before the request.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Backend responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Backend returned an empty response")]
    EmptyResponse,

    #[error("Malformed payload: {message}. Raw response: '{excerpt}'")]
    MalformedPayload { message: String, excerpt: String },

    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid plan: {0}")]
    InvalidPlan(#[from] PlanError),

    #[error("Invalid track: {0}")]
    InvalidTrack(PlanError),

    #[error("No API key configured")]
    MissingApiKey,

    #[error("Backend did not answer within {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Plan creation (no `plan`) or revision (`plan` and `tracks` given)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracks: Option<Vec<Track>>,
}

impl PlanRequest {
    pub fn create(content: impl Into<String>) -> Self {
        PlanRequest {
            content: content.into(),
            plan: None,
            tracks: None,
        }
    }

    pub fn revise(content: impl Into<String>, plan: Plan, tracks: Vec<Track>) -> Self {
        PlanRequest {
            content: content.into(),
            plan: Some(plan),
            tracks: Some(tracks),
        }
    }

    pub fn is_revision(&self) -> bool {
        self.plan.is_some()
    }
}

/// Request for one instrument's track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    pub plan: Plan,
    pub existing_tracks: Vec<Track>,
    pub instrument_to_generate: InstrumentSpec,
}

/// Service that produces plans and tracks
pub trait GenerationBackend: Send + Sync {
    fn generate_plan(
        &self,
        request: PlanRequest,
    ) -> impl Future<Output = Result<Plan, BackendError>> + Send;

    fn generate_track(
        &self,
        request: TrackRequest,
    ) -> impl Future<Output = Result<Track, BackendError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_omits_plan() {
        let request = PlanRequest::create("a sad piano ballad");
        assert!(!request.is_revision());

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, serde_json::json!({"content": "a sad piano ballad"}));
    }

    #[test]
    fn test_timeout_message() {
        let err = BackendError::Timeout(Duration::from_secs(300));
        assert_eq!(err.to_string(), "Backend did not answer within 300s");
    }
}
