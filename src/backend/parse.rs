// Decoding of model output into typed payloads
use serde::de::DeserializeOwned;

use super::types::BackendError;

/// Characters of raw output quoted in decode errors
const EXCERPT_CHARS: usize = 150;

/// Remove a surrounding Markdown code fence, if any
///
/// Models asked for JSON sometimes wrap it in ```json ... ```.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening fence line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Decode model output as JSON into `T`
pub fn decode_payload<T: DeserializeOwned>(raw: &str) -> Result<T, BackendError> {
    let json = strip_code_fence(raw);
    if json.is_empty() {
        return Err(BackendError::EmptyResponse);
    }
    serde_json::from_str(json).map_err(|e| BackendError::MalformedPayload {
        message: e.to_string(),
        excerpt: json.chars().take(EXCERPT_CHARS).collect(),
    })
}
