// LLM generation backend
// OpenAI-compatible chat completions client that answers with JSON plans and tracks

use serde::{Deserialize, Serialize};
use std::sync::RwLock;

use super::parse::decode_payload;
use super::prompt::{plan_prompt, track_prompt, track_request_line};
use super::types::{BackendError, GenerationBackend, PlanRequest, TrackRequest};
use crate::config::AppConfig;
use crate::plan::{Plan, Track};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
    }
}

/// Generation backend backed by a chat-completions model
pub struct LlmBackend {
    http: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    api_key: RwLock<Option<String>>,
}

impl LlmBackend {
    pub fn new(config: &AppConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder().use_rustls_tls().build()?;
        Ok(LlmBackend {
            http,
            base_url: config.api_base_url().trim_end_matches('/').to_string(),
            model: config.model().to_string(),
            temperature: config.temperature(),
            api_key: RwLock::new(config.api_key().map(str::to_string)),
        })
    }

    /// Install the key used for subsequent requests
    pub fn set_api_key(&self, key: &str) {
        let key = key.trim();
        let mut slot = self.api_key.write().unwrap_or_else(|e| e.into_inner());
        *slot = if key.is_empty() { None } else { Some(key.to_string()) };
    }

    pub fn has_api_key(&self) -> bool {
        self.current_key().is_some()
    }

    /// Check a key against the provider and install it if it works
    pub async fn validate_api_key(&self, key: &str) -> bool {
        let key = key.trim();
        if key.is_empty() {
            return false;
        }

        let result = self
            .http
            .get(self.endpoint("models"))
            .bearer_auth(key)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                self.set_api_key(key);
                log::info!("API key validated against {}", self.base_url);
                true
            }
            Ok(response) => {
                log::warn!("API key rejected with status {}", response.status());
                false
            }
            Err(e) => {
                log::warn!("API key validation failed: {}", e);
                false
            }
        }
    }

    fn current_key(&self) -> Option<String> {
        self.api_key
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Run one chat completion and return the message content
    async fn complete(&self, system: &str, user: &str) -> Result<String, BackendError> {
        let key = self.current_key().ok_or(BackendError::MissingApiKey)?;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .http
            .post(self.endpoint("chat/completions"))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed.into_content().ok_or(BackendError::EmptyResponse)
    }
}

impl GenerationBackend for LlmBackend {
    async fn generate_plan(&self, request: PlanRequest) -> Result<Plan, BackendError> {
        let system = plan_prompt(request.plan.as_ref(), request.tracks.as_deref())?;
        log::debug!(
            "Requesting plan ({})",
            if request.is_revision() { "revision" } else { "create" }
        );

        let content = self.complete(&system, &request.content).await?;
        decode_payload(&content)
    }

    async fn generate_track(&self, request: TrackRequest) -> Result<Track, BackendError> {
        let system = track_prompt(
            &request.plan,
            &request.existing_tracks,
            &request.instrument_to_generate,
        )?;
        let user = track_request_line(&request.instrument_to_generate)?;
        log::debug!(
            "Requesting track for '{}'",
            request.instrument_to_generate.instrument_name
        );

        let content = self.complete(&system, &user).await?;
        decode_payload(&content)
    }
}
