// Conversation Log
// Append-only transcript of user prompts and assistant replies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::plan::Plan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEntry {
    /// Unique id, prefixed with the role (e.g. `user-<uuid>`)
    pub id: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Plan snapshot attached to an assistant reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    pub created_at: DateTime<Utc>,
}

impl ConversationEntry {
    fn new(role: Role, content: Option<String>, plan: Option<Plan>) -> Self {
        ConversationEntry {
            id: format!("{}-{}", role.as_str(), Uuid::new_v4()),
            role,
            content,
            plan,
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, Some(text.into()), None)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, Some(text.into()), None)
    }

    pub fn assistant_plan(plan: Plan) -> Self {
        Self::new(Role::Assistant, None, Some(plan))
    }
}

/// Transcript storage; entries are never removed or reordered
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    entries: Vec<ConversationEntry>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: ConversationEntry) {
        self.entries.push(entry);
    }

    pub fn read_all(&self) -> &[ConversationEntry] {
        &self.entries
    }

}
