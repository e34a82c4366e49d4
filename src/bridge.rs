// Webview bridges for the notation engine and the save dialog
// The engine runs in the webview; requests go out as events and come back through `engine_reply`

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tauri::{AppHandle, Emitter};
use tauri_plugin_dialog::DialogExt;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::export::{SavePathChooser, MIDI_EXTENSION};
use crate::score::{BinaryOptions, EngineError, EnginePayload, NotationEngine, RenderHandle};

pub const ENGINE_REQUEST_EVENT: &str = "score://engine-request";

const ENGINE_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
enum EngineAction {
    Render,
    GetBinary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct EngineRequest {
    id: String,
    action: EngineAction,
    document: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<BinaryOptions>,
}

/// Answer to an engine request, sent by the webview
///
/// `result` holds a render handle for `render` and an array of payloads for
/// `getBinary` (byte buffers as arrays of numbers).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineReply {
    pub id: String,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

type PendingReplies = Arc<Mutex<HashMap<String, oneshot::Sender<EngineReply>>>>;

/// Notation engine living in the webview
#[derive(Clone)]
pub struct WebviewEngine {
    app: AppHandle,
    pending: PendingReplies,
}

impl WebviewEngine {
    pub fn new(app: AppHandle) -> Self {
        WebviewEngine {
            app,
            pending: Arc::default(),
        }
    }

    /// Route a reply to the waiting request; false if nobody is waiting
    pub fn resolve(&self, reply: EngineReply) -> bool {
        let waiter = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&reply.id);
        match waiter {
            Some(tx) => tx.send(reply).is_ok(),
            None => {
                log::warn!("Engine reply {} has no pending request", reply.id);
                false
            }
        }
    }

    async fn request(
        &self,
        action: EngineAction,
        document: &str,
        options: Option<BinaryOptions>,
    ) -> Result<EngineReply, EngineError> {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.clone(), tx);

        let request = EngineRequest {
            id: id.clone(),
            action,
            document: document.to_string(),
            options,
        };
        if let Err(e) = self.app.emit(ENGINE_REQUEST_EVENT, request) {
            self.forget(&id);
            return Err(EngineError::Unavailable(e.to_string()));
        }

        match tokio::time::timeout(ENGINE_REPLY_TIMEOUT, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(EngineError::Unavailable("request was dropped".to_string())),
            Err(_) => {
                self.forget(&id);
                Err(EngineError::Unavailable(format!(
                    "no reply within {}s",
                    ENGINE_REPLY_TIMEOUT.as_secs()
                )))
            }
        }
    }

    fn forget(&self, id: &str) {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
    }
}

impl NotationEngine for WebviewEngine {
    async fn render(&self, document: &str) -> Result<RenderHandle, EngineError> {
        let reply = self.request(EngineAction::Render, document, None).await?;
        if let Some(message) = reply.error {
            return Err(EngineError::Parse(message));
        }
        serde_json::from_value(reply.result.unwrap_or_default())
            .map_err(|e| EngineError::Parse(format!("unreadable render result: {}", e)))
    }

    async fn get_binary(
        &self,
        document: &str,
        options: BinaryOptions,
    ) -> Result<Vec<EnginePayload>, EngineError> {
        let reply = self
            .request(EngineAction::GetBinary, document, Some(options))
            .await?;
        if let Some(message) = reply.error {
            return Err(EngineError::Conversion(message));
        }
        serde_json::from_value(reply.result.unwrap_or_default())
            .map_err(|e| EngineError::Conversion(format!("unreadable conversion result: {}", e)))
    }
}

/// Native save dialog with a MIDI filter
pub struct DialogSaveChooser {
    app: AppHandle,
}

impl DialogSaveChooser {
    pub fn new(app: AppHandle) -> Self {
        DialogSaveChooser { app }
    }
}

impl SavePathChooser for DialogSaveChooser {
    async fn choose(&self, suggested_name: &str) -> Option<PathBuf> {
        let (tx, rx) = oneshot::channel();
        self.app
            .dialog()
            .file()
            .set_title("Export MIDI")
            .set_file_name(suggested_name)
            .add_filter("MIDI", &[MIDI_EXTENSION, "midi"])
            .save_file(move |path| {
                let _ = tx.send(path);
            });

        rx.await.ok().flatten().and_then(|path| path.into_path().ok())
    }
}
