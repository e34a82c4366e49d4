// Tauri IPC Commands
use serde::Serialize;
use tauri::{AppHandle, State};

use crate::backend::LlmBackend;
use crate::bridge::{DialogSaveChooser, EngineReply, WebviewEngine};
use crate::compose::{CompositionSnapshot, Sequencer};
use crate::export::{ExportOutcome, ExportPipeline, FsWriter};
use crate::plan::{Plan, Track};
use crate::score::{self, RenderHandle};
use crate::state::{self, DbConnection};

pub type AppSequencer = Sequencer<LlmBackend>;

#[derive(Debug, Serialize)]
pub struct CommandError {
    message: String,
}

impl<E: std::fmt::Display> From<E> for CommandError {
    fn from(error: E) -> Self {
        CommandError {
            message: error.to_string(),
        }
    }
}

type CommandResult<T> = Result<T, CommandError>;

// ==================== COMPOSITION COMMANDS ====================

#[tauri::command]
pub async fn submit_prompt(
    sequencer: State<'_, AppSequencer>,
    text: String,
) -> CommandResult<Option<Plan>> {
    Ok(sequencer.submit_prompt(&text).await?)
}

#[tauri::command]
pub async fn generate_next_track(
    sequencer: State<'_, AppSequencer>,
) -> CommandResult<Option<Track>> {
    Ok(sequencer.generate_next_track().await?)
}

#[tauri::command]
pub fn get_composition(sequencer: State<'_, AppSequencer>) -> CompositionSnapshot {
    sequencer.snapshot()
}

#[tauri::command]
pub fn get_score(sequencer: State<'_, AppSequencer>) -> String {
    sequencer.score_document()
}

// ==================== SCORE COMMANDS ====================

#[tauri::command]
pub async fn render_score(
    sequencer: State<'_, AppSequencer>,
    engine: State<'_, WebviewEngine>,
) -> CommandResult<Option<RenderHandle>> {
    let snapshot = sequencer.snapshot();
    let Some(plan) = snapshot.plan else {
        return Ok(None);
    };
    Ok(score::preview(engine.inner(), &plan.song_info, &snapshot.tracks).await?)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub saved: bool,
    pub path: Option<String>,
    pub bytes: usize,
}

#[tauri::command]
pub async fn export_score(
    app: AppHandle,
    sequencer: State<'_, AppSequencer>,
    engine: State<'_, WebviewEngine>,
) -> CommandResult<ExportSummary> {
    let document = sequencer.score_document();
    let suggested_name = sequencer.suggested_file_name();

    let pipeline = ExportPipeline::new(
        engine.inner().clone(),
        DialogSaveChooser::new(app),
        FsWriter,
    );
    let summary = match pipeline.export(&document, &suggested_name).await? {
        ExportOutcome::Saved { path, bytes } => ExportSummary {
            saved: true,
            path: Some(path.to_string_lossy().to_string()),
            bytes: bytes.len(),
        },
        ExportOutcome::Cancelled => ExportSummary {
            saved: false,
            path: None,
            bytes: 0,
        },
    };
    Ok(summary)
}

#[tauri::command]
pub fn engine_reply(engine: State<'_, WebviewEngine>, reply: EngineReply) -> bool {
    engine.resolve(reply)
}

// ==================== CREDENTIAL COMMANDS ====================

#[tauri::command]
pub async fn validate_api_key(
    sequencer: State<'_, AppSequencer>,
    db: State<'_, DbConnection>,
    key: String,
) -> CommandResult<bool> {
    let valid = sequencer.backend().validate_api_key(&key).await;
    if valid {
        state::set_api_key(&db, &key)?;
    }
    Ok(valid)
}

#[tauri::command]
pub fn set_api_key(
    sequencer: State<'_, AppSequencer>,
    db: State<'_, DbConnection>,
    key: String,
) -> CommandResult<()> {
    sequencer.backend().set_api_key(&key);
    state::set_api_key(&db, &key)?;
    log::info!("API key updated");
    Ok(())
}

#[tauri::command]
pub fn has_api_key(sequencer: State<'_, AppSequencer>) -> bool {
    sequencer.backend().has_api_key()
}
