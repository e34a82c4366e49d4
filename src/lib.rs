// DeepCompose - Plan-first, track-by-track song co-composition
// Module declarations

pub mod backend;
pub mod compose;
pub mod config;
pub mod export;
pub mod plan;
pub mod score;
pub mod state;

#[cfg(feature = "desktop")]
mod bridge;
#[cfg(feature = "desktop")]
mod commands;

/// Event carrying a `CompositionSnapshot` after every state change
pub const STATE_EVENT: &str = "composition://state";

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use tauri::{Emitter, Manager};

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::default()
                        .level(log::LevelFilter::Info)
                        .build(),
                )?;
            }

            let config = config::AppConfig::load().map_err(|e| {
                log::error!("Failed to load configuration: {}", e);
                e
            })?;

            let db = state::init_db().map_err(|e| {
                log::error!("Failed to initialize database: {}", e);
                e
            })?;

            let backend = backend::LlmBackend::new(&config)?;
            if config.api_key().is_none() {
                match state::get_api_key(&db) {
                    Ok(Some(key)) => {
                        backend.set_api_key(&key);
                        log::info!("Restored saved API key");
                    }
                    Ok(None) => log::info!("No API key saved yet"),
                    Err(e) => log::warn!("Failed to read saved API key: {}", e),
                }
            }

            let sequencer =
                compose::Sequencer::new(backend).with_request_timeout(config.request_timeout());

            // Forward snapshots to the webview
            let mut updates = sequencer.subscribe();
            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                while updates.changed().await.is_ok() {
                    let snapshot = updates.borrow_and_update().clone();
                    if let Err(e) = handle.emit(STATE_EVENT, snapshot) {
                        log::warn!("Failed to emit composition state: {}", e);
                    }
                }
            });

            app.manage(db);
            app.manage(sequencer);
            app.manage(bridge::WebviewEngine::new(app.handle().clone()));

            log::info!("DeepCompose initialized with model {}", config.model());
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::submit_prompt,
            commands::generate_next_track,
            commands::get_composition,
            commands::get_score,
            commands::render_score,
            commands::export_score,
            commands::engine_reply,
            commands::validate_api_key,
            commands::set_api_key,
            commands::has_api_key,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
