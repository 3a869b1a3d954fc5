//! Tauri IPC bindings over [`ClipboardCommands`]
//!
//! A webview shell registers these with [`attach`] and calls
//! [`forward_events`] from its setup hook.

use tauri::{AppHandle, Emitter, Runtime, State};
use tokio::sync::broadcast::error::RecvError;

use super::clipboard::ClipboardCommands;
use crate::shared::error::AppResult;
use crate::shared::events::AppEvent;
use crate::shared::types::{
    ClearHistoryResponse, CommandResponse, ContentType, EntryId, HistoryEntry, HistoryView, MutationResponse,
};

#[tauri::command]
pub fn get_history(commands: State<'_, ClipboardCommands>) -> HistoryView {
    commands.get_history()
}

#[tauri::command]
pub async fn copy_to_clipboard(
    commands: State<'_, ClipboardCommands>,
    content: String,
    content_type: ContentType,
) -> AppResult<CommandResponse> {
    Ok(commands.copy_to_clipboard(content, content_type).await)
}

#[tauri::command]
pub async fn clear_clipboard(commands: State<'_, ClipboardCommands>) -> AppResult<CommandResponse> {
    Ok(commands.clear_clipboard().await)
}

#[tauri::command]
pub fn clear_history(commands: State<'_, ClipboardCommands>) -> ClearHistoryResponse {
    commands.clear_history()
}

#[tauri::command]
pub fn delete_item(commands: State<'_, ClipboardCommands>, id: EntryId) -> MutationResponse {
    commands.delete_item(id)
}

#[tauri::command]
pub fn toggle_pin(commands: State<'_, ClipboardCommands>, id: EntryId) -> MutationResponse {
    commands.toggle_pin(id)
}

#[tauri::command]
pub fn search_history(commands: State<'_, ClipboardCommands>, query: String) -> Vec<HistoryEntry> {
    commands.search_history(&query)
}

/// Pause/resume clipboard monitoring
#[tauri::command]
pub async fn set_monitoring(commands: State<'_, ClipboardCommands>, enabled: bool) -> AppResult<bool> {
    Ok(commands.set_monitoring(enabled).await)
}

#[tauri::command]
pub fn get_monitoring_status(commands: State<'_, ClipboardCommands>) -> bool {
    commands.monitoring_status()
}

/// Manage the command state and register every handler
pub fn attach<R: Runtime>(builder: tauri::Builder<R>, commands: ClipboardCommands) -> tauri::Builder<R> {
    builder.manage(commands).invoke_handler(tauri::generate_handler![
        get_history,
        copy_to_clipboard,
        clear_clipboard,
        clear_history,
        delete_item,
        toggle_pin,
        search_history,
        set_monitoring,
        get_monitoring_status,
    ])
}

/// Re-emit bus events to every webview under their wire names
pub fn forward_events<R: Runtime>(app: AppHandle<R>, commands: &ClipboardCommands) {
    let mut rx = commands.subscribe();
    let commands = commands.clone();

    tauri::async_runtime::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "webview forwarder lagged, sending fresh history");
                    AppEvent::HistoryUpdated(commands.get_history())
                }
                Err(RecvError::Closed) => break,
            };

            if let Err(e) = app.emit(event.name(), event.view().clone()) {
                tracing::error!(event = event.name(), "failed to emit event to webview: {}", e);
            }
        }
    });
}
