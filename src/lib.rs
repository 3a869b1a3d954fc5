// Module declarations
pub mod api;
pub mod core;
pub mod shared;

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::api::commands::ClipboardCommands;
use crate::core::clipboard::{
    ClipboardBackend, ClipboardHistory, ClipboardMonitor, ClipboardState, InMemoryClipboard, SystemClipboard,
};
use crate::shared::emit::EventBus;
use crate::shared::error::AppResult;
use crate::shared::events::AppEvent;
use crate::shared::settings::{AppSettings, ClipboardSettings};

/// System clipboard, or a process-local one when the session has none
pub fn default_backend() -> Arc<dyn ClipboardBackend> {
    match SystemClipboard::new() {
        Ok(clipboard) => Arc::new(clipboard),
        Err(e) => {
            tracing::warn!("{}; falling back to in-memory clipboard", e);
            Arc::new(InMemoryClipboard::new())
        }
    }
}

/// Wire store, state, event bus and poller into one command facade.
/// Monitoring is not started.
pub fn init_clipboard(settings: &ClipboardSettings, backend: Arc<dyn ClipboardBackend>) -> ClipboardCommands {
    let history = ClipboardHistory::new(settings.memory_ceiling_bytes);
    let state = ClipboardState::new();
    let events = EventBus::new();
    let monitor = ClipboardMonitor::new(
        Arc::clone(&backend),
        history.clone(),
        state.clone(),
        events.clone(),
        settings.poll_interval(),
    )
    .with_sensitive_filter(settings.ignore_sensitive_content);

    ClipboardCommands::new(history, state, backend, events, monitor)
}

fn log_event(event: &AppEvent) {
    let view = event.view();
    tracing::info!(
        event = event.name(),
        entries = view.entries.len(),
        memory_usage = view.memory_usage,
        "history changed"
    );
}

/// Run headless until Ctrl-C, logging every history notification
pub async fn run(settings: AppSettings) -> AppResult<()> {
    let commands = init_clipboard(&settings.clipboard, default_backend());
    let mut events = commands.subscribe();

    commands.set_monitoring(true).await;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::error!("failed to listen for shutdown signal: {}", e);
                }
                break;
            }
            event = events.recv() => match event {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event log fell behind");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    commands.set_monitoring(false).await;
    tracing::info!("clipkeeper shut down");
    Ok(())
}
