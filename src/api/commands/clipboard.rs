//! Clipboard command module
//!
//! Handles history browsing, re-copy and monitoring control. Failures that
//! touch the system clipboard come back as `{ success: false, error }`
//! instead of an `Err`.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::core::clipboard::codec::decode_data_uri;
use crate::core::clipboard::{
    build_view, ClipboardBackend, ClipboardHistory, ClipboardMonitor, ClipboardSnapshot, ClipboardState,
};
use crate::shared::emit::{emit_event, EventBus};
use crate::shared::error::{AppError, AppResult};
use crate::shared::events::AppEvent;
use crate::shared::types::{
    ClearHistoryResponse, CommandResponse, ContentType, EntryId, HistoryEntry, HistoryView, MutationResponse,
};

#[derive(Clone)]
pub struct ClipboardCommands {
    history: ClipboardHistory,
    state: ClipboardState,
    backend: Arc<dyn ClipboardBackend>,
    events: EventBus,
    monitor: ClipboardMonitor,
}

impl ClipboardCommands {
    pub fn new(
        history: ClipboardHistory,
        state: ClipboardState,
        backend: Arc<dyn ClipboardBackend>,
        events: EventBus,
        monitor: ClipboardMonitor,
    ) -> Self {
        Self {
            history,
            state,
            backend,
            events,
            monitor,
        }
    }

    pub fn history(&self) -> &ClipboardHistory {
        &self.history
    }

    pub fn get_history(&self) -> HistoryView {
        build_view(&self.history, &self.state)
    }

    /// Write an entry back to the system clipboard. The write is recorded as
    /// last observed so the poller does not pick it up as new content.
    pub async fn copy_to_clipboard(&self, content: String, content_type: ContentType) -> CommandResponse {
        match self.write_clipboard(content, content_type).await {
            Ok(()) => CommandResponse::ok(),
            Err(e) => {
                tracing::warn!(%content_type, "failed to copy to clipboard: {}", e);
                CommandResponse::failed(e.to_string())
            }
        }
    }

    async fn write_clipboard(&self, content: String, content_type: ContentType) -> AppResult<()> {
        let backend = Arc::clone(&self.backend);
        let payload = content.clone();

        let image_digest = tokio::task::spawn_blocking(move || -> AppResult<Option<md5::Digest>> {
            match content_type {
                ContentType::Text => {
                    backend.write_text(&payload)?;
                    Ok(None)
                }
                ContentType::Image => {
                    let image = decode_data_uri(&payload)?;
                    backend.write_image(&image)?;
                    Ok(Some(image.digest()))
                }
            }
        })
        .await??;

        self.state.observe(ClipboardSnapshot::new(content, content_type), image_digest);
        Ok(())
    }

    pub async fn clear_clipboard(&self) -> CommandResponse {
        let backend = Arc::clone(&self.backend);
        let cleared = tokio::task::spawn_blocking(move || backend.clear())
            .await
            .map_err(AppError::from)
            .and_then(|result| result);

        match cleared {
            Ok(()) => {
                self.state.reset();
                tracing::info!("system clipboard cleared");
                CommandResponse::ok()
            }
            Err(e) => {
                tracing::warn!("failed to clear clipboard: {}", e);
                CommandResponse::failed(e.to_string())
            }
        }
    }

    /// Drop every entry, pinned ones included
    pub fn clear_history(&self) -> ClearHistoryResponse {
        self.history.clear();
        tracing::info!("clipboard history cleared");
        self.notify();
        ClearHistoryResponse {
            success: true,
            memory_usage: self.history.memory_usage(),
        }
    }

    pub fn delete_item(&self, id: EntryId) -> MutationResponse {
        let success = self.history.delete(id);
        if success {
            tracing::debug!(%id, "history entry deleted");
            self.notify();
        }
        self.mutation_response(success)
    }

    pub fn toggle_pin(&self, id: EntryId) -> MutationResponse {
        let toggled = self.history.toggle_pin(id);
        if let Some(entry) = &toggled {
            tracing::debug!(%id, pinned = entry.pinned, "history entry pin toggled");
            self.notify();
        }
        self.mutation_response(toggled.is_some())
    }

    pub fn search_history(&self, query: &str) -> Vec<HistoryEntry> {
        self.history.search(query)
    }

    /// `onUpdate` listener registration
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }

    /// Pause or resume the poller. Returns whether it is running afterwards.
    pub async fn set_monitoring(&self, enabled: bool) -> bool {
        if enabled {
            if !self.monitor.is_running() {
                self.monitor.start();
            }
        } else {
            self.monitor.stop().await;
        }
        self.monitor.is_running()
    }

    pub fn monitoring_status(&self) -> bool {
        self.monitor.is_running()
    }

    fn mutation_response(&self, success: bool) -> MutationResponse {
        let snapshot = self.history.snapshot();
        MutationResponse {
            success,
            entries: snapshot.entries,
            memory_usage: snapshot.memory_usage,
        }
    }

    fn notify(&self) {
        emit_event(&self.events, AppEvent::HistoryUpdated(self.get_history()));
    }
}
