//! Clipboard history core: the in-memory store, the poll loop and the
//! platform clipboard they read from.

pub mod backend;
pub mod codec;
pub mod filter;
pub mod history;
pub mod monitor;
pub mod state;

pub use backend::{ClipboardBackend, ClipboardImage, InMemoryClipboard, SystemClipboard};
pub use history::ClipboardHistory;
pub use monitor::{ClipboardMonitor, TickOutcome};
pub use state::{ClipboardSnapshot, ClipboardState};

use crate::shared::types::HistoryView;

/// Store contents plus the current clipboard value, as sent to listeners
pub fn build_view(history: &ClipboardHistory, state: &ClipboardState) -> HistoryView {
    let snapshot = history.snapshot();
    let current = state.current();
    HistoryView {
        entries: snapshot.entries,
        content_type: current.as_ref().map(|c| c.content_type),
        current_content: current.map(|c| c.content),
        memory_usage: snapshot.memory_usage,
    }
}
