use serde::Serialize;
use super::types::HistoryView;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload")] // Tagged enum for easier frontend parsing
pub enum AppEvent {
    /// Insert/promote, delete, clear or pin toggle
    #[serde(rename = "clipboard://updated")]
    HistoryUpdated(HistoryView),

    /// The system clipboard was emptied outside this app
    #[serde(rename = "clipboard://cleared")]
    ClipboardCleared(HistoryView),
}

impl AppEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            AppEvent::HistoryUpdated(_) => "clipboard://updated",
            AppEvent::ClipboardCleared(_) => "clipboard://cleared",
        }
    }

    pub fn view(&self) -> &HistoryView {
        match self {
            AppEvent::HistoryUpdated(view) | AppEvent::ClipboardCleared(view) => view,
        }
    }
}
