use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of payload held by a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Image,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Text => write!(f, "text"),
            ContentType::Image => write!(f, "image"),
        }
    }
}

/// Identifier of a history entry.
///
/// Handed out by a per-store counter, so an id is never reused while the
/// store lives. Promotion assigns a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single retained clipboard snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: EntryId,
    /// Raw text, or a `data:` URI for images
    pub content: String,
    pub content_type: ContentType,
    pub timestamp: DateTime<Utc>,
    /// Byte length of `content` at last write
    pub size: u64,
    pub pinned: bool,
}

impl HistoryEntry {
    /// Short, char-boundary safe preview for log lines
    pub fn preview(&self, max_chars: usize) -> String {
        match self.content_type {
            ContentType::Image => format!("[image, {} bytes]", self.size),
            ContentType::Text => {
                let mut chars = self.content.chars();
                let head: String = chars.by_ref().take(max_chars).collect();
                if chars.next().is_some() {
                    format!("{}...", head)
                } else {
                    head
                }
            }
        }
    }
}

/// Store state captured under a single lock
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    /// Pinned entries first, then unpinned, each group newest first
    pub entries: Vec<HistoryEntry>,
    pub memory_usage: u64,
}

/// Payload of `getHistory` and of every update notification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryView {
    pub entries: Vec<HistoryEntry>,
    pub current_content: Option<String>,
    pub content_type: Option<ContentType>,
    pub memory_usage: u64,
}

/// Result of commands that touch the system clipboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResponse {
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearHistoryResponse {
    pub success: bool,
    pub memory_usage: u64,
}

/// Result of per-item mutations (delete, pin toggle)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    /// `false` when the id was unknown
    pub success: bool,
    pub entries: Vec<HistoryEntry>,
    pub memory_usage: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_entry(content: &str) -> HistoryEntry {
        HistoryEntry {
            id: EntryId(7),
            content: content.to_string(),
            content_type: ContentType::Text,
            timestamp: Utc::now(),
            size: content.len() as u64,
            pinned: false,
        }
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let entry = text_entry("héllo wörld");
        assert_eq!(entry.preview(5), "héllo...");
        assert_eq!(entry.preview(50), "héllo wörld");
    }

    #[test]
    fn test_preview_hides_image_payload() {
        let mut entry = text_entry("data:image/png;base64,AAAA");
        entry.content_type = ContentType::Image;
        assert_eq!(entry.preview(5), "[image, 26 bytes]");
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let json = serde_json::to_value(text_entry("a")).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["contentType"], "text");
        assert_eq!(json["pinned"], false);
    }

    #[test]
    fn test_command_response_omits_empty_error() {
        let json = serde_json::to_string(&CommandResponse::ok()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);
    }
}
