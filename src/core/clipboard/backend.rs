//! Platform clipboard access
//!
//! The monitor and the command layer only see [`ClipboardBackend`], so the
//! history logic runs the same against the real system clipboard and the
//! in-memory fallback.

use std::borrow::Cow;
use std::sync::{Mutex, MutexGuard};
use arboard::{Clipboard, ImageData};

use crate::shared::error::{AppError, AppResult};

/// Raw RGBA8 image as read from or written to the clipboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardImage {
    pub width: usize,
    pub height: usize,
    pub bytes: Vec<u8>,
}

impl ClipboardImage {
    pub fn digest(&self) -> md5::Digest {
        md5::compute(&self.bytes)
    }
}

pub trait ClipboardBackend: Send + Sync {
    /// `Ok(None)` when the clipboard holds no text
    fn read_text(&self) -> AppResult<Option<String>>;
    /// `Ok(None)` when the clipboard holds no image
    fn read_image(&self) -> AppResult<Option<ClipboardImage>>;
    fn write_text(&self, text: &str) -> AppResult<()>;
    fn write_image(&self, image: &ClipboardImage) -> AppResult<()>;
    fn clear(&self) -> AppResult<()>;
}

/// System clipboard via arboard
pub struct SystemClipboard {
    clipboard: Mutex<Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> AppResult<Self> {
        let clipboard = Clipboard::new()
            .map_err(|e| AppError::Clipboard(format!("System clipboard unavailable: {}", e)))?;
        Ok(Self {
            clipboard: Mutex::new(clipboard),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Clipboard> {
        match self.clipboard.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("system clipboard mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl ClipboardBackend for SystemClipboard {
    fn read_text(&self) -> AppResult<Option<String>> {
        match self.lock().get_text() {
            Ok(text) if text.is_empty() => Ok(None),
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read_image(&self) -> AppResult<Option<ClipboardImage>> {
        match self.lock().get_image() {
            Ok(image) => Ok(Some(ClipboardImage {
                width: image.width,
                height: image.height,
                bytes: image.bytes.into_owned(),
            })),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_text(&self, text: &str) -> AppResult<()> {
        self.lock().set_text(text)?;
        Ok(())
    }

    fn write_image(&self, image: &ClipboardImage) -> AppResult<()> {
        let data = ImageData {
            width: image.width,
            height: image.height,
            bytes: Cow::Borrowed(image.bytes.as_slice()),
        };
        self.lock().set_image(data)?;
        Ok(())
    }

    fn clear(&self) -> AppResult<()> {
        self.lock().clear()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
enum MemoryContent {
    #[default]
    Empty,
    Text(String),
    Image(ClipboardImage),
}

/// Process-local clipboard, used when no system clipboard is reachable
#[derive(Default)]
pub struct InMemoryClipboard {
    content: Mutex<MemoryContent>,
}

impl InMemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryContent> {
        match self.content.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ClipboardBackend for InMemoryClipboard {
    fn read_text(&self) -> AppResult<Option<String>> {
        match &*self.lock() {
            MemoryContent::Text(text) if !text.is_empty() => Ok(Some(text.clone())),
            _ => Ok(None),
        }
    }

    fn read_image(&self) -> AppResult<Option<ClipboardImage>> {
        match &*self.lock() {
            MemoryContent::Image(image) => Ok(Some(image.clone())),
            _ => Ok(None),
        }
    }

    fn write_text(&self, text: &str) -> AppResult<()> {
        *self.lock() = MemoryContent::Text(text.to_string());
        Ok(())
    }

    fn write_image(&self, image: &ClipboardImage) -> AppResult<()> {
        *self.lock() = MemoryContent::Image(image.clone());
        Ok(())
    }

    fn clear(&self) -> AppResult<()> {
        *self.lock() = MemoryContent::Empty;
        Ok(())
    }
}
