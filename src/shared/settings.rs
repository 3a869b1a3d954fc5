use serde::{Deserialize, Serialize};
use tokio::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use directories::ProjectDirs;

use super::error::{AppError, AppResult};

const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_MEMORY_CEILING_BYTES: u64 = 500 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppSettings {
    pub clipboard: ClipboardSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardSettings {
    pub poll_interval_ms: u64,
    /// Soft budget for retained history; pinned entries may exceed it
    pub memory_ceiling_bytes: u64,
    /// Skip text that looks like a credential
    pub ignore_sensitive_content: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for ClipboardSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            memory_ceiling_bytes: DEFAULT_MEMORY_CEILING_BYTES,
            ignore_sensitive_content: false,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ClipboardSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl AppSettings {
    pub fn get_settings_path() -> AppResult<PathBuf> {
        ProjectDirs::from("com", "antigravity", "clipkeeper")
            .map(|dirs| dirs.config_dir().join("settings.json"))
            .ok_or_else(|| AppError::System("Failed to determine config directory".to_string()))
    }

    /// Load from the default location, writing defaults on first run
    pub async fn load() -> AppResult<Self> {
        let path = Self::get_settings_path()?;
        Self::load_from(&path).await
    }

    pub async fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            let settings = Self::default();
            settings.save_to(path).await?;
            return Ok(settings);
        }

        let content = fs::read_to_string(path).await
            .map_err(|e| AppError::Io(format!("Failed to read settings file: {}", e)))?;

        let settings: Self = serde_json::from_str(&content)
            .map_err(|e| AppError::Validation(format!("Failed to parse settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub async fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await
                .map_err(|e| AppError::Io(format!("Failed to create config directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)?;

        fs::write(path, content).await
            .map_err(|e| AppError::Io(format!("Failed to write settings file: {}", e)))
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.clipboard.poll_interval_ms == 0 {
            return Err(AppError::Validation("poll_interval_ms must be greater than zero".to_string()));
        }
        if self.clipboard.memory_ceiling_bytes == 0 {
            return Err(AppError::Validation("memory_ceiling_bytes must be greater than zero".to_string()));
        }
        Ok(())
    }
}
