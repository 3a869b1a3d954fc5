//! Operations exposed to the presentation layer

pub mod clipboard;
#[cfg(feature = "tauri")]
pub mod ipc;

pub use clipboard::ClipboardCommands;
