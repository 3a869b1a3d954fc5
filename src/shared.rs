pub mod types;
pub mod settings;
pub mod error;
pub mod events;
pub mod emit;
pub mod logging;

pub use error::{AppError, AppResult};
