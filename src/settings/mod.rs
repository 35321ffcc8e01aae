// Settings - Persisted metronome state

pub mod store;
pub mod types;

use thiserror::Error;

pub use store::SettingsStore;
pub use types::{MetronomeSettings, SettingsWarning};

/// Settings error types
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid settings record: {0}")]
    InvalidRecord(String),
}
