//! Tasker - a per-user command-line task tracker.
//!
//! Users register and log in against a credential file, then manage their own
//! task list through an interactive menu. Everything is persisted as JSON
//! documents through a [`storage::StorageBackend`].

pub mod config;
pub mod credentials;
pub mod password;
pub mod shell;
pub mod storage;
pub mod task;
pub mod task_list;
pub mod ui;

/// Library-level error type for tasker operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for tasker operations.
pub type Result<T> = std::result::Result<T, Error>;
