//! Error types for the update coordination core.

use std::string::FromUtf8Error;

use thiserror::Error;

/// Errors that can occur while coordinating an update cycle.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Shell command did not complete successfully
    #[error("command failed: {command} ({reason})")]
    CommandFailed {
        command: String,
        reason: CommandFailure,
    },

    /// Preference store could not be read or written
    #[error("preference store error: {0}")]
    PreferenceError(String),

    /// Notification could not be delivered
    #[error("notification failed: {0}")]
    NotificationFailed(String),

    /// Background task panicked or was aborted
    #[error("background task failed: {0}")]
    TaskFailed(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl UpdateError {
    /// Exit status carried by a `CommandFailed` error, if any.
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            UpdateError::CommandFailed {
                reason: CommandFailure::Exit(code),
                ..
            } => Some(*code),
            _ => None,
        }
    }
}

/// Why a shell command was classified as failed.
#[derive(Debug, Error)]
pub enum CommandFailure {
    /// Interpreter exited with a non-zero status
    #[error("exit: {0}")]
    Exit(i32),

    /// Interpreter was terminated by a signal
    #[error("terminated by signal")]
    Signal,

    /// Combined output was not valid UTF-8
    #[error("output is not valid UTF-8: {0}")]
    Decode(#[from] FromUtf8Error),

    /// Interpreter could not be started, read from, or waited on
    #[error("io: {0}")]
    Io(std::io::Error),
}

impl From<tokio::sync::oneshot::error::RecvError> for UpdateError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        UpdateError::TaskFailed("worker exited without a result".to_string())
    }
}

impl From<toml::de::Error> for UpdateError {
    fn from(err: toml::de::Error) -> Self {
        UpdateError::ConfigError(err.to_string())
    }
}

impl From<toml::ser::Error> for UpdateError {
    fn from(err: toml::ser::Error) -> Self {
        UpdateError::ConfigError(err.to_string())
    }
}
