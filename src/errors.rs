// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RolloutError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command `{command}` failed with {}: {stderr}", exit_label(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("task cancelled: {task}")]
    Cancelled { task: String },

    #[error("git query `{query}` failed: {message}")]
    GitQuery { query: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} responded with status={status}; body={body:?}")]
    HttpStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("task panicked: {0}")]
    TaskPanicked(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RolloutError {
    /// True when the error came from a cancellation rather than a real failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RolloutError::Cancelled { .. })
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RolloutError>;
