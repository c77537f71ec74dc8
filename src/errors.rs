// src/errors.rs

//! Crate-wide error type and aliases.
//!
//! The four exec failure kinds (`EnvironmentNotFound`, `InvalidInvocation`,
//! `ProcessCreationFailed`, `WaitFailed`) are terminal for a single exec
//! call and always correspond to exit code [`EXIT_CODE_FAILED`]. The
//! remaining variants are only produced by the host binary (config loading,
//! stdio setup).

use thiserror::Error;

/// Exit code reported alongside every failed exec call.
pub const EXIT_CODE_FAILED: i32 = -1;

/// Boxed error coming back from the isolation backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("no active container exists with ID {container_id}")]
    EnvironmentNotFound { container_id: String },

    #[error("invalid invocation: {0}")]
    InvalidInvocation(String),

    #[error("creating process in container {container_id} failed")]
    ProcessCreationFailed {
        container_id: String,
        #[source]
        source: BoxError,
    },

    #[error("waiting for process {pid} in container {container_id} failed")]
    WaitFailed {
        container_id: String,
        pid: u32,
        #[source]
        source: BoxError,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl ExecError {
    /// Exit code paired with this error: always `-1`.
    pub fn exit_code(&self) -> i32 {
        EXIT_CODE_FAILED
    }
}

pub type Result<T> = std::result::Result<T, ExecError>;
