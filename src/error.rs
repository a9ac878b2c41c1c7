//! Error handling for drive setup
//!
//! Provides centralized error types using thiserror. Library code returns
//! `Result<T>`; the binary wraps these in `anyhow` for top-level context.

use thiserror::Error;

/// Main error type for drive setup
#[derive(Error, Debug)]
pub enum DriveSetupError {
    /// The block device listing command reported a nonzero status
    #[error("\"{command}\" failed with code:{code} and log:\n{log}")]
    DeviceListing {
        command: String,
        code: i32,
        log: String,
    },

    /// A step of a command sequence exited nonzero; later steps were not run
    #[error("\"{command}\" failed with code:{code} and log:\n{log}")]
    CommandFailed {
        command: String,
        code: i32,
        log: String,
    },

    /// The command could not be started at all (binary missing, permissions)
    #[error("Failed to spawn \"{command}\": {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Enumeration succeeded but matched no devices
    #[error("No block devices with prefix '{prefix}' found")]
    NoDevicesFound { prefix: String },

    /// The requested plan cannot be built from the given inputs
    #[error("Plan error: {0}")]
    Plan(String),

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pre-flight environment checks failed
    #[error("Pre-flight check failed: {0}")]
    Preflight(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for drive setup operations
pub type Result<T> = std::result::Result<T, DriveSetupError>;

impl DriveSetupError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a plan error
    pub fn plan(msg: impl Into<String>) -> Self {
        Self::Plan(msg.into())
    }

    /// Create a pre-flight error
    pub fn preflight(msg: impl Into<String>) -> Self {
        Self::Preflight(msg.into())
    }

    /// Exit code carried by the error, if it came from a finished command.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::DeviceListing { code, .. } | Self::CommandFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}
