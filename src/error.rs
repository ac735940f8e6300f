//! Error types for fodcache
//!
//! All modules use `FodResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for fodcache operations
pub type FodResult<T> = Result<T, FodError>;

/// All errors that can occur in fodcache
#[derive(Error, Debug)]
pub enum FodError {
    // Store errors
    #[error("Store path mismatch: computed {expected}, store reported {actual}")]
    StorePathMismatch { expected: PathBuf, actual: PathBuf },

    #[error("Invalid store path {path}: {reason}")]
    InvalidStorePath { path: String, reason: String },

    #[error("Store import produced no output: {command}")]
    ImportOutputMissing { command: String },

    // Input errors
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    #[error("Invalid checksum {value}: {reason}")]
    InvalidChecksum { value: String, reason: String },

    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(String),

    #[error("Invalid base32 string: {0}")]
    InvalidBase32(String),

    // Archive errors
    #[error("Archiver produced no output at {0}")]
    ArchiverOutputMissing(PathBuf),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    // Network errors
    #[error("Download failed: {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Failed to fetch {failed} of {total} packages")]
    FetchFailed { failed: usize, total: usize },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command {command} exited with {}, stderr: {stderr}", exit_label(.code))]
    Subprocess {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}

impl FodError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error (the process could not be spawned)
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a subprocess error from a non-zero exit
    pub fn subprocess(command: impl Into<String>, code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::Subprocess {
            command: command.into(),
            code,
            stderr: stderr.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::StorePathMismatch { .. } => Some(
                "Check that store.root matches the store directory nix-store was built with",
            ),
            Self::ArchiverOutputMissing(_) => {
                Some("Install bsdtar (libarchive) or set archiver.program in the config")
            }
            Self::CommandFailed { command, .. } if command.starts_with("nix-store") => {
                Some("Install Nix or set store.importer in the config")
            }
            Self::CommandFailed { command, .. } if command.starts_with("bsdtar") => {
                Some("Install bsdtar (libarchive) or set archiver.program in the config")
            }
            Self::InvalidLocator(_) => Some("Locators look like name@npm:1.0.0 or @scope/name@npm:1.0.0"),
            _ => None,
        }
    }
}
