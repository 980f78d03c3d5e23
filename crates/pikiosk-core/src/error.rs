//! Error types for pikiosk.
//!
//! Per-file failures (`SourceMissing`, `CopyFailed`, ...) are collected by the
//! deploy engine and counted; only `PrerequisiteMissing` aborts a whole run.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the pikiosk library.
#[derive(Debug, Error)]
pub enum KioskError {
    // Gate errors
    #[error("Prerequisite missing: none of [{}] found on PATH", candidates.join(", "))]
    PrerequisiteMissing { candidates: Vec<String> },

    // Per-file installation errors
    #[error("Source file missing: {0}")]
    SourceMissing(PathBuf),

    #[error("Destination directory not writable: {path}: {reason}")]
    DestinationDirUnwritable { path: PathBuf, reason: String },

    #[error("Copy failed from {src} to {dest}: {reason}")]
    CopyFailed {
        src: PathBuf,
        dest: PathBuf,
        reason: String,
    },

    #[error("Placeholder {token} still present in {path} ({remaining} occurrence(s))")]
    PlaceholderUnresolved {
        path: PathBuf,
        token: String,
        remaining: usize,
    },

    #[error("No Exec directive in {0}")]
    MissingExecDirective(PathBuf),

    // Informational
    #[error("Tool not available: {tool}")]
    ToolAbsent { tool: String },

    // External command errors
    #[error("Command `{command}` failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("Command `{command}` timed out after {timeout:?}")]
    Timeout {
        command: String,
        timeout: std::time::Duration,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },
}

/// Result type alias for pikiosk operations.
pub type Result<T> = std::result::Result<T, KioskError>;

impl From<std::io::Error> for KioskError {
    fn from(err: std::io::Error) -> Self {
        KioskError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for KioskError {
    fn from(err: serde_json::Error) -> Self {
        KioskError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl KioskError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        KioskError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Stable snake_case name of the error kind, used in run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            KioskError::PrerequisiteMissing { .. } => "prerequisite_missing",
            KioskError::SourceMissing(_) => "source_missing",
            KioskError::DestinationDirUnwritable { .. } => "destination_dir_unwritable",
            KioskError::CopyFailed { .. } => "copy_failed",
            KioskError::PlaceholderUnresolved { .. } => "placeholder_unresolved",
            KioskError::MissingExecDirective(_) => "missing_exec_directive",
            KioskError::ToolAbsent { .. } => "tool_absent",
            KioskError::CommandFailed { .. } => "command_failed",
            KioskError::Timeout { .. } => "timeout",
            KioskError::Io { .. } => "io",
            KioskError::Json { .. } => "json",
            KioskError::Config { .. } => "config",
            KioskError::Validation { .. } => "validation",
        }
    }

    /// Whether this error stops the whole run rather than a single file.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(self, KioskError::PrerequisiteMissing { .. })
    }

    /// Whether this error is informational only and never counted as a failure.
    pub fn is_informational(&self) -> bool {
        matches!(self, KioskError::ToolAbsent { .. })
    }
}
