//! Error types for gcassert runs.
//!
//! Assertion failures are not errors: they are reported output. Everything in
//! [`GcAssertError`] stops the run.

use std::path::PathBuf;
use std::process::ExitStatus;

/// Errors that abort a gcassert run.
#[derive(Debug, thiserror::Error)]
pub enum GcAssertError {
    #[error("cannot determine working directory: {0}")]
    WorkingDir(#[source] std::io::Error),

    #[error("cannot express {path} relative to {base}")]
    Relativize { path: PathBuf, base: PathBuf },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk package directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("no Go source files found for package path {0}")]
    NoSourceFiles(PathBuf),

    #[error("{path}:{line}: syntax error: {message}")]
    Syntax {
        path: PathBuf,
        line: u32,
        message: String,
    },

    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}")]
    BuildFailed { program: String, status: ExitStatus },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for gcassert operations.
pub type Result<T> = std::result::Result<T, GcAssertError>;
