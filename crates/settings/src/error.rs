//! Error types for loading and saving the settings document.

use std::{path::PathBuf, result::Result as StdResult};

use thiserror::Error;

/// Result alias for this crate.
pub type Result<T> = StdResult<T, Error>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors produced while reading or writing the settings document.
pub enum Error {
    #[error("failed to read {}: {message}", path.display())]
    /// I/O or filesystem read error.
    Read {
        /// File being read.
        path: PathBuf,
        /// Human-readable error message.
        message: String,
    },
    #[error("failed to parse {}: {message}", path.display())]
    /// The document is not valid JSON or has an unexpected shape.
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Human-readable error message.
        message: String,
    },
    #[error("failed to write {}: {message}", path.display())]
    /// The document could not be written.
    Write {
        /// File being written.
        path: PathBuf,
        /// Human-readable error message.
        message: String,
    },
}
