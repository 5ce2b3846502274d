//! Error types and result alias for the mac-hotkey crate.
use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type used throughout this crate.
pub type Result<T> = StdResult<T, Error>;

/// `eventHotKeyExistsErr`: the combination is already owned by another listener.
pub const HOTKEY_EXISTS_ERR: i32 = -9878;

/// Error variants produced by this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The OS refused an exclusive claim because someone else holds it.
    #[error("Hot key already registered (status {status})")]
    Conflict {
        /// Raw OSStatus reported by the registry.
        status: i32,
    },
    /// Underlying OS provided an error.
    #[error("OS error: {0}")]
    OsError(String),
    /// Event tap could not be created or initialized.
    #[error("Event tap failed to start")]
    EventTapStart,
    /// Missing or denied system permission.
    #[error("Permission denied: {0}")]
    PermissionDenied(&'static str),
}

impl Error {
    /// Classify a failing `RegisterEventHotKey` status.
    ///
    /// Carbon reports an owned combination as `eventHotKeyExistsErr`; any
    /// other failure is an unexpected OS error.
    pub fn from_register_status(status: i32) -> Self {
        match status {
            HOTKEY_EXISTS_ERR => Self::Conflict { status },
            other => Self::OsError(format!("RegisterEventHotKey failed: {other}")),
        }
    }
}
