//! Error types for arbitration and for the backends it drives.

use std::result::Result as StdResult;

use keycombo::InvalidCombo;
use mac_hotkey::Error as HotkeyError;
use thiserror::Error;

/// Result alias for arbitration operations.
pub type Result<T> = StdResult<T, StartError>;

/// Why a shortcut could not be brought up.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StartError {
    /// The combo was rejected before any OS call.
    #[error(transparent)]
    InvalidCombo(#[from] InvalidCombo),
    /// Another listener owns the combination.
    #[error("shortcut is owned by another application")]
    Conflict,
    /// Input Monitoring is missing.
    #[error("input monitoring permission is required")]
    PermissionDenied,
    /// Unexpected OS failure, surfaced verbatim.
    #[error("{0}")]
    Os(String),
}

/// Failure reported by a single acquisition backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StrategyError {
    /// The exclusive claim is held elsewhere.
    #[error("conflict")]
    Conflict,
    /// The backend needs a permission the process lacks.
    #[error("permission denied")]
    PermissionDenied,
    /// Anything else.
    #[error("{0}")]
    Os(String),
}

impl From<HotkeyError> for StrategyError {
    fn from(e: HotkeyError) -> Self {
        match e {
            HotkeyError::Conflict { .. } => Self::Conflict,
            HotkeyError::PermissionDenied(_) => Self::PermissionDenied,
            other => Self::Os(other.to_string()),
        }
    }
}

impl From<StrategyError> for StartError {
    fn from(e: StrategyError) -> Self {
        match e {
            StrategyError::Conflict => Self::Conflict,
            StrategyError::PermissionDenied => Self::PermissionDenied,
            StrategyError::Os(m) => Self::Os(m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_errors_classify() {
        assert_eq!(
            StrategyError::from(HotkeyError::Conflict { status: -9878 }),
            StrategyError::Conflict
        );
        assert_eq!(
            StrategyError::from(HotkeyError::PermissionDenied("Input Monitoring")),
            StrategyError::PermissionDenied
        );
        assert_eq!(
            StartError::from(StrategyError::from(HotkeyError::EventTapStart)),
            StartError::Os("Event tap failed to start".into())
        );
    }
}
