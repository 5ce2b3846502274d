//! Permission checks for global key observation.
//!
//! The input tap strategy can only observe system-wide key events when the
//! process holds the "Input Monitoring" grant. This crate exposes:
//! - `input_monitoring_ok()`: fast, side-effect free preflight.
//! - `request_input_monitoring()`: asks the OS to prompt the user. The prompt
//!   is modal and outside our control; the grant, if any, shows up on a later
//!   `input_monitoring_ok()` call.
//! - `accessibility_ok()` and `check_permissions()` for status display.
//!
//! On hosts other than macOS every check reports `false` and requests are
//! no-ops.
use serde::Serialize;

#[cfg(target_os = "macos")]
mod sys {
    #[link(name = "ApplicationServices", kind = "framework")]
    unsafe extern "C" {
        fn AXIsProcessTrusted() -> bool;
        fn CGPreflightListenEventAccess() -> bool;
        fn CGRequestListenEventAccess() -> bool;
    }

    pub fn accessibility_ok() -> bool {
        unsafe { AXIsProcessTrusted() }
    }

    pub fn input_monitoring_ok() -> bool {
        unsafe { CGPreflightListenEventAccess() }
    }

    pub fn request_input_monitoring() -> bool {
        unsafe { CGRequestListenEventAccess() }
    }
}

#[cfg(not(target_os = "macos"))]
mod sys {
    pub fn accessibility_ok() -> bool {
        false
    }

    pub fn input_monitoring_ok() -> bool {
        false
    }

    pub fn request_input_monitoring() -> bool {
        false
    }
}

/// Check the global Accessibility permission.
pub fn accessibility_ok() -> bool {
    sys::accessibility_ok()
}

/// Check if the application has the "Input Monitoring" permission.
///
/// Returns `true` when the process is allowed to listen for keyboard events
/// (CGEvent tap), and `false` otherwise.
pub fn input_monitoring_ok() -> bool {
    sys::input_monitoring_ok()
}

/// Ask the OS to grant Input Monitoring, which may show a system prompt.
///
/// Returns the OS's immediate answer. A `false` here is not final: the user
/// may grant access in System Settings and a later check will succeed.
pub fn request_input_monitoring() -> bool {
    let granted = sys::request_input_monitoring();
    tracing::debug!(granted, "input_monitoring_requested");
    granted
}

/// Current permission status for the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionsStatus {
    /// Accessibility (AX) permission; `true` if granted.
    pub accessibility_ok: bool,
    /// Input Monitoring permission; `true` if granted.
    pub input_ok: bool,
}

/// Query both Accessibility and Input Monitoring permissions.
///
/// No prompting and no side effects.
pub fn check_permissions() -> PermissionsStatus {
    PermissionsStatus {
        accessibility_ok: accessibility_ok(),
        input_ok: input_monitoring_ok(),
    }
}
