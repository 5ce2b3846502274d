//! macOS global hotkey acquisition.
//!
//! Two independent ways to get a key combination delivered to the process
//! while another app has focus:
//!
//! - [`Registry`]: Carbon `RegisterEventHotKey`. The OS grants an exclusive
//!   claim on a combination or reports that someone else owns it. A single
//!   process-wide event handler is installed on first use and never removed;
//!   it demultiplexes hot key ids back to whoever registered them.
//! - [`InputTap`]: a CoreGraphics event tap observing every key-down. Needs
//!   the Input Monitoring permission, never conflicts, and consumes matching
//!   events. Runs on its own thread with its own run loop.
//!
//! Neither side calls back into application code directly. Both push an
//! [`Activation`] onto a crossbeam channel; the owner drains it from its main
//! sequencing context. [`policy`] and [`Throttle`] are platform-neutral and
//! used by the OS glue.
//!
//! The OS-facing types only exist when building for macOS.

mod error;
pub mod policy;
mod throttle;

#[cfg(target_os = "macos")]
mod registry;
#[cfg(target_os = "macos")]
mod tap;

pub use error::{Error, HOTKEY_EXISTS_ERR, Result};
#[cfg(target_os = "macos")]
pub use registry::Registry;
#[cfg(target_os = "macos")]
pub use tap::InputTap;
pub use throttle::{REGISTRY_WARN_INTERVAL, Throttle};

/// A queued notification that a registered combination fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activation {
    /// The exclusive registry delivered the hot key with this id.
    HotKey(u32),
    /// The input tap matched its armed combo.
    Tap,
}
