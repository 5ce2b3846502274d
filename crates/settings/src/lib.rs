//! Persisted hotkey settings.
//!
//! The settings document is owned by the host application: a JSON object on
//! disk that also carries tasks, labels and other state. This crate only
//! reads and writes its `"settings"` key and preserves everything else.

use std::{env, path::PathBuf};

mod defaults;
mod error;
mod model;
mod store;

pub use defaults::{DEFAULT_OVERLAY, DEFAULT_PANEL_FALLBACK, DEFAULT_PANEL_PRIMARY};
pub use error::{Error, Result};
pub use model::{HotkeySettings, HotkeySpec};
pub use store::{JsonStore, MemoryStore, SAVE_DEBOUNCE, SettingsStore};

/// Determine the default store path (`~/.panelkey/store.json`).
pub fn default_store_path() -> PathBuf {
    let mut p = PathBuf::from(env::var_os("HOME").unwrap_or_default());
    p.push(".panelkey");
    p.push("store.json");
    p
}
