use thiserror::Error;

/// Errors that end the process with a non-zero status.
#[derive(Debug, Error)]
pub enum Error {
    /// The settings document could not be used.
    #[error(transparent)]
    Settings(#[from] settings::Error),
    /// The command needs macOS.
    #[cfg_attr(target_os = "macos", allow(dead_code))]
    #[error("unsupported platform: {0} needs macOS")]
    UnsupportedPlatform(&'static str),
    /// Rendering output failed.
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}
