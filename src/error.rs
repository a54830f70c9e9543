//! Error types for diagram capture

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for capture operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing diagrams
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to launch the rendering session
    #[error("Session initialization failed: {0}")]
    InitializationError(String),

    /// The diagram source file does not exist
    #[error("Source file not found: {}", .0.display())]
    SourceMissing(PathBuf),

    /// Failed to load a page
    #[error("Failed to load page: {0}")]
    LoadError(String),

    /// The ready selector never matched
    #[error("Timed out after {timeout_ms}ms waiting for `{selector}`")]
    RenderTimeout { selector: String, timeout_ms: u64 },

    /// Failed to capture or store a screenshot
    #[error("Capture failed: {0}")]
    CaptureError(String),

    /// Invalid configuration or job table
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The session worker went away before answering
    #[error("Session closed: {0}")]
    SessionClosed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),
}
