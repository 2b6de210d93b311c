//! Error types for the preview crate
//!
//! The coordinator itself never fails: every handler degrades to a no-op when
//! its target is missing. Errors only exist at the edges (discovery,
//! configuration, action scripts and the session worker).

use thiserror::Error;

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur outside of the playback handlers
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration (bad selector, out-of-range value)
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Failed to parse an action script or page input
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The session worker has shut down or dropped a reply
    #[error("Session closed: {0}")]
    SessionClosed(String),

    /// I/O failure while reading inputs
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ParseError(err.to_string())
    }
}
