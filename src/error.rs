//! Unified error type for shelfwatch.
//!
//! Only [`Error::Config`] is fatal; every other variant is logged and absorbed
//! by the component that hit it (reconnect, drop the event, or skip the item).

/// Error type covering all failure modes of the companion process.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The realtime connection dropped, was refused, or timed out.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A frame or its JSON payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A control-plane call failed.
    #[error("Control plane error [{operation}]: {message}")]
    ControlPlane {
        /// The capability that was invoked (e.g. "start_encoding").
        operation: String,
        /// Human-readable error description.
        message: String,
    },

    /// A required setting is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Convenience constructor for [`Error::ControlPlane`].
    pub fn control_plane(operation: impl Into<String>, message: impl ToString) -> Self {
        Error::ControlPlane {
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
