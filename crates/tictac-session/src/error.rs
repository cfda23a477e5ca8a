//! Error types for the session layer.

/// Errors that can occur while delivering a session's outbound messages.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Writing to the peer failed. The peer is gone or stalled out.
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}
