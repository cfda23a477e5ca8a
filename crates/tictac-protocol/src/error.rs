//! Error types for the protocol layer.
//!
//! Each crate in tictac defines its own error enum. A `ProtocolError`
//! always means the byte stream itself was unusable: the peer sent
//! something that cannot be decoded, or a value cannot be encoded in
//! the fixed wire layout.

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Reading from or writing to the underlying stream failed.
    ///
    /// This includes `UnexpectedEof` when the stream ends in the
    /// middle of a message.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A string field did not contain valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    /// A string is too long for its `u16` length prefix.
    #[error("string of {0} bytes exceeds the 65535 byte limit")]
    StringTooLong(usize),

    /// A message arrived where a different one was required,
    /// e.g. anything other than CONNECT as the first message.
    #[error("expected opcode {expected}, got {got}")]
    UnexpectedOpcode { expected: i32, got: i32 },

    /// The client speaks a different protocol version.
    #[error("protocol version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: i32, got: i32 },

    /// A field decoded fine but holds a value outside its domain,
    /// e.g. a symbol code that is neither NOUGHT nor CROSS.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}
