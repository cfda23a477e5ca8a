//! Unified error type for the tictac server.

use tictac_game::GameError;
use tictac_protocol::ProtocolError;
use tictac_session::SessionError;
use tictac_transport::TransportError;

/// Anything that can end a connection or stop the server.
///
/// Each layer's error converts in with `?`.
#[derive(Debug, thiserror::Error)]
pub enum TictacError {
    /// A transport-level error (bind, accept, connect).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (decode, version mismatch, bad first message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The outbound writer failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A game rule rejected the request.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The requested nickname is taken and cannot be suffixed.
    #[error("nickname unavailable")]
    NicknameUnavailable,

    /// The client did not complete the handshake in time.
    #[error("handshake timed out")]
    HandshakeTimeout,
}
