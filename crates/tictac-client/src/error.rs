//! Error types for the client.

use tictac_protocol::{GameId, ProtocolError};
use tictac_session::SessionError;
use tictac_transport::TransportError;

/// Errors raised by [`Client`](crate::Client) and the local mirror.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The server answered CONNECT with `STATUS(false, reason)`.
    #[error("server refused the connection: {0}")]
    Rejected(String),

    #[error("server closed the connection")]
    Disconnected,

    #[error("no game with id {0}")]
    UnknownGame(GameId),

    /// Not this player's turn, the game is over, or a move is
    /// still waiting for the server's answer.
    #[error("cannot move in {0} right now")]
    CannotMove(GameId),

    #[error("({x}, {y}) is not a free cell")]
    BadLocation { x: i32, y: i32 },
}
