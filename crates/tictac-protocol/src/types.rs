//! Core value types that travel on the wire.
//!
//! Every value in the tictac protocol is an `int`, a `bool`, or a
//! string. The types here give those integers names: a [`GameId`] is
//! not a coordinate, a [`Symbol`] is not a [`GameStatus`], even though
//! all three are an `i32` on the wire.

use serde::{Deserialize, Serialize};

use std::fmt;

use crate::ProtocolError;

/// The protocol version spoken by this build.
///
/// Sent by the client in CONNECT. The server rejects any other value
/// before decoding the rest of the handshake.
pub const PROTOCOL_VERSION: i32 = 1;

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

/// Opcodes for messages sent by the client.
///
/// Client and server opcodes live in separate namespaces: `0` is
/// CONNECT when the client sends it and STATUS when the server does.
pub mod client_opcode {
    pub const CONNECT: i32 = 0;
    pub const REQUEST_SEND: i32 = 100;
    pub const REQUEST_RESPOND: i32 = 101;
    pub const PLAYER_GET_LIST: i32 = 200;
    pub const GAME_MOVE: i32 = 300;
    pub const GAME_FORFEIT: i32 = 301;
}

/// Opcodes for messages sent by the server.
pub mod server_opcode {
    pub const STATUS: i32 = 0;
    pub const MESSAGE: i32 = 1;
    pub const REQUEST_SENT: i32 = 100;
    pub const REQUEST_RECEIVED: i32 = 101;
    pub const PLAYER_UPDATE: i32 = 200;
    pub const PLAYER_LEAVE: i32 = 201;
    pub const GAME_BEGIN: i32 = 300;
    pub const GAME_MOVE: i32 = 301;
    pub const GAME_UPDATE: i32 = 302;
}

// ---------------------------------------------------------------------------
// GameId
// ---------------------------------------------------------------------------

/// Identifier of one game on the server.
///
/// Allocated by the server from a monotonically increasing counter.
/// The value `-1` ([`GameId::NONE`]) is a sentinel: in MESSAGE it means
/// "not tied to a game", in REQUEST_SENT it means "no such player".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub i32);

impl GameId {
    /// The "no game" sentinel.
    pub const NONE: GameId = GameId(-1);

    /// Returns `true` for the `-1` sentinel.
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Symbol
// ---------------------------------------------------------------------------

/// The mark a player places on the board.
///
/// Assigned once when a game is created and never changed. CROSS always
/// moves first. An empty cell has no symbol (`Option<Symbol>::None`) and
/// is encoded as `0` where a cell value is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    Nought,
    Cross,
}

impl Symbol {
    /// Returns the wire code: NOUGHT = 1, CROSS = 2.
    pub fn code(self) -> i32 {
        match self {
            Self::Nought => 1,
            Self::Cross => 2,
        }
    }

    /// Parses a wire code.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidValue`] for anything but 1 or 2.
    pub fn from_code(code: i32) -> Result<Self, ProtocolError> {
        match code {
            1 => Ok(Self::Nought),
            2 => Ok(Self::Cross),
            other => Err(ProtocolError::InvalidValue(format!(
                "symbol code {other}"
            ))),
        }
    }

    /// The other player's symbol.
    pub fn opponent(self) -> Self {
        match self {
            Self::Nought => Self::Cross,
            Self::Cross => Self::Nought,
        }
    }

    /// Single character used by text renderings of the board.
    pub fn as_char(self) -> char {
        match self {
            Self::Nought => 'O',
            Self::Cross => 'X',
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nought => write!(f, "NOUGHT"),
            Self::Cross => write!(f, "CROSS"),
        }
    }
}

// ---------------------------------------------------------------------------
// GameStatus
// ---------------------------------------------------------------------------

/// The status of a game as seen by ONE participant.
///
/// `Won` and `Lost` are relative to the recipient of the message: for
/// the same finished game, the winner receives `Won` and the loser
/// receives `Lost`. `Draw` is also used for games that were terminated
/// early (forfeit or disconnect), since no winner is recorded.
///
/// ```text
/// Pending → InProgress → { Won | Lost | Draw }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    InProgress,
    Won,
    Lost,
    Draw,
    /// Created by a challenge but not yet accepted. Never sent on the
    /// wire by the server; the client mirror starts at `InProgress`.
    Pending,
}

impl GameStatus {
    /// Returns the wire code.
    pub fn code(self) -> i32 {
        match self {
            Self::InProgress => 0,
            Self::Won => 1,
            Self::Lost => 2,
            Self::Draw => 3,
            Self::Pending => 4,
        }
    }

    /// Parses a wire code.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidValue`] for unknown codes.
    pub fn from_code(code: i32) -> Result<Self, ProtocolError> {
        match code {
            0 => Ok(Self::InProgress),
            1 => Ok(Self::Won),
            2 => Ok(Self::Lost),
            3 => Ok(Self::Draw),
            4 => Ok(Self::Pending),
            other => Err(ProtocolError::InvalidValue(format!(
                "game status code {other}"
            ))),
        }
    }

    /// Returns `true` for `Won`, `Lost`, and `Draw`: no further moves
    /// or transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::Lost | Self::Draw)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "in progress"),
            Self::Won => write!(f, "won"),
            Self::Lost => write!(f, "lost"),
            Self::Draw => write!(f, "draw"),
            Self::Pending => write!(f, "pending"),
        }
    }
}

// ---------------------------------------------------------------------------
// MessageKind
// ---------------------------------------------------------------------------

/// Presentation hint carried by a MESSAGE.
///
/// Kept as an opaque integer: clients may receive kinds this build does
/// not know about and must pass them through. Only
/// [`MessageKind::STATUS_LINE`] (`-1`) has protocol-level meaning:
/// "show this as status text, not as a dialog".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageKind(pub i32);

impl MessageKind {
    pub const ERROR: MessageKind = MessageKind(0);
    pub const INFORMATION: MessageKind = MessageKind(1);
    pub const WARNING: MessageKind = MessageKind(2);
    pub const QUESTION: MessageKind = MessageKind(3);
    pub const STATUS_LINE: MessageKind = MessageKind(-1);

    /// Returns `true` if the message should be rendered as status text.
    pub fn is_status_line(self) -> bool {
        self == Self::STATUS_LINE
    }
}
