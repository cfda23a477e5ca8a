//! Typed client and server messages.
//!
//! Messages are not framed: each one is an opcode followed by a fixed
//! sequence of fields (see the tables on [`ClientMessage`] and
//! [`ServerMessage`]). A reader therefore has to know the full shape of
//! every opcode it wants to skip past. An opcode this build does not
//! know decodes to `Unknown` with no payload consumed.

use tokio::io::AsyncBufRead;

use crate::types::{client_opcode, server_opcode};
use crate::wire::{put_bool, put_int, put_string, read_bool, read_int, read_opcode, read_string};
use crate::{GameId, GameStatus, MessageKind, PROTOCOL_VERSION, ProtocolError, Symbol};

/// Anything that can be written to the wire as one message.
///
/// Lets the outbound writer drain a queue of either message direction.
pub trait Encode {
    fn encode(&self) -> Result<Vec<u8>, ProtocolError>;
}

impl Encode for ClientMessage {
    fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        ClientMessage::encode(self)
    }
}

impl Encode for ServerMessage {
    fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        ServerMessage::encode(self)
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// A message sent by a client.
///
/// | Opcode            | Payload                                  |
/// |-------------------|------------------------------------------|
/// | `CONNECT`         | version: int, nickname: string, reserved: int |
/// | `REQUEST_SEND`    | nickname: string                         |
/// | `REQUEST_RESPOND` | game id: int, accept: bool               |
/// | `PLAYER_GET_LIST` | (none)                                   |
/// | `GAME_MOVE`       | game id: int, x: int, y: int             |
/// | `GAME_FORFEIT`    | game id: int                             |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Connect {
        version: i32,
        nickname: String,
        reserved: i32,
    },
    RequestSend {
        nickname: String,
    },
    RequestRespond {
        game_id: GameId,
        accept: bool,
    },
    PlayerGetList,
    GameMove {
        game_id: GameId,
        x: i32,
        y: i32,
    },
    GameForfeit {
        game_id: GameId,
    },
    /// An opcode outside the known set. Ignored by the server.
    Unknown {
        opcode: i32,
    },
}

impl ClientMessage {
    /// Builds the handshake message for the current protocol version.
    pub fn connect(nickname: impl Into<String>) -> Self {
        Self::Connect {
            version: PROTOCOL_VERSION,
            nickname: nickname.into(),
            reserved: 0,
        }
    }

    pub fn opcode(&self) -> i32 {
        match self {
            Self::Connect { .. } => client_opcode::CONNECT,
            Self::RequestSend { .. } => client_opcode::REQUEST_SEND,
            Self::RequestRespond { .. } => client_opcode::REQUEST_RESPOND,
            Self::PlayerGetList => client_opcode::PLAYER_GET_LIST,
            Self::GameMove { .. } => client_opcode::GAME_MOVE,
            Self::GameForfeit { .. } => client_opcode::GAME_FORFEIT,
            Self::Unknown { opcode } => *opcode,
        }
    }

    /// Encodes the message, opcode included.
    ///
    /// # Errors
    /// Returns [`ProtocolError::StringTooLong`] for oversized nicknames.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut buf = Vec::with_capacity(16);
        put_int(&mut buf, self.opcode());
        match self {
            Self::Connect {
                version,
                nickname,
                reserved,
            } => {
                put_int(&mut buf, *version);
                put_string(&mut buf, nickname)?;
                put_int(&mut buf, *reserved);
            }
            Self::RequestSend { nickname } => put_string(&mut buf, nickname)?,
            Self::RequestRespond { game_id, accept } => {
                put_int(&mut buf, game_id.0);
                put_bool(&mut buf, *accept);
            }
            Self::PlayerGetList | Self::Unknown { .. } => {}
            Self::GameMove { game_id, x, y } => {
                put_int(&mut buf, game_id.0);
                put_int(&mut buf, *x);
                put_int(&mut buf, *y);
            }
            Self::GameForfeit { game_id } => put_int(&mut buf, game_id.0),
        }
        Ok(buf)
    }

    /// Reads the next message from `reader`.
    ///
    /// Returns `Ok(None)` on a clean end of stream between messages.
    pub async fn read_from<R>(reader: &mut R) -> Result<Option<Self>, ProtocolError>
    where
        R: AsyncBufRead + Unpin,
    {
        let Some(opcode) = read_opcode(reader).await? else {
            return Ok(None);
        };
        let message = match opcode {
            client_opcode::CONNECT => Self::Connect {
                version: read_int(reader).await?,
                nickname: read_string(reader).await?,
                reserved: read_int(reader).await?,
            },
            client_opcode::REQUEST_SEND => Self::RequestSend {
                nickname: read_string(reader).await?,
            },
            client_opcode::REQUEST_RESPOND => Self::RequestRespond {
                game_id: GameId(read_int(reader).await?),
                accept: read_bool(reader).await?,
            },
            client_opcode::PLAYER_GET_LIST => Self::PlayerGetList,
            client_opcode::GAME_MOVE => Self::GameMove {
                game_id: GameId(read_int(reader).await?),
                x: read_int(reader).await?,
                y: read_int(reader).await?,
            },
            client_opcode::GAME_FORFEIT => Self::GameForfeit {
                game_id: GameId(read_int(reader).await?),
            },
            other => Self::Unknown { opcode: other },
        };
        Ok(Some(message))
    }
}

/// The decoded body of a successful CONNECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub nickname: String,
    pub reserved: i32,
}

/// Reads the handshake that must open every connection.
///
/// The version is checked before the nickname is decoded, so a client
/// speaking another version is rejected without trusting the rest of its
/// bytes.
///
/// # Errors
/// - [`ProtocolError::UnexpectedOpcode`] if the first message is not CONNECT
///   (`got` is `-1` if the stream closed before any opcode arrived)
/// - [`ProtocolError::VersionMismatch`] if the version differs
/// - any decoding error from the payload
pub async fn read_connect<R>(reader: &mut R) -> Result<ConnectRequest, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let opcode = read_opcode(reader).await?.unwrap_or(-1);
    if opcode != client_opcode::CONNECT {
        return Err(ProtocolError::UnexpectedOpcode {
            expected: client_opcode::CONNECT,
            got: opcode,
        });
    }

    let version = read_int(reader).await?;
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::VersionMismatch {
            expected: PROTOCOL_VERSION,
            got: version,
        });
    }

    Ok(ConnectRequest {
        nickname: read_string(reader).await?,
        reserved: read_int(reader).await?,
    })
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// A message sent by the server.
///
/// | Opcode             | Payload                                         |
/// |--------------------|-------------------------------------------------|
/// | `STATUS`           | ok: bool, detail: string                        |
/// | `MESSAGE`          | game id: int, body: string, title: string, kind: int |
/// | `REQUEST_SENT`     | game id: int, nickname: string                  |
/// | `REQUEST_RECEIVED` | game id: int, from: string                      |
/// | `PLAYER_UPDATE`    | nickname: string, score: int                    |
/// | `PLAYER_LEAVE`     | nickname: string                                |
/// | `GAME_BEGIN`       | game id: int, opponent: string, symbol: int     |
/// | `GAME_MOVE`        | game id: int, x: int, y: int, symbol: int       |
/// | `GAME_UPDATE`      | game id: int, can move: bool, status: int       |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Handshake result. `detail` is the assigned nickname when `ok`,
    /// otherwise the reason for rejection.
    Status {
        ok: bool,
        detail: String,
    },
    Message {
        game_id: GameId,
        body: String,
        title: String,
        kind: MessageKind,
    },
    /// `game_id` is [`GameId::NONE`] when the challenged player does not exist.
    RequestSent {
        game_id: GameId,
        nickname: String,
    },
    RequestReceived {
        game_id: GameId,
        from: String,
    },
    PlayerUpdate {
        nickname: String,
        score: i32,
    },
    PlayerLeave {
        nickname: String,
    },
    GameBegin {
        game_id: GameId,
        opponent: String,
        symbol: Symbol,
    },
    GameMove {
        game_id: GameId,
        x: i32,
        y: i32,
        symbol: Symbol,
    },
    GameUpdate {
        game_id: GameId,
        can_move: bool,
        status: GameStatus,
    },
    Unknown {
        opcode: i32,
    },
}

impl ServerMessage {
    /// Convenience constructor for a MESSAGE.
    pub fn message(
        game_id: GameId,
        body: impl Into<String>,
        title: impl Into<String>,
        kind: MessageKind,
    ) -> Self {
        Self::Message {
            game_id,
            body: body.into(),
            title: title.into(),
            kind,
        }
    }

    pub fn opcode(&self) -> i32 {
        match self {
            Self::Status { .. } => server_opcode::STATUS,
            Self::Message { .. } => server_opcode::MESSAGE,
            Self::RequestSent { .. } => server_opcode::REQUEST_SENT,
            Self::RequestReceived { .. } => server_opcode::REQUEST_RECEIVED,
            Self::PlayerUpdate { .. } => server_opcode::PLAYER_UPDATE,
            Self::PlayerLeave { .. } => server_opcode::PLAYER_LEAVE,
            Self::GameBegin { .. } => server_opcode::GAME_BEGIN,
            Self::GameMove { .. } => server_opcode::GAME_MOVE,
            Self::GameUpdate { .. } => server_opcode::GAME_UPDATE,
            Self::Unknown { opcode } => *opcode,
        }
    }

    /// The game this message is about, if any.
    ///
    /// Lobby-level messages (and MESSAGE with id `-1`) return `None`.
    /// Encodes the message, opcode included.
    ///
    /// # Errors
    /// Returns [`ProtocolError::StringTooLong`] for oversized strings.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut buf = Vec::with_capacity(32);
        put_int(&mut buf, self.opcode());
        match self {
            Self::Status { ok, detail } => {
                put_bool(&mut buf, *ok);
                put_string(&mut buf, detail)?;
            }
            Self::Message {
                game_id,
                body,
                title,
                kind,
            } => {
                put_int(&mut buf, game_id.0);
                put_string(&mut buf, body)?;
                put_string(&mut buf, title)?;
                put_int(&mut buf, kind.0);
            }
            Self::RequestSent { game_id, nickname } => {
                put_int(&mut buf, game_id.0);
                put_string(&mut buf, nickname)?;
            }
            Self::RequestReceived { game_id, from } => {
                put_int(&mut buf, game_id.0);
                put_string(&mut buf, from)?;
            }
            Self::PlayerUpdate { nickname, score } => {
                put_string(&mut buf, nickname)?;
                put_int(&mut buf, *score);
            }
            Self::PlayerLeave { nickname } => put_string(&mut buf, nickname)?,
            Self::GameBegin {
                game_id,
                opponent,
                symbol,
            } => {
                put_int(&mut buf, game_id.0);
                put_string(&mut buf, opponent)?;
                put_int(&mut buf, symbol.code());
            }
            Self::GameMove {
                game_id,
                x,
                y,
                symbol,
            } => {
                put_int(&mut buf, game_id.0);
                put_int(&mut buf, *x);
                put_int(&mut buf, *y);
                put_int(&mut buf, symbol.code());
            }
            Self::GameUpdate {
                game_id,
                can_move,
                status,
            } => {
                put_int(&mut buf, game_id.0);
                put_bool(&mut buf, *can_move);
                put_int(&mut buf, status.code());
            }
            Self::Unknown { .. } => {}
        }
        Ok(buf)
    }

    /// Reads the next message from `reader`.
    ///
    /// Returns `Ok(None)` on a clean end of stream between messages.
    pub async fn read_from<R>(reader: &mut R) -> Result<Option<Self>, ProtocolError>
    where
        R: AsyncBufRead + Unpin,
    {
        let Some(opcode) = read_opcode(reader).await? else {
            return Ok(None);
        };
        let message = match opcode {
            server_opcode::STATUS => Self::Status {
                ok: read_bool(reader).await?,
                detail: read_string(reader).await?,
            },
            server_opcode::MESSAGE => Self::Message {
                game_id: GameId(read_int(reader).await?),
                body: read_string(reader).await?,
                title: read_string(reader).await?,
                kind: MessageKind(read_int(reader).await?),
            },
            server_opcode::REQUEST_SENT => Self::RequestSent {
                game_id: GameId(read_int(reader).await?),
                nickname: read_string(reader).await?,
            },
            server_opcode::REQUEST_RECEIVED => Self::RequestReceived {
                game_id: GameId(read_int(reader).await?),
                from: read_string(reader).await?,
            },
            server_opcode::PLAYER_UPDATE => Self::PlayerUpdate {
                nickname: read_string(reader).await?,
                score: read_int(reader).await?,
            },
            server_opcode::PLAYER_LEAVE => Self::PlayerLeave {
                nickname: read_string(reader).await?,
            },
            server_opcode::GAME_BEGIN => Self::GameBegin {
                game_id: GameId(read_int(reader).await?),
                opponent: read_string(reader).await?,
                symbol: Symbol::from_code(read_int(reader).await?)?,
            },
            server_opcode::GAME_MOVE => Self::GameMove {
                game_id: GameId(read_int(reader).await?),
                x: read_int(reader).await?,
                y: read_int(reader).await?,
                symbol: Symbol::from_code(read_int(reader).await?)?,
            },
            server_opcode::GAME_UPDATE => Self::GameUpdate {
                game_id: GameId(read_int(reader).await?),
                can_move: read_bool(reader).await?,
                status: GameStatus::from_code(read_int(reader).await?)?,
            },
            other => Self::Unknown { opcode: other },
        };
        Ok(Some(message))
    }
}
