//! Wire protocol for tictac.
//!
//! This crate defines the "language" that clients and servers speak:
//!
//! - **Types** ([`GameId`], [`Symbol`], [`GameStatus`], [`MessageKind`]):
//!   the values that travel inside messages, with their wire codes.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]): one enum variant
//!   per opcode, with `encode` and async `read_from`.
//! - **Wire primitives** ([`wire`]): big-endian ints, one-byte bools,
//!   `u16`-prefixed UTF-8 strings.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the server
//! logic. It doesn't know about sessions or games, only how to turn
//! messages into bytes and back.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Registry / Game
//! Registry / Game → Protocol (ServerMessage) → Transport (bytes)
//! ```

mod error;
mod message;
mod types;
pub mod wire;

pub use error::ProtocolError;
pub use message::{ClientMessage, ConnectRequest, Encode, ServerMessage, read_connect};
pub use types::{
    GameId, GameStatus, MessageKind, PROTOCOL_VERSION, Symbol, client_opcode, server_opcode,
};
