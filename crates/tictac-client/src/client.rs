//! A connected client: handshake, outbound queue, and inbound stream.
//!
//! The connection is split the same way the server splits it: a writer
//! task drains an unbounded queue of [`ClientMessage`]s, and a reader
//! task decodes [`ServerMessage`]s onto a channel. [`Client::recv`]
//! pulls from that channel and folds each message into the [`Mirror`]
//! before handing it back, so it is safe to use inside `select!`.

use tictac_protocol::{ClientMessage, GameId, ProtocolError, ServerMessage, server_opcode};
use tictac_session::{Outbound, SessionError, writer};
use tictac_transport::{Connection, TcpConnection};
use tokio::io::BufReader;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{ClientError, Mirror};

pub struct Client {
    nickname: String,
    requested: String,
    outbound: mpsc::UnboundedSender<Outbound<ClientMessage>>,
    inbound: mpsc::UnboundedReceiver<ServerMessage>,
    mirror: Mirror,
    reader_task: JoinHandle<Result<(), ClientError>>,
    writer_task: JoinHandle<Result<(), SessionError>>,
}

impl Client {
    /// Dials `addr` and joins the lobby as `nickname`.
    ///
    /// The server may hand back a different nickname when the requested
    /// one is taken; see [`nickname`](Self::nickname) and
    /// [`was_renamed`](Self::was_renamed).
    ///
    /// # Errors
    /// - [`ClientError::Rejected`] if the server refuses the handshake
    /// - [`ClientError::Disconnected`] if it closes without answering
    /// - transport and protocol failures while connecting
    pub async fn connect(addr: &str, nickname: &str) -> Result<Self, ClientError> {
        let conn = TcpConnection::connect(addr).await?;
        let conn_id = conn.id();
        let (read_half, write_half) = conn.into_split();
        let mut reader = BufReader::new(read_half);

        let (outbound, queue) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(writer::run(write_half, queue));

        let _ = outbound.send(Outbound::Message(ClientMessage::connect(nickname)));
        let assigned = match ServerMessage::read_from(&mut reader).await? {
            Some(ServerMessage::Status { ok: true, detail }) => detail,
            Some(ServerMessage::Status { ok: false, detail }) => {
                return Err(ClientError::Rejected(detail));
            }
            Some(other) => {
                return Err(ProtocolError::UnexpectedOpcode {
                    expected: server_opcode::STATUS,
                    got: other.opcode(),
                }
                .into());
            }
            None => return Err(ClientError::Disconnected),
        };
        tracing::info!(%conn_id, nickname = %assigned, "joined lobby");
        if assigned != nickname {
            tracing::info!(requested = nickname, assigned = %assigned, "nickname was taken");
        }

        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let reader_task = tokio::spawn(read_loop(reader, inbound_tx));

        Ok(Self {
            nickname: assigned,
            requested: nickname.to_string(),
            outbound,
            inbound,
            mirror: Mirror::new(),
            reader_task,
            writer_task,
        })
    }

    /// The nickname the server assigned.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// `true` if the server suffixed the requested nickname.
    pub fn was_renamed(&self) -> bool {
        self.nickname != self.requested
    }

    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    pub fn mirror_mut(&mut self) -> &mut Mirror {
        &mut self.mirror
    }

    /// Waits for the next server message, applies it to the mirror, and
    /// returns it. `None` once the server has closed the connection.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        let message = self.inbound.recv().await?;
        self.mirror.apply(&message);
        Some(message)
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    fn send(&self, message: ClientMessage) -> Result<(), ClientError> {
        self.outbound
            .send(Outbound::Message(message))
            .map_err(|_| ClientError::Disconnected)
    }

    /// Asks the server to replay the whole roster.
    pub fn request_players(&self) -> Result<(), ClientError> {
        self.send(ClientMessage::PlayerGetList)
    }

    pub fn challenge(&self, nickname: &str) -> Result<(), ClientError> {
        self.send(ClientMessage::RequestSend {
            nickname: nickname.to_string(),
        })
    }

    pub fn respond(&self, game_id: GameId, accept: bool) -> Result<(), ClientError> {
        self.send(ClientMessage::RequestRespond { game_id, accept })
    }

    /// Submits a move after checking it against the local view.
    ///
    /// # Errors
    /// - [`ClientError::UnknownGame`] if no such game is being mirrored
    /// - [`ClientError::CannotMove`] or [`ClientError::BadLocation`] from
    ///   the local check; nothing is sent in that case
    pub fn make_move(&mut self, game_id: GameId, x: i32, y: i32) -> Result<(), ClientError> {
        let view = self
            .mirror
            .game_mut(game_id)
            .ok_or(ClientError::UnknownGame(game_id))?;
        view.begin_local_move(x, y)?;
        self.send(ClientMessage::GameMove { game_id, x, y })
    }

    pub fn forfeit(&self, game_id: GameId) -> Result<(), ClientError> {
        self.send(ClientMessage::GameForfeit { game_id })
    }

    /// Flushes anything queued, closes the connection, and waits for the
    /// writer to finish.
    pub async fn close(self) -> Result<(), ClientError> {
        let _ = self.outbound.send(Outbound::Close);
        drop(self.outbound);
        let written = self.writer_task.await;
        self.reader_task.abort();
        match written {
            Ok(result) => result.map_err(ClientError::from),
            Err(_) => Err(ClientError::Disconnected),
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("nickname", &self.nickname)
            .field("mirror", &self.mirror)
            .finish()
    }
}

async fn read_loop(
    mut reader: BufReader<OwnedReadHalf>,
    inbound: mpsc::UnboundedSender<ServerMessage>,
) -> Result<(), ClientError> {
    loop {
        match ServerMessage::read_from(&mut reader).await {
            Ok(Some(message)) => {
                tracing::trace!(?message, "received");
                if inbound.send(message).is_err() {
                    return Ok(());
                }
            }
            Ok(None) => {
                tracing::info!("server closed the connection");
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping connection after bad message");
                return Err(e.into());
            }
        }
    }
}
