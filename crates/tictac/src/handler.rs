//! Per-connection handler: handshake, read loop, and dispatch.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that owns the write half. The flow is:
//!   1. Read CONNECT → check version → register (renamed if needed)
//!   2. Loop: read a message → dispatch to the registry or a game
//!   3. On EOF, error, or writer failure → leave the lobby, terminate
//!      this player's games, close the outbound queue

use std::sync::Arc;
use std::time::Duration;

use tictac_game::{GameError, MoveOutcome, Phase};
use tictac_protocol::{
    ClientMessage, ConnectRequest, GameId, MessageKind, PROTOCOL_VERSION, ProtocolError,
    ServerMessage, Symbol, read_connect,
};
use tictac_session::{Outbound, SessionError, SessionHandle, writer};
use tictac_transport::Connection;
use tokio::io::{AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::registry::{GAME_REQUEST_TITLE, Registry};
use crate::table::GameHandle;
use crate::TictacError;

/// Title used for game-related MESSAGEs.
const GAME_TITLE: &str = "Game";

/// How long a rejected connection's leftover input is discarded before
/// the socket is closed.
const REJECT_DRAIN_WINDOW: Duration = Duration::from_millis(200);

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C>(
    conn: C,
    registry: Arc<Registry>,
    handshake_timeout: Option<Duration>,
) -> Result<(), TictacError>
where
    C: Connection,
{
    let conn_id = conn.id();
    let peer = conn.peer_addr();
    tracing::debug!(%conn_id, %peer, "handling new connection");

    let (reader, write_half) = conn.into_split();
    let mut reader = BufReader::new(reader);
    let (outbound, queue) = mpsc::unbounded_channel();

    let mut writer_task = tokio::spawn(async move {
        let result = writer::run(write_half, queue).await;
        if let Err(e) = &result {
            tracing::debug!(%conn_id, error = %e, "writer stopped");
        }
        result
    });

    // --- Step 1: Handshake ---
    let request = match perform_handshake(&mut reader, handshake_timeout).await {
        Ok(request) => request,
        Err(e) => {
            if let TictacError::Protocol(ProtocolError::VersionMismatch { got, .. }) = &e {
                let _ = outbound.send(Outbound::Message(ServerMessage::Status {
                    ok: false,
                    detail: version_mismatch_reason(*got),
                }));
            }
            tracing::warn!(%conn_id, %peer, error = %e, "handshake failed");
            let _ = outbound.send(Outbound::Close);
            drop(outbound);
            finish_rejected(writer_task, &mut reader).await;
            return Err(e);
        }
    };

    let Some(session) = registry.register(&request.nickname, outbound).await else {
        tracing::warn!(%conn_id, %peer, "nickname rejected");
        finish_rejected(writer_task, &mut reader).await;
        return Err(TictacError::NicknameUnavailable);
    };
    tracing::debug!(%conn_id, session = %session.id(), "handshake complete");

    // --- Step 2: Message loop ---
    let result = loop {
        tokio::select! {
            read = ClientMessage::read_from(&mut reader) => match read {
                Ok(Some(message)) => dispatch(&registry, &session, message).await,
                Ok(None) => {
                    tracing::info!(session = %session.id(), "connection closed cleanly");
                    break Ok(());
                }
                Err(e) => {
                    tracing::debug!(session = %session.id(), error = %e, "read failed");
                    break Err(TictacError::from(e));
                }
            },
            _ = &mut writer_task => {
                tracing::debug!(session = %session.id(), "writer gone, dropping connection");
                break Ok(());
            }
        }
    };

    // --- Step 3: Cleanup ---
    registry.disconnect(&session).await;
    // The writer drains what is left and exits on the close marker.
    session.close();
    result
}

/// Reads and validates the CONNECT message.
async fn perform_handshake<R>(
    reader: &mut BufReader<R>,
    timeout: Option<Duration>,
) -> Result<ConnectRequest, TictacError>
where
    R: AsyncRead + Unpin,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, read_connect(reader))
            .await
            .map_err(|_| TictacError::HandshakeTimeout)?
            .map_err(TictacError::from),
        None => Ok(read_connect(reader).await?),
    }
}

/// Lets the writer flush a rejection, then discards leftover input for a
/// short while before the socket is dropped.
async fn finish_rejected<R>(
    writer_task: JoinHandle<Result<(), SessionError>>,
    reader: &mut BufReader<R>,
) where
    R: AsyncRead + Unpin,
{
    let _ = writer_task.await;
    // Unread bytes at close turn the FIN into a reset, which can
    // discard the rejection before the peer reads it.
    let _ = tokio::time::timeout(
        REJECT_DRAIN_WINDOW,
        tokio::io::copy(reader, &mut tokio::io::sink()),
    )
    .await;
}

/// The human-readable STATUS detail for a version mismatch.
pub fn version_mismatch_reason(client_version: i32) -> String {
    format!(
        "Protocol version mismatch: server uses version {PROTOCOL_VERSION}, client uses version {client_version}."
    )
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

async fn dispatch(registry: &Registry, session: &SessionHandle, message: ClientMessage) {
    tracing::trace!(session = %session.id(), ?message, "received");
    match message {
        ClientMessage::RequestSend { nickname } => {
            registry.create_game(session, &nickname).await;
        }
        ClientMessage::RequestRespond { game_id, accept } => {
            respond(registry, session, game_id, accept).await;
        }
        ClientMessage::PlayerGetList => registry.snapshot(session).await,
        ClientMessage::GameMove { game_id, x, y } => {
            make_move(registry, session, game_id, x, y).await;
        }
        ClientMessage::GameForfeit { game_id } => forfeit(registry, session, game_id).await,
        ClientMessage::Connect { .. } => {
            tracing::debug!(session = %session.id(), "ignoring repeated CONNECT");
        }
        ClientMessage::Unknown { opcode } => {
            tracing::debug!(session = %session.id(), opcode, "ignoring unknown opcode");
        }
    }
}

fn game_error(game_id: GameId, body: &str) -> ServerMessage {
    ServerMessage::message(game_id, body, GAME_TITLE, MessageKind::ERROR)
}

/// Looks up a game `session` is seated at, replying with an error if
/// there is no such game or the session is not playing in it.
async fn seated_game(
    registry: &Registry,
    session: &SessionHandle,
    game_id: GameId,
) -> Option<(Arc<GameHandle>, Symbol)> {
    let Some(game) = registry.game(game_id).await else {
        session.send(game_error(GameId::NONE, "That game does not exist."));
        return None;
    };
    let Some(seat) = game.seat_of(session) else {
        session.send(game_error(GameId::NONE, "You are not playing in that game."));
        return None;
    };
    Some((game, seat))
}

async fn respond(registry: &Registry, session: &SessionHandle, game_id: GameId, accept: bool) {
    let Some((game, seat)) = seated_game(registry, session, game_id).await else {
        return;
    };
    // Only the challenged player (NOUGHT) answers a request.
    if seat != Symbol::Nought {
        session.send(game_error(GameId::NONE, "That game request was not sent to you."));
        return;
    }

    if accept {
        match game.begin().await {
            Ok(()) => tracing::info!(%game_id, "challenge accepted"),
            Err(e) => session.send(game_error(game_id, e.user_message())),
        }
        return;
    }

    if game.phase().await != Phase::Pending {
        session.send(game_error(game_id, GameError::AlreadyStarted.user_message()));
        return;
    }
    registry.remove_game(game_id).await;
    tracing::info!(%game_id, "challenge declined");
    game.session(Symbol::Cross).send(ServerMessage::message(
        GameId::NONE,
        format!("{} declined your game request.", session.nickname()),
        GAME_REQUEST_TITLE,
        MessageKind::INFORMATION,
    ));
}

async fn make_move(registry: &Registry, session: &SessionHandle, game_id: GameId, x: i32, y: i32) {
    let Some((game, seat)) = seated_game(registry, session, game_id).await else {
        return;
    };
    let outcome = match game.make_move(seat, x, y).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::debug!(session = %session.id(), %game_id, x, y, error = %e, "move rejected");
            session.send(game_error(game_id, e.user_message()));
            return;
        }
    };

    if outcome.is_final() {
        registry.remove_game(game_id).await;
        tracing::info!(%game_id, ?outcome, "game finished");
    }
    if let MoveOutcome::Won { winner } = outcome {
        let winner = game.session(winner);
        let score = winner.record_win();
        tracing::debug!(session = %winner.id(), score, "score updated");
        registry.broadcast_player_update(winner).await;
    }
}

async fn forfeit(registry: &Registry, session: &SessionHandle, game_id: GameId) {
    let Some((game, seat)) = seated_game(registry, session, game_id).await else {
        return;
    };
    match game.forfeit(seat).await {
        Ok(()) => {
            tracing::info!(%game_id, nickname = session.nickname(), "game forfeited");
            registry.remove_game(game_id).await;
        }
        Err(_) => session.send(game_error(game_id, "That game has not started.")),
    }
}
