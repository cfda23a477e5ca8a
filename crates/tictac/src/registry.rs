//! The process-wide registry of players and games.
//!
//! One [`Registry`] is created per server and passed to every connection
//! handler as an `Arc`. It owns two independent maps:
//!
//! - nickname → [`SessionHandle`] (the lobby)
//! - [`GameId`] → [`GameHandle`] (live and pending games)
//!
//! Each map has its own lock. Broadcasts copy the recipient list while
//! the lock is held and push messages after it is released, so a lock
//! is never held across anything slower than a `HashMap` operation.
//!
//! # Lock order
//!
//! A game's own lock is never held while a registry lock is taken. Code
//! that needs both (e.g. finishing a game) releases the game first.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use tictac_protocol::{GameId, MessageKind, ServerMessage, Symbol};
use tictac_session::{Outbound, SessionHandle, nickname};
use tokio::sync::{Mutex, mpsc};

use crate::table::GameHandle;

/// Title used for challenge-related MESSAGEs.
pub const GAME_REQUEST_TITLE: &str = "Game Request";

/// STATUS detail when a taken nickname has no room left for a suffix.
pub const NICKNAME_TOO_LONG: &str = "That nickname is taken and too long to make unique.";

pub struct Registry {
    sessions: Mutex<HashMap<String, SessionHandle>>,
    games: Mutex<HashMap<GameId, Arc<GameHandle>>>,
    next_game_id: AtomicI32,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            games: Mutex::new(HashMap::new()),
            next_game_id: AtomicI32::new(1),
        }
    }

    // -----------------------------------------------------------------------
    // Lobby
    // -----------------------------------------------------------------------

    /// Registers a new session under `requested`, renamed if taken.
    ///
    /// The successful STATUS reply is queued before the session becomes
    /// visible to anyone else, so it is always the first thing the
    /// client reads. Every other player then gets a PLAYER_UPDATE.
    ///
    /// Returns `None` if no name derived from `requested` fits on the
    /// wire. The client is sent a failed STATUS and nothing is
    /// registered; dropping `outbound` lets the writer finish.
    pub async fn register(
        &self,
        requested: &str,
        outbound: mpsc::UnboundedSender<Outbound<ServerMessage>>,
    ) -> Option<SessionHandle> {
        let (session, others) = {
            let mut sessions = self.sessions.lock().await;
            let Some(assigned) = nickname::resolve(requested, |n| sessions.contains_key(n)) else {
                drop(sessions);
                tracing::warn!(len = requested.len(), "no room to suffix nickname, rejecting");
                let _ = outbound.send(Outbound::Message(ServerMessage::Status {
                    ok: false,
                    detail: NICKNAME_TOO_LONG.to_owned(),
                }));
                return None;
            };
            let session = SessionHandle::new(assigned.clone(), outbound);
            session.send(ServerMessage::Status {
                ok: true,
                detail: assigned.clone(),
            });
            let others: Vec<SessionHandle> = sessions.values().cloned().collect();
            sessions.insert(assigned, session.clone());
            (session, others)
        };

        if session.nickname() != requested {
            tracing::info!(session = %session.id(), requested, assigned = session.nickname(), "nickname taken, renamed");
        }
        tracing::info!(session = %session.id(), nickname = session.nickname(), "player registered");

        let update = session.player_update();
        for other in others {
            other.send(update.clone());
        }
        Some(session)
    }

    /// Removes `session` from the lobby and tells everyone still there.
    ///
    /// The entry is only removed if it still belongs to this session.
    /// The session is marked closed either way. Returns `true` if an
    /// entry was removed.
    pub async fn deregister(&self, session: &SessionHandle) -> bool {
        session.mark_closed();
        let (removed, remaining) = {
            let mut sessions = self.sessions.lock().await;
            let owned = sessions
                .get(session.nickname())
                .is_some_and(|s| s.id() == session.id());
            if owned {
                sessions.remove(session.nickname());
            }
            let remaining: Vec<SessionHandle> = sessions.values().cloned().collect();
            (owned, remaining)
        };

        if removed {
            tracing::info!(session = %session.id(), nickname = session.nickname(), "player left");
            let leave = ServerMessage::PlayerLeave {
                nickname: session.nickname().to_owned(),
            };
            for other in remaining {
                other.send(leave.clone());
            }
        }
        removed
    }

    /// Replays a PLAYER_UPDATE for every registered player, the
    /// requester included, to the requester only.
    pub async fn snapshot(&self, requester: &SessionHandle) {
        let mut players: Vec<SessionHandle> = self.sessions.lock().await.values().cloned().collect();
        players.sort_by(|a, b| a.nickname().cmp(b.nickname()));
        for player in players {
            requester.send(player.player_update());
        }
    }

    /// Sends `session`'s current score to every registered player,
    /// `session` included.
    pub async fn broadcast_player_update(&self, session: &SessionHandle) {
        let update = session.player_update();
        let everyone: Vec<SessionHandle> = self.sessions.lock().await.values().cloned().collect();
        for player in everyone {
            player.send(update.clone());
        }
    }

    pub async fn session(&self, nickname: &str) -> Option<SessionHandle> {
        self.sessions.lock().await.get(nickname).cloned()
    }

    pub async fn player_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    // -----------------------------------------------------------------------
    // Games
    // -----------------------------------------------------------------------

    /// Creates a pending game between `initiator` (CROSS) and the player
    /// named `opponent` (NOUGHT), and tells both about it.
    ///
    /// If no such player exists the initiator receives REQUEST_SENT with
    /// id `-1` and nothing is created. Challenging oneself is rejected
    /// with a MESSAGE.
    pub async fn create_game(
        &self,
        initiator: &SessionHandle,
        opponent_nickname: &str,
    ) -> Option<Arc<GameHandle>> {
        if opponent_nickname == initiator.nickname() {
            initiator.send(ServerMessage::message(
                GameId::NONE,
                "You cannot challenge yourself.",
                GAME_REQUEST_TITLE,
                MessageKind::ERROR,
            ));
            return None;
        }

        let Some(opponent) = self.session(opponent_nickname).await else {
            tracing::debug!(session = %initiator.id(), opponent = opponent_nickname, "challenge to unknown player");
            initiator.send(ServerMessage::RequestSent {
                game_id: GameId::NONE,
                nickname: opponent_nickname.to_owned(),
            });
            return None;
        };

        let id = GameId(self.next_game_id.fetch_add(1, Ordering::Relaxed));
        let game = Arc::new(GameHandle::new(id, initiator.clone(), opponent.clone()));
        self.games.lock().await.insert(id, Arc::clone(&game));
        initiator.add_game(id).await;
        opponent.add_game(id).await;

        tracing::info!(game_id = %id, cross = initiator.nickname(), nought = opponent.nickname(), "game created");
        initiator.send(ServerMessage::RequestSent {
            game_id: id,
            nickname: opponent.nickname().to_owned(),
        });
        opponent.send(ServerMessage::RequestReceived {
            game_id: id,
            from: initiator.nickname().to_owned(),
        });

        // Either player may have disconnected between the lookup and the
        // insertion above; their cleanup could have missed this game.
        for seat in [Symbol::Cross, Symbol::Nought] {
            let player = game.session(seat);
            if player.is_closed() {
                let reason = format!("{} disconnected.", player.nickname());
                self.terminate_game(&game, Some(seat), &reason).await;
                break;
            }
        }
        Some(game)
    }

    pub async fn game(&self, id: GameId) -> Option<Arc<GameHandle>> {
        self.games.lock().await.get(&id).cloned()
    }

    pub async fn game_count(&self) -> usize {
        self.games.lock().await.len()
    }

    /// Drops a game from the map and from both players' game sets.
    pub async fn remove_game(&self, id: GameId) -> Option<Arc<GameHandle>> {
        let game = self.games.lock().await.remove(&id)?;
        for seat in [Symbol::Cross, Symbol::Nought] {
            game.session(seat).remove_game(id).await;
        }
        tracing::debug!(game_id = %id, "game removed");
        Some(game)
    }

    /// Ends a game early and removes it.
    pub async fn terminate_game(&self, game: &GameHandle, leaver: Option<Symbol>, reason: &str) {
        if game.terminate(leaver, reason).await {
            tracing::info!(game_id = %game.id(), reason, "game terminated");
        }
        self.remove_game(game.id()).await;
    }

    /// Full cleanup for a session whose connection ended: leave the
    /// lobby, then terminate every game it was part of.
    pub async fn disconnect(&self, session: &SessionHandle) {
        self.deregister(session).await;

        let reason = format!("{} disconnected.", session.nickname());
        for id in session.games().await {
            let Some(game) = self.game(id).await else {
                continue;
            };
            let leaver = game.seat_of(session);
            self.terminate_game(&game, leaver, &reason).await;
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tictac_protocol::GameStatus;

    type Rx = mpsc::UnboundedReceiver<Outbound<ServerMessage>>;

    async fn join(registry: &Registry, nickname: &str) -> (SessionHandle, Rx) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = registry.register(nickname, tx).await.unwrap();
        (session, rx)
    }

    fn drain(rx: &mut Rx) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(Outbound::Message(m)) = rx.try_recv() {
            out.push(m);
        }
        out
    }

    #[tokio::test]
    async fn test_register_suffixes_duplicate_nicknames() {
        let registry = Registry::new();
        let (a, _ra) = join(&registry, "N").await;
        let (b, _rb) = join(&registry, "N").await;
        let (c, _rc) = join(&registry, "N").await;
        assert_eq!(a.nickname(), "N");
        assert_eq!(b.nickname(), "N [1]");
        assert_eq!(c.nickname(), "N [2]");
        assert_eq!(registry.player_count().await, 3);
    }

    #[tokio::test]
    async fn test_register_without_room_for_suffix_is_rejected() {
        let registry = Registry::new();
        let long = "x".repeat(tictac_protocol::wire::MAX_STRING_LEN - 2);
        let (_first, _r1) = join(&registry, &long).await;
        let (_carol, mut rc) = join(&registry, "carol").await;
        drain(&mut rc);

        let (tx, mut rx) = mpsc::unbounded_channel();
        assert!(registry.register(&long, tx).await.is_none());

        assert_eq!(
            drain(&mut rx),
            vec![ServerMessage::Status {
                ok: false,
                detail: NICKNAME_TOO_LONG.into()
            }]
        );
        assert!(drain(&mut rc).is_empty());
        assert_eq!(registry.player_count().await, 2);
    }

    #[tokio::test]
    async fn test_register_status_is_first_and_others_get_update() {
        let registry = Registry::new();
        let (_alice, mut ra) = join(&registry, "alice").await;
        drain(&mut ra);
        let (_bob, mut rb) = join(&registry, "bob").await;

        assert_eq!(
            drain(&mut rb),
            vec![ServerMessage::Status {
                ok: true,
                detail: "bob".into()
            }]
        );
        assert_eq!(
            drain(&mut ra),
            vec![ServerMessage::PlayerUpdate {
                nickname: "bob".into(),
                score: 0
            }]
        );
    }

    #[tokio::test]
    async fn test_deregister_ignores_stale_session_with_same_name() {
        let registry = Registry::new();
        let (alice, _ra) = join(&registry, "alice").await;
        assert!(registry.deregister(&alice).await);
        let (alice2, _ra2) = join(&registry, "alice").await;
        assert_eq!(alice2.nickname(), "alice");

        // The first session is gone; deregistering it again must not
        // evict the newcomer who reused the name.
        assert!(!registry.deregister(&alice).await);
        assert!(registry.session("alice").await.is_some());
    }

    #[tokio::test]
    async fn test_snapshot_includes_requester_and_goes_only_to_requester() {
        let registry = Registry::new();
        let (alice, mut ra) = join(&registry, "alice").await;
        let (_bob, mut rb) = join(&registry, "bob").await;
        drain(&mut ra);
        drain(&mut rb);

        registry.snapshot(&alice).await;
        let names: Vec<String> = drain(&mut ra)
            .into_iter()
            .filter_map(|m| match m {
                ServerMessage::PlayerUpdate { nickname, .. } => Some(nickname),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["alice".to_string(), "bob".to_string()]);
        assert!(drain(&mut rb).is_empty());
    }

    #[tokio::test]
    async fn test_create_game_unknown_opponent_sends_sentinel() {
        let registry = Registry::new();
        let (alice, mut ra) = join(&registry, "alice").await;
        drain(&mut ra);

        assert!(registry.create_game(&alice, "carol").await.is_none());
        assert_eq!(
            drain(&mut ra),
            vec![ServerMessage::RequestSent {
                game_id: GameId::NONE,
                nickname: "carol".into()
            }]
        );
        assert_eq!(registry.game_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_game_self_challenge_rejected() {
        let registry = Registry::new();
        let (alice, mut ra) = join(&registry, "alice").await;
        drain(&mut ra);

        assert!(registry.create_game(&alice, "alice").await.is_none());
        assert!(matches!(
            drain(&mut ra).as_slice(),
            [ServerMessage::Message { game_id: GameId::NONE, .. }]
        ));
    }

    #[tokio::test]
    async fn test_create_game_ids_are_distinct_and_start_at_one() {
        let registry = Registry::new();
        let (alice, _ra) = join(&registry, "alice").await;
        let (_bob, _rb) = join(&registry, "bob").await;

        let first = registry.create_game(&alice, "bob").await.unwrap();
        let second = registry.create_game(&alice, "bob").await.unwrap();
        assert_eq!(first.id(), GameId(1));
        assert_eq!(second.id(), GameId(2));
        assert_eq!(alice.games().await, vec![GameId(1), GameId(2)]);

        registry.remove_game(first.id()).await;
        assert!(registry.game(GameId(1)).await.is_none());
        assert_eq!(alice.games().await, vec![GameId(2)]);
    }

    #[tokio::test]
    async fn test_create_game_with_closed_opponent_terminates_at_once() {
        let registry = Registry::new();
        let (alice, mut ra) = join(&registry, "alice").await;
        let (bob, _rb) = join(&registry, "bob").await;
        // Closed but not yet deregistered: the window create_game guards.
        bob.mark_closed();
        drain(&mut ra);

        let game = registry.create_game(&alice, "bob").await.unwrap();
        assert!(registry.game(game.id()).await.is_none());
        let to_alice = drain(&mut ra);
        assert!(to_alice.contains(&ServerMessage::GameUpdate {
            game_id: game.id(),
            can_move: false,
            status: GameStatus::Draw
        }));
    }

    #[tokio::test]
    async fn test_disconnect_terminates_games_and_broadcasts_leave() {
        let registry = Registry::new();
        let (alice, _ra) = join(&registry, "alice").await;
        let (bob, mut rb) = join(&registry, "bob").await;
        let game = registry.create_game(&alice, "bob").await.unwrap();
        game.begin().await.unwrap();
        drain(&mut rb);

        registry.disconnect(&alice).await;

        let to_bob = drain(&mut rb);
        assert_eq!(
            to_bob,
            vec![
                ServerMessage::PlayerLeave {
                    nickname: "alice".into()
                },
                ServerMessage::message(
                    game.id(),
                    "This game has terminated early because:\nalice disconnected.",
                    "Game Terminated",
                    MessageKind::ERROR
                ),
                ServerMessage::GameUpdate {
                    game_id: game.id(),
                    can_move: false,
                    status: GameStatus::Draw
                },
            ]
        );
        assert!(registry.game(game.id()).await.is_none());
        assert!(bob.games().await.is_empty());
        assert_eq!(registry.player_count().await, 1);
    }
}
