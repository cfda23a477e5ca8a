//! Applies server messages to the local lobby and game views.

use std::collections::HashMap;

use tictac_protocol::{GameId, ServerMessage};

use crate::{GameObserver, GameView, Lobby, LobbyObserver};

/// Everything the client knows about the server's state.
///
/// Messages carrying the id of a live game go to that game's view;
/// everything else goes to the lobby. A game's view is dropped once a
/// terminal GAME_UPDATE has been applied and observers have seen it.
#[derive(Default)]
pub struct Mirror {
    lobby: Lobby,
    games: HashMap<GameId, GameView>,
    game_observers: Vec<Box<dyn GameObserver>>,
}

impl Mirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lobby(&self) -> &Lobby {
        &self.lobby
    }

    pub fn game(&self, id: GameId) -> Option<&GameView> {
        self.games.get(&id)
    }

    pub fn game_mut(&mut self, id: GameId) -> Option<&mut GameView> {
        self.games.get_mut(&id)
    }

    /// Ids of the games in progress, ascending.
    pub fn game_ids(&self) -> Vec<GameId> {
        let mut ids: Vec<GameId> = self.games.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn add_lobby_observer(&mut self, observer: Box<dyn LobbyObserver>) {
        self.lobby.add_observer(observer);
    }

    pub fn add_game_observer(&mut self, observer: Box<dyn GameObserver>) {
        self.game_observers.push(observer);
    }

    /// Folds one server message into the mirror and notifies observers.
    pub fn apply(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::Status { ok, detail } => {
                tracing::debug!(ok = *ok, %detail, "ignoring STATUS after handshake");
            }
            ServerMessage::Message {
                game_id,
                body,
                title,
                kind,
            } => match self.games.get_mut(game_id) {
                Some(view) => {
                    view.clear_pending();
                    for observer in &mut self.game_observers {
                        observer.message_received(*game_id, body, title, *kind);
                    }
                }
                None => self.lobby.message(body, title, *kind),
            },
            ServerMessage::RequestSent { game_id, nickname } => {
                self.lobby.request_sent(*game_id, nickname);
            }
            ServerMessage::RequestReceived { game_id, from } => {
                self.lobby.request_received(*game_id, from);
            }
            ServerMessage::PlayerUpdate { nickname, score } => {
                self.lobby.player_update(nickname, *score);
            }
            ServerMessage::PlayerLeave { nickname } => self.lobby.player_leave(nickname),
            ServerMessage::GameBegin {
                game_id,
                opponent,
                symbol,
            } => {
                let view = GameView::new(*game_id, opponent.as_str(), *symbol);
                self.lobby.game_started(&view);
                self.games.insert(*game_id, view);
            }
            ServerMessage::GameMove {
                game_id,
                x,
                y,
                symbol,
            } => {
                let Some(view) = self.games.get_mut(game_id) else {
                    tracing::debug!(%game_id, "GAME_MOVE for unknown game");
                    return;
                };
                view.apply_move(*x, *y, *symbol);
                for observer in &mut self.game_observers {
                    observer.tile_changed(*game_id, *x, *y, *symbol);
                }
            }
            ServerMessage::GameUpdate {
                game_id,
                can_move,
                status,
            } => {
                let Some(view) = self.games.get_mut(game_id) else {
                    tracing::debug!(%game_id, "GAME_UPDATE for unknown game");
                    return;
                };
                view.apply_update(*can_move, *status);
                for observer in &mut self.game_observers {
                    observer.state_changed(*game_id, *status, *can_move);
                }
                if status.is_terminal() {
                    self.games.remove(game_id);
                }
            }
            ServerMessage::Unknown { opcode } => {
                tracing::debug!(opcode, "ignoring unknown opcode");
            }
        }
    }
}

impl std::fmt::Debug for Mirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mirror")
            .field("lobby", &self.lobby)
            .field("games", &self.game_ids())
            .finish()
    }
}
