//! The client's view of the lobby roster.

use std::collections::BTreeMap;

use tictac_protocol::{GameId, MessageKind};

use crate::{GameView, LobbyObserver};

/// Nickname → score, as last reported by the server.
///
/// The map is ordered so listings come out sorted by nickname.
#[derive(Default)]
pub struct Lobby {
    players: BTreeMap<String, i32>,
    observers: Vec<Box<dyn LobbyObserver>>,
}

impl Lobby {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(&mut self, observer: Box<dyn LobbyObserver>) {
        self.observers.push(observer);
    }

    /// Known players in nickname order.
    pub fn players(&self) -> impl Iterator<Item = (&str, i32)> {
        self.players.iter().map(|(name, score)| (name.as_str(), *score))
    }

    pub fn score(&self, nickname: &str) -> Option<i32> {
        self.players.get(nickname).copied()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    // -----------------------------------------------------------------------
    // Updates, applied by the mirror
    // -----------------------------------------------------------------------

    pub(crate) fn player_update(&mut self, nickname: &str, score: i32) {
        self.players.insert(nickname.to_string(), score);
        for observer in &mut self.observers {
            observer.player_entered(nickname, score);
        }
    }

    pub(crate) fn player_leave(&mut self, nickname: &str) {
        self.players.remove(nickname);
        for observer in &mut self.observers {
            observer.player_left(nickname);
        }
    }

    pub(crate) fn request_sent(&mut self, game_id: GameId, nickname: &str) {
        for observer in &mut self.observers {
            observer.request_sent(game_id, nickname);
        }
    }

    pub(crate) fn request_received(&mut self, game_id: GameId, from: &str) {
        for observer in &mut self.observers {
            observer.request_received(game_id, from);
        }
    }

    pub(crate) fn game_started(&mut self, game: &GameView) {
        for observer in &mut self.observers {
            observer.game_started(game);
        }
    }

    pub(crate) fn message(&mut self, body: &str, title: &str, kind: MessageKind) {
        for observer in &mut self.observers {
            observer.message_received(body, title, kind);
        }
    }
}

impl std::fmt::Debug for Lobby {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lobby")
            .field("players", &self.players)
            .field("observers", &self.observers.len())
            .finish()
    }
}
