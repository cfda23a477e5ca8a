//! Observer traits for lobby and game events.
//!
//! Every method has an empty default, so an observer only implements
//! the events it cares about. Observers are called synchronously from
//! [`Mirror::apply`](crate::Mirror::apply), after the mirrored state has
//! been updated.

use tictac_protocol::{GameId, GameStatus, MessageKind, Symbol};

use crate::GameView;

/// Receives lobby-level events.
pub trait LobbyObserver: Send {
    /// A player joined, or an existing player's score changed.
    fn player_entered(&mut self, _nickname: &str, _score: i32) {}

    fn player_left(&mut self, _nickname: &str) {}

    /// The server confirmed a challenge. `game_id` is [`GameId::NONE`]
    /// when no player called `nickname` exists.
    fn request_sent(&mut self, _game_id: GameId, _nickname: &str) {}

    fn request_received(&mut self, _game_id: GameId, _from: &str) {}

    /// A game this player is seated at has begun.
    fn game_started(&mut self, _game: &GameView) {}

    /// A message not tied to any live game.
    fn message_received(&mut self, _body: &str, _title: &str, _kind: MessageKind) {}
}

/// Receives events for the games this player is in.
pub trait GameObserver: Send {
    fn tile_changed(&mut self, _game_id: GameId, _x: i32, _y: i32, _symbol: Symbol) {}

    /// Status or turn changed. For a terminal status this is the last
    /// event the game produces.
    fn state_changed(&mut self, _game_id: GameId, _status: GameStatus, _can_move: bool) {}

    fn message_received(&mut self, _game_id: GameId, _body: &str, _title: &str, _kind: MessageKind) {
    }
}
