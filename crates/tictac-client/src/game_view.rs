//! Local mirror of one game.
//!
//! The server is authoritative. The view only records what it is told,
//! plus one piece of local state: after submitting a move the player
//! may not submit another until the server answers.

use tictac_game::Board;
use tictac_protocol::{GameId, GameStatus, Symbol};

use crate::ClientError;

#[derive(Debug, Clone)]
pub struct GameView {
    id: GameId,
    symbol: Symbol,
    opponent: String,
    board: Board,
    status: GameStatus,
    can_move: bool,
    awaiting_server: bool,
}

impl GameView {
    /// A freshly begun game. Nobody may move until the first GAME_UPDATE.
    pub fn new(id: GameId, opponent: impl Into<String>, symbol: Symbol) -> Self {
        Self {
            id,
            symbol,
            opponent: opponent.into(),
            board: Board::new(),
            status: GameStatus::InProgress,
            can_move: false,
            awaiting_server: false,
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    /// The symbol the local player plays.
    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    pub fn opponent_symbol(&self) -> Symbol {
        self.symbol.opponent()
    }

    pub fn opponent(&self) -> &str {
        &self.opponent
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// The server's last word on whether it is this player's turn.
    pub fn can_move(&self) -> bool {
        self.can_move
    }

    pub fn is_awaiting_server(&self) -> bool {
        self.awaiting_server
    }

    /// Whether the local player may submit a move right now.
    pub fn may_move(&self) -> bool {
        self.can_move && !self.awaiting_server && self.status == GameStatus::InProgress
    }

    /// Checks a move locally and, if it looks legal, marks the view as
    /// waiting for the server. The board itself is left untouched until
    /// the server echoes the move back.
    ///
    /// # Errors
    /// - [`ClientError::CannotMove`] if [`may_move`](Self::may_move) is false
    /// - [`ClientError::BadLocation`] if the cell is off the board or taken
    pub fn begin_local_move(&mut self, x: i32, y: i32) -> Result<(), ClientError> {
        if !self.may_move() {
            return Err(ClientError::CannotMove(self.id));
        }
        if self.board.get(x, y) != Some(None) {
            return Err(ClientError::BadLocation { x, y });
        }
        self.awaiting_server = true;
        Ok(())
    }

    pub(crate) fn apply_move(&mut self, x: i32, y: i32, symbol: Symbol) {
        self.board.set(x, y, symbol);
    }

    pub(crate) fn apply_update(&mut self, can_move: bool, status: GameStatus) {
        self.can_move = can_move;
        self.status = status;
        self.awaiting_server = false;
    }

    /// A game message (typically a rejected move) also answers a
    /// pending submission.
    pub(crate) fn clear_pending(&mut self) {
        self.awaiting_server = false;
    }
}
