//! The game state machine.
//!
//! ```text
//! Pending ──begin()──→ InProgress ──move/forfeit/terminate──→ Finished
//! ```
//!
//! [`Game`] is pure: every operation returns the messages it wants
//! delivered as `(Symbol, ServerMessage)` pairs, where the symbol names
//! the seat the message is for. The caller owns delivery (and the score
//! bookkeeping and registry removal that go with a finished game).

use serde::{Deserialize, Serialize};
use tictac_protocol::{GameId, GameStatus, MessageKind, ServerMessage, Symbol};

use crate::{Board, GameError};

/// Messages to deliver, addressed by seat.
pub type Notices = Vec<(Symbol, ServerMessage)>;

/// Title of the MESSAGE sent when a game ends early.
pub const TERMINATED_TITLE: &str = "Game Terminated";

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Won(Symbol),
    Draw,
    /// Ended early by forfeit or disconnect. No winner is recorded.
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Pending,
    InProgress,
    Finished(Outcome),
}

/// What a successful move did to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Play goes on; the turn passed to the other seat.
    Continue,
    /// The mover completed a line.
    Won { winner: Symbol },
    /// The board filled with no line.
    Draw,
}

impl MoveOutcome {
    /// Returns `true` if the move ended the game.
    pub fn is_final(self) -> bool {
        !matches!(self, Self::Continue)
    }
}

/// One game between two seats.
///
/// Seats are fixed at creation: whoever is given as `cross` plays CROSS
/// for the whole game, and CROSS always moves first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    id: GameId,
    cross: String,
    nought: String,
    board: Board,
    phase: Phase,
    turn: Symbol,
}

impl Game {
    /// Creates a pending game.
    pub fn new(id: GameId, cross: impl Into<String>, nought: impl Into<String>) -> Self {
        Self {
            id,
            cross: cross.into(),
            nought: nought.into(),
            board: Board::new(),
            phase: Phase::Pending,
            turn: Symbol::Cross,
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_pending(&self) -> bool {
        self.phase == Phase::Pending
    }

    pub fn is_in_progress(&self) -> bool {
        self.phase == Phase::InProgress
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished(_))
    }

    /// Whose move it is. Only meaningful while in progress.
    pub fn turn(&self) -> Option<Symbol> {
        self.is_in_progress().then_some(self.turn)
    }

    /// The nickname sitting in `seat`.
    pub fn nickname(&self, seat: Symbol) -> &str {
        match seat {
            Symbol::Cross => &self.cross,
            Symbol::Nought => &self.nought,
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Starts the game: GAME_BEGIN to each seat, then the first
    /// GAME_UPDATE granting CROSS the move.
    ///
    /// # Errors
    /// [`GameError::AlreadyStarted`] unless the game is pending.
    pub fn begin(&mut self) -> Result<Notices, GameError> {
        if !self.is_pending() {
            return Err(GameError::AlreadyStarted);
        }
        self.phase = Phase::InProgress;
        self.turn = Symbol::Cross;
        tracing::debug!(game_id = %self.id, cross = %self.cross, nought = %self.nought, "game started");

        let mut notices = Vec::with_capacity(4);
        for seat in [Symbol::Cross, Symbol::Nought] {
            notices.push((
                seat,
                ServerMessage::GameBegin {
                    game_id: self.id,
                    opponent: self.nickname(seat.opponent()).to_owned(),
                    symbol: seat,
                },
            ));
        }
        self.push_turn_updates(&mut notices);
        Ok(notices)
    }

    /// Places the mover's symbol at `(x, y)`.
    ///
    /// On success every seat receives the GAME_MOVE, followed by either
    /// the next turn update or the terminal status (WON to the mover and
    /// LOST to the other seat, or DRAW to both).
    ///
    /// # Errors
    /// - [`GameError::NotInProgress`] / [`GameError::NotYourTurn`]
    /// - [`GameError::OutOfBounds`] / [`GameError::CellOccupied`]
    ///
    /// A rejected move leaves the game exactly as it was.
    pub fn make_move(
        &mut self,
        mover: Symbol,
        x: i32,
        y: i32,
    ) -> Result<(MoveOutcome, Notices), GameError> {
        if !self.is_in_progress() {
            return Err(GameError::NotInProgress);
        }
        if self.turn != mover {
            return Err(GameError::NotYourTurn);
        }
        self.board.place(x, y, mover)?;

        let mut notices = Vec::with_capacity(4);
        for seat in [Symbol::Cross, Symbol::Nought] {
            notices.push((
                seat,
                ServerMessage::GameMove {
                    game_id: self.id,
                    x,
                    y,
                    symbol: mover,
                },
            ));
        }

        let outcome = if self.board.has_line(mover) {
            self.phase = Phase::Finished(Outcome::Won(mover));
            notices.push((mover, self.status(GameStatus::Won)));
            notices.push((mover.opponent(), self.status(GameStatus::Lost)));
            MoveOutcome::Won { winner: mover }
        } else if self.board.is_full() {
            self.phase = Phase::Finished(Outcome::Draw);
            notices.push((Symbol::Cross, self.status(GameStatus::Draw)));
            notices.push((Symbol::Nought, self.status(GameStatus::Draw)));
            MoveOutcome::Draw
        } else {
            self.turn = mover.opponent();
            self.push_turn_updates(&mut notices);
            MoveOutcome::Continue
        };
        Ok((outcome, notices))
    }

    /// Concedes an in-progress game on behalf of `by`.
    ///
    /// # Errors
    /// [`GameError::NotInProgress`] if the game is pending or finished.
    pub fn forfeit(&mut self, by: Symbol) -> Result<Notices, GameError> {
        if !self.is_in_progress() {
            return Err(GameError::NotInProgress);
        }
        let reason = format!("{} forfeit.", self.nickname(by));
        Ok(self.terminate(Some(by), &reason))
    }

    /// Ends the game early.
    ///
    /// Every seat except `leaver` gets the reason as an ERROR message and
    /// a DRAW status. Calling this on a finished game does nothing and
    /// returns no notices, so forfeit and disconnect can race safely.
    pub fn terminate(&mut self, leaver: Option<Symbol>, reason: &str) -> Notices {
        if self.is_finished() {
            return Vec::new();
        }
        self.phase = Phase::Finished(Outcome::Terminated);
        tracing::debug!(game_id = %self.id, reason, "game terminated");

        let body = format!("This game has terminated early because:\n{reason}");
        [Symbol::Cross, Symbol::Nought]
            .into_iter()
            .filter(|&seat| Some(seat) != leaver)
            .flat_map(|seat| {
                [
                    (
                        seat,
                        ServerMessage::message(self.id, body.clone(), TERMINATED_TITLE, MessageKind::ERROR),
                    ),
                    (seat, self.status(GameStatus::Draw)),
                ]
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn status(&self, status: GameStatus) -> ServerMessage {
        ServerMessage::GameUpdate {
            game_id: self.id,
            can_move: false,
            status,
        }
    }

    fn push_turn_updates(&self, notices: &mut Notices) {
        for seat in [Symbol::Cross, Symbol::Nought] {
            notices.push((
                seat,
                ServerMessage::GameUpdate {
                    game_id: self.id,
                    can_move: self.turn == seat,
                    status: GameStatus::InProgress,
                },
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> Game {
        let mut game = Game::new(GameId(1), "alice", "bob");
        game.begin().unwrap();
        game
    }

    fn for_seat(notices: &Notices, seat: Symbol) -> Vec<ServerMessage> {
        notices
            .iter()
            .filter(|(s, _)| *s == seat)
            .map(|(_, m)| m.clone())
            .collect()
    }

    #[test]
    fn test_new_game_is_pending_with_no_turn() {
        let game = Game::new(GameId(1), "alice", "bob");
        assert!(game.is_pending());
        assert_eq!(game.turn(), None);
        assert_eq!(game.nickname(Symbol::Cross), "alice");
        assert_eq!(game.nickname(Symbol::Nought), "bob");
    }

    #[test]
    fn test_begin_sends_complementary_symbols_and_cross_moves_first() {
        let mut game = Game::new(GameId(5), "alice", "bob");
        let notices = game.begin().unwrap();

        assert_eq!(
            for_seat(&notices, Symbol::Cross),
            vec![
                ServerMessage::GameBegin {
                    game_id: GameId(5),
                    opponent: "bob".into(),
                    symbol: Symbol::Cross
                },
                ServerMessage::GameUpdate {
                    game_id: GameId(5),
                    can_move: true,
                    status: GameStatus::InProgress
                },
            ]
        );
        assert_eq!(
            for_seat(&notices, Symbol::Nought),
            vec![
                ServerMessage::GameBegin {
                    game_id: GameId(5),
                    opponent: "alice".into(),
                    symbol: Symbol::Nought
                },
                ServerMessage::GameUpdate {
                    game_id: GameId(5),
                    can_move: false,
                    status: GameStatus::InProgress
                },
            ]
        );
        assert_eq!(game.turn(), Some(Symbol::Cross));
    }

    #[test]
    fn test_begin_twice_is_rejected() {
        let mut game = started();
        assert_eq!(game.begin(), Err(GameError::AlreadyStarted));
    }

    #[test]
    fn test_make_move_on_pending_game_is_rejected() {
        let mut game = Game::new(GameId(1), "alice", "bob");
        assert_eq!(
            game.make_move(Symbol::Cross, 0, 0).unwrap_err(),
            GameError::NotInProgress
        );
    }

    #[test]
    fn test_make_move_switches_turn() {
        let mut game = started();
        let (outcome, notices) = game.make_move(Symbol::Cross, 0, 0).unwrap();
        assert_eq!(outcome, MoveOutcome::Continue);
        assert_eq!(game.turn(), Some(Symbol::Nought));

        let bob = for_seat(&notices, Symbol::Nought);
        assert_eq!(
            bob,
            vec![
                ServerMessage::GameMove {
                    game_id: GameId(1),
                    x: 0,
                    y: 0,
                    symbol: Symbol::Cross
                },
                ServerMessage::GameUpdate {
                    game_id: GameId(1),
                    can_move: true,
                    status: GameStatus::InProgress
                },
            ]
        );
    }

    #[test]
    fn test_forfeit_notifies_only_the_other_seat() {
        let mut game = started();
        let notices = game.forfeit(Symbol::Nought).unwrap();
        assert!(for_seat(&notices, Symbol::Nought).is_empty());
        assert_eq!(
            for_seat(&notices, Symbol::Cross),
            vec![
                ServerMessage::message(
                    GameId(1),
                    "This game has terminated early because:\nbob forfeit.",
                    "Game Terminated",
                    MessageKind::ERROR
                ),
                ServerMessage::GameUpdate {
                    game_id: GameId(1),
                    can_move: false,
                    status: GameStatus::Draw
                },
            ]
        );
        assert_eq!(game.phase(), Phase::Finished(Outcome::Terminated));
    }

    #[test]
    fn test_forfeit_pending_game_is_rejected() {
        let mut game = Game::new(GameId(1), "alice", "bob");
        assert_eq!(game.forfeit(Symbol::Cross), Err(GameError::NotInProgress));
        assert!(game.is_pending());
    }

    #[test]
    fn test_terminate_is_idempotent() {
        let mut game = started();
        assert_eq!(game.terminate(Some(Symbol::Cross), "alice disconnected.").len(), 2);
        assert!(game.terminate(Some(Symbol::Nought), "bob disconnected.").is_empty());
    }

    #[test]
    fn test_terminate_without_leaver_notifies_both() {
        let mut game = Game::new(GameId(1), "alice", "bob");
        let notices = game.terminate(None, "server shutting down.");
        assert_eq!(notices.len(), 4);
    }

    #[test]
    fn test_game_serializes_phase() {
        let game = started();
        let json = serde_json::to_value(&game).unwrap();
        assert_eq!(json["phase"], "InProgress");
        assert_eq!(json["id"], 1);
    }
}
