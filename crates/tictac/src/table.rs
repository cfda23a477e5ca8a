//! A live game shared between two sessions.
//!
//! [`GameHandle`] pairs the pure [`Game`] state machine with the two
//! [`SessionHandle`]s seated at it. Each handle has its own lock, so
//! moves in different games never wait on each other, while two moves
//! in the same game are serialized.
//!
//! Notices are delivered while the game lock is held. Delivery is a
//! non-blocking queue push, and holding the lock keeps both players'
//! streams in the same order when a move races a forfeit or disconnect.
//! No registry lock is ever taken from inside this lock.

use tictac_game::{Board, Game, GameError, MoveOutcome, Notices, Phase};
use tictac_protocol::{GameId, Symbol};
use tictac_session::SessionHandle;
use tokio::sync::Mutex;

pub struct GameHandle {
    id: GameId,
    cross: SessionHandle,
    nought: SessionHandle,
    state: Mutex<Game>,
}

impl GameHandle {
    /// Seats `cross` (who moves first) and `nought` at a pending game.
    pub fn new(id: GameId, cross: SessionHandle, nought: SessionHandle) -> Self {
        let game = Game::new(id, cross.nickname(), nought.nickname());
        Self {
            id,
            cross,
            nought,
            state: Mutex::new(game),
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    /// The session in `seat`.
    pub fn session(&self, seat: Symbol) -> &SessionHandle {
        match seat {
            Symbol::Cross => &self.cross,
            Symbol::Nought => &self.nought,
        }
    }

    /// The seat `session` occupies, or `None` if it is not playing here.
    pub fn seat_of(&self, session: &SessionHandle) -> Option<Symbol> {
        if session.id() == self.cross.id() {
            Some(Symbol::Cross)
        } else if session.id() == self.nought.id() {
            Some(Symbol::Nought)
        } else {
            None
        }
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase()
    }

    pub async fn board(&self) -> Board {
        self.state.lock().await.board().clone()
    }

    fn deliver(&self, notices: Notices) {
        for (seat, message) in notices {
            self.session(seat).send(message);
        }
    }

    /// Starts a pending game.
    pub async fn begin(&self) -> Result<(), GameError> {
        let mut game = self.state.lock().await;
        let notices = game.begin()?;
        self.deliver(notices);
        Ok(())
    }

    /// Applies a move for `mover` and delivers the result to both seats.
    ///
    /// A finished game (win or draw) still has to be removed from the
    /// registry by the caller, which also credits the winner.
    pub async fn make_move(&self, mover: Symbol, x: i32, y: i32) -> Result<MoveOutcome, GameError> {
        let mut game = self.state.lock().await;
        let (outcome, notices) = game.make_move(mover, x, y)?;
        self.deliver(notices);
        Ok(outcome)
    }

    /// Concedes on behalf of `by`; only the other seat is told.
    pub async fn forfeit(&self, by: Symbol) -> Result<(), GameError> {
        let mut game = self.state.lock().await;
        let notices = game.forfeit(by)?;
        self.deliver(notices);
        Ok(())
    }

    /// Ends the game early. Returns `false` if it had already finished.
    pub async fn terminate(&self, leaver: Option<Symbol>, reason: &str) -> bool {
        let mut game = self.state.lock().await;
        let notices = game.terminate(leaver, reason);
        let changed = !notices.is_empty();
        self.deliver(notices);
        changed
    }
}

impl std::fmt::Debug for GameHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameHandle")
            .field("id", &self.id)
            .field("cross", &self.cross.nickname())
            .field("nought", &self.nought.nickname())
            .finish()
    }
}
