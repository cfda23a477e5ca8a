//! Error types for the game layer.

/// Why a game operation was rejected.
///
/// Every variant is an application-level rejection: the game is left
/// untouched and only the player who asked is told.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// The game is pending or already finished.
    #[error("game is not in progress")]
    NotInProgress,

    /// The mover does not hold the turn.
    #[error("not this player's turn")]
    NotYourTurn,

    /// The coordinates are outside the 3×3 grid.
    #[error("({x}, {y}) is off the board")]
    OutOfBounds { x: i32, y: i32 },

    /// The cell already holds a symbol.
    #[error("({x}, {y}) is already taken")]
    CellOccupied { x: i32, y: i32 },

    /// `begin` was called on a game that is no longer pending.
    #[error("game has already started")]
    AlreadyStarted,
}

impl GameError {
    /// The text shown to the player whose request was rejected.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotInProgress | Self::NotYourTurn => "You cannot make a move right now.",
            Self::OutOfBounds { .. } | Self::CellOccupied { .. } => {
                "You cannot make a move at this location."
            }
            Self::AlreadyStarted => "That game has already started.",
        }
    }
}
