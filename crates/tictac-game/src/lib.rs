//! Authoritative tic-tac-toe rules for tictac.
//!
//! Nothing here does I/O. A [`Game`] validates moves, detects wins and
//! draws, and hands back the messages each seat should receive; the
//! server decides how to deliver them.
//!
//! # Key types
//!
//! - [`Board`]: the 3×3 grid and line detection
//! - [`Game`]: phase, turn, and the transitions between them
//! - [`GameError`]: why a request was rejected, and what to tell the player

mod board;
mod error;
mod game;

pub use board::{Board, SIZE};
pub use error::GameError;
pub use game::{Game, MoveOutcome, Notices, Outcome, Phase, TERMINATED_TITLE};
