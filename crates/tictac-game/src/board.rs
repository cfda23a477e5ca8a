//! The 3×3 grid.

use serde::{Deserialize, Serialize};
use tictac_protocol::Symbol;

use crate::GameError;

/// Side length of the board.
pub const SIZE: usize = 3;

/// A tic-tac-toe board, indexed by `(x, y)` with both in `0..3`.
///
/// A cell goes from empty to occupied at most once; there is no way to
/// clear a cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: [[Option<Symbol>; SIZE]; SIZE],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(x: i32, y: i32) -> Option<(usize, usize)> {
        let x = usize::try_from(x).ok().filter(|&v| v < SIZE)?;
        let y = usize::try_from(y).ok().filter(|&v| v < SIZE)?;
        Some((x, y))
    }

    /// The cell at `(x, y)`, or `None` if the coordinates are off the board.
    pub fn get(&self, x: i32, y: i32) -> Option<Option<Symbol>> {
        Self::index(x, y).map(|(x, y)| self.cells[x][y])
    }

    /// Writes `symbol` into an empty cell.
    ///
    /// # Errors
    /// - [`GameError::OutOfBounds`] if `(x, y)` is outside the grid
    /// - [`GameError::CellOccupied`] if the cell already holds a symbol
    pub fn place(&mut self, x: i32, y: i32, symbol: Symbol) -> Result<(), GameError> {
        let (ix, iy) = Self::index(x, y).ok_or(GameError::OutOfBounds { x, y })?;
        let cell = &mut self.cells[ix][iy];
        if cell.is_some() {
            return Err(GameError::CellOccupied { x, y });
        }
        *cell = Some(symbol);
        Ok(())
    }

    /// Writes `symbol` at `(x, y)` without any rule checks.
    ///
    /// Used by client mirrors, which trust the server. Off-board
    /// coordinates are ignored.
    pub fn set(&mut self, x: i32, y: i32, symbol: Symbol) {
        if let Some((x, y)) = Self::index(x, y) {
            self.cells[x][y] = Some(symbol);
        }
    }

    /// Returns `true` if `symbol` fills a row, column, or diagonal.
    pub fn has_line(&self, symbol: Symbol) -> bool {
        let b = &self.cells;
        let m = Some(symbol);
        (0..SIZE).any(|i| (0..SIZE).all(|j| b[i][j] == m))       // columns of x
            || (0..SIZE).any(|j| (0..SIZE).all(|i| b[i][j] == m)) // rows of y
            || (0..SIZE).all(|i| b[i][i] == m)
            || (0..SIZE).all(|i| b[i][SIZE - 1 - i] == m)
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|col| col.iter().all(Option::is_some))
    }

    /// Renders the board as three lines of text, `y` growing downwards.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(SIZE * (SIZE * 2 + 1));
        for y in 0..SIZE {
            for x in 0..SIZE {
                if x > 0 {
                    out.push('|');
                }
                out.push(self.cells[x][y].map_or('.', Symbol::as_char));
            }
            out.push('\n');
        }
        out
    }
}
