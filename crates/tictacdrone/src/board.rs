//! The 3×3 game grid and the rules that judge it.
//!
//! Tiles are numbered row-major from the top-left corner:
//!
//! ```text
//!  0 | 1 | 2
//! ---+---+---
//!  3 | 4 | 5
//! ---+---+---
//!  6 | 7 | 8
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Number of tiles on the board.
pub const TILE_COUNT: usize = 9;

/// Every winning line as an ordered triple of tile indices.
///
/// Rows first, then columns, then the two diagonals. `Board::evaluate_terminal`
/// reports the first line in this order that matches.
pub const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Who holds a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occupant {
    /// Nobody has played here yet.
    #[default]
    Empty,
    /// The human player.
    Player,
    /// The vehicle.
    Machine,
}

impl std::fmt::Display for Occupant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Player => write!(f, "player"),
            Self::Machine => write!(f, "machine"),
        }
    }
}

/// Result of judging the board for one occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    /// The game continues.
    Ongoing,
    /// `occupant` completed `line`.
    Win {
        /// The winner.
        occupant: Occupant,
        /// The completed line.
        line: [usize; 3],
    },
    /// The board is full and nobody won.
    Draw,
}

impl Terminal {
    /// Whether the game has ended.
    #[must_use]
    pub fn is_over(&self) -> bool {
        !matches!(self, Self::Ongoing)
    }
}

/// The nine tiles of a game, indexed in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Board {
    tiles: [Occupant; TILE_COUNT],
}

impl Board {
    /// Create an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the occupant of a tile, or `None` if the index is off the board.
    #[must_use]
    pub fn get(&self, tile: usize) -> Option<Occupant> {
        self.tiles.get(tile).copied()
    }

    /// All tiles in index order.
    #[must_use]
    pub fn tiles(&self) -> &[Occupant; TILE_COUNT] {
        &self.tiles
    }

    /// Place `occupant` on `tile`.
    ///
    /// The board is left untouched when the move is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMove`] if `tile` is outside `0..=8`, if the tile
    /// is already taken, or if `occupant` is [`Occupant::Empty`].
    pub fn apply_move(&mut self, tile: usize, occupant: Occupant) -> Result<Board> {
        let current = self
            .get(tile)
            .ok_or_else(|| Error::invalid_move(tile, "tile is off the board"))?;
        if current != Occupant::Empty {
            return Err(Error::invalid_move(tile, "tile is already taken"));
        }
        if occupant == Occupant::Empty {
            return Err(Error::invalid_move(tile, "cannot place an empty marker"));
        }

        self.tiles[tile] = occupant;
        debug!(tile, %occupant, "Move applied");
        Ok(*self)
    }

    /// Judge the board from `occupant`'s point of view.
    ///
    /// A completed line is reported even when the board is also full.
    #[must_use]
    pub fn evaluate_terminal(&self, occupant: Occupant) -> Terminal {
        if occupant != Occupant::Empty {
            if let Some(line) = WIN_LINES
                .iter()
                .find(|line| line.iter().all(|&t| self.tiles[t] == occupant))
            {
                return Terminal::Win {
                    occupant,
                    line: *line,
                };
            }
        }

        if self.is_full() {
            Terminal::Draw
        } else {
            Terminal::Ongoing
        }
    }

    /// Number of tiles held by `occupant`.
    #[must_use]
    pub fn count(&self, occupant: Occupant) -> usize {
        self.tiles.iter().filter(|&&t| t == occupant).count()
    }

    /// Indices of every empty tile, ascending.
    pub fn empty_tiles(&self) -> impl Iterator<Item = usize> + '_ {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, &t)| t == Occupant::Empty)
            .map(|(i, _)| i)
    }

    /// Whether every tile is taken.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.tiles.iter().all(|&t| t != Occupant::Empty)
    }

    /// Clear every tile.
    pub fn reset(&mut self) {
        self.tiles = [Occupant::Empty; TILE_COUNT];
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (row, chunk) in self.tiles.chunks(3).enumerate() {
            if row > 0 {
                writeln!(f, "---+---+---")?;
            }
            let cells: Vec<String> = chunk
                .iter()
                .enumerate()
                .map(|(col, t)| match t {
                    Occupant::Empty => (row * 3 + col).to_string(),
                    Occupant::Player => "X".to_string(),
                    Occupant::Machine => "O".to_string(),
                })
                .collect();
            writeln!(f, " {} | {} | {}", cells[0], cells[1], cells[2])?;
        }
        Ok(())
    }
}
