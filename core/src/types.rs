//! Shared primitive types used across the entire game.

use serde::{Deserialize, Serialize};

/// A turn counter. One turn = `years_per_turn` in-game years.
pub type Turn = u32;

/// An in-game calendar year.
pub type Year = i32;

/// The canonical play-session identifier.
pub type SessionId = String;

/// The board is always BOARD_SIZE x BOARD_SIZE.
pub const BOARD_SIZE: usize = 6;

/// Rows at or past this index are coast on a fresh board.
pub const COAST_START_ROW: usize = 4;

/// A position on the board. Rendering layers look cells up by this,
/// the domain model never holds a handle back into the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    pub row: usize,
    pub col: usize,
}

impl CellCoord {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn in_bounds(&self) -> bool {
        self.row < BOARD_SIZE && self.col < BOARD_SIZE
    }
}

/// The four bounded resources the player manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Money,
    Wellbeing,
    Environment,
    Resilience,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Money,
        Resource::Wellbeing,
        Resource::Environment,
        Resource::Resilience,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Money       => "money",
            Self::Wellbeing   => "wellbeing",
            Self::Environment => "environment",
            Self::Resilience  => "resilience",
        }
    }
}
