use serde::{Deserialize, Serialize};
use crate::{config::Difficulty, structure::StructureKind};

/// All player-issued commands.
/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    // ── Board ─────────────────────────────────────
    SelectCell { row: usize, col: usize },
    /// Build on the given cell, or on the selected one when omitted.
    Build {
        structure: StructureKind,
        #[serde(default)]
        row:       Option<usize>,
        #[serde(default)]
        col:       Option<usize>,
    },

    // ── Clock ─────────────────────────────────────
    AdvanceTurn {
        #[serde(default = "one")]
        count: u32,
    },

    // ── Session ───────────────────────────────────
    Save,
    Load,
    NewGame {
        #[serde(default)]
        difficulty: Option<Difficulty>,
    },
}

fn one() -> u32 {
    1
}
