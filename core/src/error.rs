use thiserror::Error;

use crate::{structure::StructureKind, types::Turn};

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Restore failed: {0}")]
    RestoreFailed(ValidationError),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Placement rejected: {0}")]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type GameResult<T> = Result<T, GameError>;

/// Malformed or out-of-contract data at a save/load/import boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("record is not valid JSON: {0}")]
    Malformed(String),

    #[error("expected a JSON object for `{0}`")]
    NotAnObject(&'static str),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` must be {expected}")]
    WrongType {
        field:    &'static str,
        expected: &'static str,
    },

    #[error("board must have {expected} rows, found {found}")]
    BoardRows { expected: usize, found: usize },

    #[error("board row {row} must have {expected} cells, found {found}")]
    BoardRow {
        row:      usize,
        expected: usize,
        found:    usize,
    },

    #[error("cell ({row}, {col}) is malformed: {reason}")]
    Cell {
        row:    usize,
        col:    usize,
        reason: String,
    },

    #[error("save version `{found}` is not supported (expected `{expected}`)")]
    VersionMismatch { expected: String, found: String },

    #[error("field `{field}` = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min:   f64,
        max:   f64,
    },

    #[error("live game at turn {turn} is past the {max_turns}-turn cap")]
    PastTurnCap { turn: Turn, max_turns: Turn },
}

/// A single catalog rule failed to evaluate. Contained per rule by the engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("rule '{rule}' has probability {value}, expected a value in [0, 1]")]
    InvalidProbability { rule: String, value: f64 },

    #[error("rule '{rule}' read malformed {field}: {detail}")]
    MalformedData {
        rule:   String,
        field:  &'static str,
        detail: String,
    },
}

/// External climate data could not be fetched this cycle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("{source_name} unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },

    #[error("{source_name} returned malformed data: {reason}")]
    Malformed { source_name: String, reason: String },
}

/// Why a structure could not be placed. Nothing is mutated on rejection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlacementError {
    #[error("the game is over")]
    GameOver,

    #[error("no cell selected")]
    NoSelection,

    #[error("cell ({row}, {col}) is outside the board")]
    OutOfBounds { row: usize, col: usize },

    #[error("cell already holds a {0:?}")]
    Occupied(StructureKind),

    #[error("cell is flooded and cannot be built on")]
    Flooded,

    #[error("{kind:?} costs {cost} but only {available} is available")]
    InsufficientFunds {
        kind:      StructureKind,
        cost:      f64,
        available: f64,
    },

    #[error("{kind:?} cannot be built on {terrain} cells")]
    RuleViolation {
        kind:    StructureKind,
        terrain: &'static str,
    },
}
