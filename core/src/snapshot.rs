//! Serialized game state. The persisted shape of a `GameState`, and the
//! lenient rebuild that turns stored JSON back into a playable state.
//!
//! `selected_cell` is UI-only and never written.

use crate::{
    achievement::AchievementLedger,
    climate::EnvironmentalSnapshot,
    config::GameConfig,
    end_condition::GameOutcome,
    error::{GameError, GameResult},
    state::{Board, Cell, CellKind, GameState, Resources},
    structure::StructureKind,
    types::{CellCoord, Turn, Year, BOARD_SIZE},
    validate::validate_state_value,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedCell {
    #[serde(rename = "type")]
    pub kind:      CellKind,
    pub structure: Option<StructureKind>,
    pub flooded:   bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedGameState {
    pub money:        f64,
    pub wellbeing:    f64,
    pub environment:  f64,
    pub resilience:   f64,
    pub current_year: Year,
    pub turn:         Turn,
    pub game_over:    bool,
    pub board:        Vec<Vec<SerializedCell>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome:      Option<GameOutcome>,
    #[serde(default)]
    pub flood_surge:  f64,
    #[serde(default)]
    pub achievements: AchievementLedger,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environmental_snapshot: Option<EnvironmentalSnapshot>,
}

/// What actually sits in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRecord {
    pub version:   String,
    pub timestamp: DateTime<Utc>,
    pub state:     SerializedGameState,
}

impl SaveRecord {
    pub fn new(version: &str, state: &GameState) -> Self {
        Self {
            version:   version.to_string(),
            timestamp: Utc::now(),
            state:     serialize(state),
        }
    }
}

pub fn serialize(state: &GameState) -> SerializedGameState {
    let board = state
        .board
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| SerializedCell {
                    kind:      cell.kind,
                    structure: cell.structure,
                    flooded:   cell.flooded,
                })
                .collect()
        })
        .collect();

    SerializedGameState {
        money:        state.money(),
        wellbeing:    state.wellbeing(),
        environment:  state.environment(),
        resilience:   state.resilience(),
        current_year: state.current_year,
        turn:         state.turn,
        game_over:    state.game_over,
        board,
        outcome:      state.outcome,
        flood_surge:  state.flood_surge,
        achievements: state.achievements.clone(),
        environmental_snapshot: state.environmental_snapshot.clone(),
    }
}

impl SerializedGameState {
    pub fn to_value(&self) -> GameResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// A number that is present, finite and non-negative, else `default`.
fn sanitize(obj: &Map<String, Value>, field: &str, default: f64) -> f64 {
    match obj.get(field).and_then(Value::as_f64) {
        Some(n) if n.is_finite() && n >= 0.0 => n,
        Some(n) => {
            log::warn!("restore: `{field}` = {n} replaced by {default}");
            default
        }
        None => default,
    }
}

fn restore_cell(value: &Value, row: usize) -> Cell {
    let mut cell = Cell::fresh(row);
    let Some(obj) = value.as_object() else {
        return cell;
    };
    if let Some(kind) = obj.get("type").and_then(Value::as_str).and_then(CellKind::from_name) {
        cell.kind = kind;
    }
    cell.structure = obj
        .get("structure")
        .and_then(Value::as_str)
        .and_then(StructureKind::from_name);
    cell.flooded = obj.get("flooded").and_then(Value::as_bool).unwrap_or(false);
    cell
}

/// Rebuild a 6x6 board. A missing or wrong-sized board becomes a fresh
/// one; a malformed row or cell becomes the fresh terrain for its position.
fn restore_board(value: Option<&Value>) -> Board {
    let mut board = Board::fresh();
    let rows = match value.and_then(Value::as_array) {
        Some(rows) if rows.len() == BOARD_SIZE => rows,
        _ => {
            log::warn!("restore: board missing or wrong size, starting a fresh board");
            return board;
        }
    };
    for (r, row) in rows.iter().enumerate() {
        let cells = match row.as_array() {
            Some(cells) if cells.len() == BOARD_SIZE => cells,
            _ => continue,
        };
        for (c, value) in cells.iter().enumerate() {
            if let Some(slot) = board.get_mut(CellCoord::new(r, c)) {
                *slot = restore_cell(value, r);
            }
        }
    }
    board
}

/// Reconstruct a full `GameState` from stored JSON.
///
/// Missing, negative or non-numeric scalars take the configured default.
/// Optional extras that fail to parse are dropped. The result is
/// serialized and validated again before it is returned.
pub fn restore(value: &Value, config: &GameConfig) -> GameResult<GameState> {
    let empty = Map::new();
    let obj = value.as_object().unwrap_or(&empty);
    let init = &config.initial;

    let resources = Resources::new(
        sanitize(obj, "money", init.money),
        sanitize(obj, "wellbeing", init.wellbeing),
        sanitize(obj, "environment", init.environment),
        sanitize(obj, "resilience", init.resilience),
    );

    let state = GameState {
        resources,
        current_year:  sanitize(obj, "current_year", f64::from(init.year)) as Year,
        turn:          sanitize(obj, "turn", 0.0) as Turn,
        board:         restore_board(obj.get("board")),
        selected_cell: None,
        game_over:     obj.get("game_over").and_then(Value::as_bool).unwrap_or(false),
        outcome:       parse_optional(obj, "outcome"),
        flood_surge:   sanitize(obj, "flood_surge", 0.0),
        achievements:  parse_optional(obj, "achievements").unwrap_or_default(),
        environmental_snapshot: parse_optional(obj, "environmental_snapshot"),
    };

    validate_state_value(&serialize(&state).to_value()?).map_err(GameError::RestoreFailed)?;
    Ok(state)
}

fn parse_optional<T: serde::de::DeserializeOwned>(obj: &Map<String, Value>, field: &str) -> Option<T> {
    let value = obj.get(field).filter(|v| !v.is_null())?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            log::warn!("restore: dropping unreadable `{field}`: {e}");
            None
        }
    }
}
