//! Structural validation of persisted JSON.
//!
//! RULE: Every record crossing the save/load/import boundary is checked
//! here before anything is built from it. Validation never repairs.

use crate::{
    error::ValidationError,
    state::CellKind,
    structure::StructureKind,
    types::{Turn, BOARD_SIZE},
};
use serde_json::{Map, Value};

pub const RESOURCE_FIELDS: [&str; 4] = ["money", "wellbeing", "environment", "resilience"];

/// Calendar years a saved game may carry.
pub const MIN_YEAR: f64 = 0.0;
pub const MAX_YEAR: f64 = 9999.0;

fn require<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, ValidationError> {
    obj.get(field).ok_or(ValidationError::MissingField(field))
}

fn require_number(obj: &Map<String, Value>, field: &'static str) -> Result<f64, ValidationError> {
    require(obj, field)?
        .as_f64()
        .filter(|n| n.is_finite())
        .ok_or(ValidationError::WrongType { field, expected: "a finite number" })
}

fn require_whole(obj: &Map<String, Value>, field: &'static str, min: f64, max: f64) -> Result<f64, ValidationError> {
    let n = require_number(obj, field)?;
    if n.fract() != 0.0 {
        return Err(ValidationError::WrongType { field, expected: "a whole number" });
    }
    if !(min..=max).contains(&n) {
        return Err(ValidationError::OutOfRange { field, value: n, min, max });
    }
    Ok(n)
}

/// A serialized game state: required fields present and typed, board 6x6.
pub fn validate_state_value(value: &Value) -> Result<(), ValidationError> {
    let obj = value.as_object().ok_or(ValidationError::NotAnObject("state"))?;

    for field in RESOURCE_FIELDS {
        require_number(obj, field)?;
    }
    require_whole(obj, "current_year", MIN_YEAR, MAX_YEAR)?;
    require_whole(obj, "turn", 0.0, f64::from(Turn::MAX))?;
    if !require(obj, "game_over")?.is_boolean() {
        return Err(ValidationError::WrongType { field: "game_over", expected: "a boolean" });
    }

    let rows = require(obj, "board")?
        .as_array()
        .ok_or(ValidationError::WrongType { field: "board", expected: "an array of rows" })?;
    if rows.len() != BOARD_SIZE {
        return Err(ValidationError::BoardRows { expected: BOARD_SIZE, found: rows.len() });
    }
    for (r, row) in rows.iter().enumerate() {
        let cells = row.as_array().ok_or(ValidationError::BoardRow {
            row:      r,
            expected: BOARD_SIZE,
            found:    0,
        })?;
        if cells.len() != BOARD_SIZE {
            return Err(ValidationError::BoardRow { row: r, expected: BOARD_SIZE, found: cells.len() });
        }
        for (c, cell) in cells.iter().enumerate() {
            validate_cell(cell).map_err(|reason| ValidationError::Cell { row: r, col: c, reason })?;
        }
    }
    Ok(())
}

fn validate_cell(cell: &Value) -> Result<(), String> {
    let obj = cell.as_object().ok_or_else(|| "not an object".to_string())?;
    match obj.get("type").and_then(Value::as_str) {
        Some(kind) if CellKind::from_name(kind).is_some() => {}
        Some(kind) => return Err(format!("unknown cell type `{kind}`")),
        None => return Err("missing cell type".to_string()),
    }
    match obj.get("structure") {
        None | Some(Value::Null) => {}
        Some(Value::String(name)) if StructureKind::from_name(name).is_some() => {}
        Some(other) => return Err(format!("unknown structure {other}")),
    }
    match obj.get("flooded") {
        None | Some(Value::Bool(_)) => Ok(()),
        Some(other) => Err(format!("`flooded` must be a boolean, found {other}")),
    }
}

/// A live game must not already be past the turn cap. Run after
/// `validate_state_value`.
pub fn validate_progress(value: &Value, max_turns: Turn) -> Result<(), ValidationError> {
    let obj = value.as_object().ok_or(ValidationError::NotAnObject("state"))?;
    let game_over = obj.get("game_over").and_then(Value::as_bool).unwrap_or(false);
    let turn = obj.get("turn").and_then(Value::as_f64).unwrap_or(0.0);
    if !game_over && turn > f64::from(max_turns) {
        return Err(ValidationError::PastTurnCap { turn: turn as Turn, max_turns });
    }
    Ok(())
}

/// A full save record: version matches, timestamp present, state valid.
pub fn validate_record_value(value: &Value, expected_version: &str) -> Result<(), ValidationError> {
    let obj = value.as_object().ok_or(ValidationError::NotAnObject("save record"))?;
    let version = require(obj, "version")?
        .as_str()
        .ok_or(ValidationError::WrongType { field: "version", expected: "a string" })?;
    if version != expected_version {
        return Err(ValidationError::VersionMismatch {
            expected: expected_version.to_string(),
            found:    version.to_string(),
        });
    }
    if !require(obj, "timestamp")?.is_string() {
        return Err(ValidationError::WrongType { field: "timestamp", expected: "a string" });
    }
    validate_state_value(require(obj, "state")?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn board(rows: usize) -> Value {
        let row: Vec<Value> = (0..BOARD_SIZE)
            .map(|_| json!({"type": "land", "structure": null, "flooded": false}))
            .collect();
        Value::Array(vec![Value::Array(row); rows])
    }

    fn state(rows: usize) -> Value {
        json!({
            "money": 100, "wellbeing": 50, "environment": 50, "resilience": 20,
            "current_year": 2025, "turn": 0, "game_over": false,
            "board": board(rows),
        })
    }

    #[test]
    fn accepts_a_fresh_state() {
        assert_eq!(validate_state_value(&state(6)), Ok(()));
    }

    #[test]
    fn rejects_short_board() {
        assert_eq!(
            validate_state_value(&state(5)),
            Err(ValidationError::BoardRows { expected: 6, found: 5 })
        );
    }

    #[test]
    fn rejects_a_year_no_calendar_has() {
        let mut s = state(6);
        s["current_year"] = json!(1e10);
        assert!(matches!(
            validate_state_value(&s),
            Err(ValidationError::OutOfRange { field: "current_year", .. })
        ));
    }

    #[test]
    fn rejects_fractional_and_negative_turns() {
        let mut s = state(6);
        s["turn"] = json!(2.5);
        assert!(matches!(
            validate_state_value(&s),
            Err(ValidationError::WrongType { field: "turn", expected: "a whole number" })
        ));
        s["turn"] = json!(-1);
        assert!(matches!(
            validate_state_value(&s),
            Err(ValidationError::OutOfRange { field: "turn", .. })
        ));
    }

    #[test]
    fn live_game_past_the_cap_is_rejected() {
        let mut s = state(6);
        s["turn"] = json!(150);
        assert_eq!(
            validate_progress(&s, 100),
            Err(ValidationError::PastTurnCap { turn: 150, max_turns: 100 })
        );
        s["turn"] = json!(100);
        assert_eq!(validate_progress(&s, 100), Ok(()));
        s["turn"] = json!(150);
        s["game_over"] = json!(true);
        assert_eq!(validate_progress(&s, 100), Ok(()));
    }

    #[test]
    fn rejects_string_resource() {
        let mut s = state(6);
        s["money"] = json!("lots");
        assert!(matches!(
            validate_state_value(&s),
            Err(ValidationError::WrongType { field: "money", .. })
        ));
    }

    #[test]
    fn rejects_unknown_structure() {
        let mut s = state(6);
        s["board"][2][3]["structure"] = json!("castle");
        assert!(matches!(
            validate_state_value(&s),
            Err(ValidationError::Cell { row: 2, col: 3, .. })
        ));
    }
}
