//! The canonical game state: pure data, no I/O.
//!
//! RULE: Resources are only changed through `Resources::adjust` and
//! `Resources::set`, which clamp to [0, 100] at the point of mutation.
//! No caller ever observes an out-of-range resource.

use crate::{
    achievement::AchievementLedger,
    climate::EnvironmentalSnapshot,
    config::GameConfig,
    end_condition::GameOutcome,
    error::{GameError, GameResult},
    structure::StructureKind,
    types::{CellCoord, Resource, Turn, Year, BOARD_SIZE, COAST_START_ROW},
};
use serde::{Deserialize, Serialize};

pub const RESOURCE_MIN: f64 = 0.0;
pub const RESOURCE_MAX: f64 = 100.0;

/// Clamp a resource value into [0, 100]. NaN collapses to the floor.
pub fn clamp_resource(value: f64) -> f64 {
    if value.is_nan() {
        RESOURCE_MIN
    } else {
        value.clamp(RESOURCE_MIN, RESOURCE_MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resources {
    money:       f64,
    wellbeing:   f64,
    environment: f64,
    resilience:  f64,
}

impl Resources {
    pub fn new(money: f64, wellbeing: f64, environment: f64, resilience: f64) -> Self {
        Self {
            money:       clamp_resource(money),
            wellbeing:   clamp_resource(wellbeing),
            environment: clamp_resource(environment),
            resilience:  clamp_resource(resilience),
        }
    }

    pub fn get(&self, resource: Resource) -> f64 {
        match resource {
            Resource::Money       => self.money,
            Resource::Wellbeing   => self.wellbeing,
            Resource::Environment => self.environment,
            Resource::Resilience  => self.resilience,
        }
    }

    fn slot(&mut self, resource: Resource) -> &mut f64 {
        match resource {
            Resource::Money       => &mut self.money,
            Resource::Wellbeing   => &mut self.wellbeing,
            Resource::Environment => &mut self.environment,
            Resource::Resilience  => &mut self.resilience,
        }
    }

    /// Overwrite a resource. Returns the stored (clamped) value.
    pub fn set(&mut self, resource: Resource, value: f64) -> f64 {
        let slot = self.slot(resource);
        *slot = clamp_resource(value);
        *slot
    }

    /// Add `delta` to a resource and clamp. A NaN delta is ignored.
    /// Returns the stored value.
    pub fn adjust(&mut self, resource: Resource, delta: f64) -> f64 {
        if delta.is_nan() {
            log::warn!("ignoring NaN delta for {}", resource.name());
            return self.get(resource);
        }
        let slot = self.slot(resource);
        *slot = clamp_resource(*slot + delta);
        *slot
    }

    pub fn money(&self) -> f64       { self.money }
    pub fn wellbeing(&self) -> f64   { self.wellbeing }
    pub fn environment(&self) -> f64 { self.environment }
    pub fn resilience(&self) -> f64  { self.resilience }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Land,
    Coast,
}

impl CellKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Land  => "land",
            Self::Coast => "coast",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "land"  => Some(Self::Land),
            "coast" => Some(Self::Coast),
            _ => None,
        }
    }

    /// The terrain a fresh board puts in `row`.
    pub fn for_row(row: usize) -> Self {
        if row >= COAST_START_ROW { Self::Coast } else { Self::Land }
    }
}

/// One board square. `flooded` is an overlay on the terrain, not a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub kind:      CellKind,
    pub structure: Option<StructureKind>,
    pub flooded:   bool,
}

impl Cell {
    pub fn fresh(row: usize) -> Self {
        Self {
            kind:      CellKind::for_row(row),
            structure: None,
            flooded:   false,
        }
    }

    pub fn is_protected(&self) -> bool {
        self.structure.is_some_and(|s| s.protects_from_flood())
    }
}

/// Fixed-size grid. The shape is part of the type, so a non-6x6 board
/// can only exist in serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// Land everywhere except the last two rows, which are coast.
    pub fn fresh() -> Self {
        let mut cells = [[Cell::fresh(0); BOARD_SIZE]; BOARD_SIZE];
        for (row, cells_in_row) in cells.iter_mut().enumerate() {
            *cells_in_row = [Cell::fresh(row); BOARD_SIZE];
        }
        Self { cells }
    }

    pub fn get(&self, at: CellCoord) -> Option<&Cell> {
        self.cells.get(at.row).and_then(|r| r.get(at.col))
    }

    pub fn get_mut(&mut self, at: CellCoord) -> Option<&mut Cell> {
        self.cells.get_mut(at.row).and_then(|r| r.get_mut(at.col))
    }

    pub fn rows(&self) -> &[[Cell; BOARD_SIZE]; BOARD_SIZE] {
        &self.cells
    }

    /// Every cell with its coordinate, row-major.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, &Cell)> {
        self.cells.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .map(move |(col, cell)| (CellCoord::new(row, col), cell))
        })
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.cells.iter_mut().flat_map(|r| r.iter_mut())
    }

    pub fn count_where(&self, pred: impl Fn(&Cell) -> bool) -> usize {
        self.iter().filter(|(_, c)| pred(c)).count()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::fresh()
    }
}

/// The single source of truth for one play session.
///
/// Owned by the caller and passed by reference into every engine and
/// persistence operation; there is no global instance.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub resources:    Resources,
    pub current_year: Year,
    pub turn:         Turn,
    pub board:        Board,
    /// UI-only. Never persisted.
    pub selected_cell: Option<CellCoord>,
    pub game_over:    bool,
    /// The one terminal outcome, set together with `game_over`.
    pub outcome:      Option<GameOutcome>,
    /// Extra flood risk carried into the next turn's sea-level check.
    pub flood_surge:  f64,
    pub achievements: AchievementLedger,
    pub environmental_snapshot: Option<EnvironmentalSnapshot>,
}

impl GameState {
    /// A fresh game from the configured initial conditions.
    pub fn new(config: &GameConfig) -> Self {
        let init = &config.initial;
        Self {
            resources: Resources::new(
                init.money,
                init.wellbeing,
                init.environment,
                init.resilience,
            ),
            current_year:  init.year,
            turn:          0,
            board:         Board::fresh(),
            selected_cell: None,
            game_over:     false,
            outcome:       None,
            flood_surge:   0.0,
            achievements:  AchievementLedger::default(),
            environmental_snapshot: None,
        }
    }

    pub fn money(&self) -> f64       { self.resources.money() }
    pub fn wellbeing(&self) -> f64   { self.resources.wellbeing() }
    pub fn environment(&self) -> f64 { self.resources.environment() }
    pub fn resilience(&self) -> f64  { self.resources.resilience() }

    /// Select a cell for the next placement. Out-of-bounds coordinates
    /// leave the selection unchanged.
    pub fn select_cell(&mut self, at: CellCoord) -> bool {
        if self.game_over || !at.in_bounds() {
            return false;
        }
        self.selected_cell = Some(at);
        true
    }

    /// Conditions that only a programming defect could break.
    /// The engine refuses to run a turn on a state that fails these.
    pub fn check_invariants(&self, config: &GameConfig) -> GameResult<()> {
        for resource in Resource::ALL {
            let value = self.resources.get(resource);
            if !value.is_finite() || !(RESOURCE_MIN..=RESOURCE_MAX).contains(&value) {
                return Err(GameError::InvariantViolation(format!(
                    "{} = {value} is outside [{RESOURCE_MIN}, {RESOURCE_MAX}]",
                    resource.name()
                )));
            }
        }
        if !self.game_over && self.turn > config.max_turns {
            return Err(GameError::InvariantViolation(format!(
                "live game at turn {} is past the {}-turn cap",
                self.turn, config.max_turns
            )));
        }
        if !self.flood_surge.is_finite() {
            return Err(GameError::InvariantViolation(format!(
                "flood surge is {}", self.flood_surge
            )));
        }
        Ok(())
    }
}
