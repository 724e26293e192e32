//! Structure catalog and placement.
//!
//! Structures are immutable configuration: a one-time cost, a resource
//! delta applied on completion, and a placement rule over the target cell.
//! The catalog is never saved; only the kind placed on each cell is.

use crate::{
    error::PlacementError,
    state::{Cell, CellKind, GameState},
    types::{CellCoord, Resource},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    Residential,
    Industrial,
    Mangrove,
    Seawall,
}

/// Where a structure may go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementRule {
    /// Land or coast.
    AnyTerrain,
    /// Coast only, and only while the cell is dry.
    UnfloodedCoast,
}

impl PlacementRule {
    pub fn allows(&self, cell: &Cell) -> bool {
        match self {
            Self::AnyTerrain     => true,
            Self::UnfloodedCoast => cell.kind == CellKind::Coast && !cell.flooded,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StructureSpec {
    pub label:     &'static str,
    pub cost:      f64,
    pub effects:   &'static [(Resource, f64)],
    pub placement: PlacementRule,
}

const RESIDENTIAL: StructureSpec = StructureSpec {
    label:     "Residential Zone",
    cost:      20.0,
    effects:   &[(Resource::Wellbeing, 10.0), (Resource::Environment, -5.0)],
    placement: PlacementRule::AnyTerrain,
};

const INDUSTRIAL: StructureSpec = StructureSpec {
    label:     "Industrial Zone",
    cost:      30.0,
    effects:   &[(Resource::Money, 15.0), (Resource::Environment, -10.0)],
    placement: PlacementRule::AnyTerrain,
};

const MANGROVE: StructureSpec = StructureSpec {
    label:     "Restored Mangrove",
    cost:      15.0,
    effects:   &[(Resource::Environment, 15.0), (Resource::Resilience, 5.0)],
    placement: PlacementRule::UnfloodedCoast,
};

const SEAWALL: StructureSpec = StructureSpec {
    label:     "Seawall",
    cost:      25.0,
    effects:   &[(Resource::Resilience, 10.0)],
    placement: PlacementRule::UnfloodedCoast,
};

impl StructureKind {
    pub const ALL: [StructureKind; 4] = [
        StructureKind::Residential,
        StructureKind::Industrial,
        StructureKind::Mangrove,
        StructureKind::Seawall,
    ];

    pub fn spec(&self) -> &'static StructureSpec {
        match self {
            Self::Residential => &RESIDENTIAL,
            Self::Industrial  => &INDUSTRIAL,
            Self::Mangrove    => &MANGROVE,
            Self::Seawall     => &SEAWALL,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Residential => "residential",
            Self::Industrial  => "industrial",
            Self::Mangrove    => "mangrove",
            Self::Seawall     => "seawall",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Mangroves and seawalls keep a coast cell dry during a flood.
    pub fn protects_from_flood(&self) -> bool {
        matches!(self, Self::Mangrove | Self::Seawall)
    }
}

/// What a successful placement cost and where it went.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementReceipt {
    pub kind:        StructureKind,
    pub at:          CellCoord,
    pub cost:        f64,
    pub money_after: f64,
}

/// Build `kind` on the cell at `at`.
///
/// Checks run in a fixed order and the first failure is returned with
/// the state untouched: game over, bounds, occupied, flooded, funds,
/// placement rule.
pub fn place_structure(
    state: &mut GameState,
    kind:  StructureKind,
    at:    CellCoord,
) -> Result<PlacementReceipt, PlacementError> {
    if state.game_over {
        return Err(PlacementError::GameOver);
    }
    let spec = kind.spec();
    let money = state.resources.money();
    let cell = state
        .board
        .get(at)
        .ok_or(PlacementError::OutOfBounds { row: at.row, col: at.col })?;

    if let Some(existing) = cell.structure {
        return Err(PlacementError::Occupied(existing));
    }
    if cell.flooded {
        return Err(PlacementError::Flooded);
    }
    if money < spec.cost {
        return Err(PlacementError::InsufficientFunds {
            kind,
            cost: spec.cost,
            available: money,
        });
    }
    if !spec.placement.allows(cell) {
        return Err(PlacementError::RuleViolation {
            kind,
            terrain: cell.kind.name(),
        });
    }

    if let Some(cell) = state.board.get_mut(at) {
        cell.structure = Some(kind);
    }
    state.resources.adjust(Resource::Money, -spec.cost);
    for (resource, delta) in spec.effects {
        state.resources.adjust(*resource, *delta);
    }

    log::debug!(
        "built {} at ({}, {}) for {}",
        kind.name(), at.row, at.col, spec.cost
    );

    Ok(PlacementReceipt {
        kind,
        at,
        cost: spec.cost,
        money_after: state.resources.money(),
    })
}
