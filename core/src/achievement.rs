//! One-time achievements. Each unlocks at most once per game and pays
//! its reward through the clamped resource path.

use crate::{
    state::{CellKind, GameState},
    types::Resource,
};
use serde::{Deserialize, Serialize};

/// Consecutive turns with environment at or above the bar.
pub const ECO_STREAK_TURNS: u32 = 10;
pub const ECO_STREAK_LEVEL: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementId {
    /// Resilience reaches 50 before 2050.
    EarlyPlanner,
    /// Environment held at 80+ for ten turns running.
    EcoWarrior,
    /// Every coast cell carries a seawall or mangrove.
    CoastalGuardian,
}

impl AchievementId {
    pub const ALL: [AchievementId; 3] = [
        AchievementId::EarlyPlanner,
        AchievementId::EcoWarrior,
        AchievementId::CoastalGuardian,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::EarlyPlanner    => "Early Planner",
            Self::EcoWarrior      => "Eco Warrior",
            Self::CoastalGuardian => "Coastal Guardian",
        }
    }

    pub fn reward(&self) -> &'static [(Resource, f64)] {
        match self {
            Self::EarlyPlanner    => &[(Resource::Money, 50.0), (Resource::Wellbeing, 10.0)],
            Self::EcoWarrior      => &[(Resource::Environment, 15.0), (Resource::Resilience, 10.0)],
            Self::CoastalGuardian => &[(Resource::Money, 100.0), (Resource::Resilience, 20.0)],
        }
    }

    fn reached(&self, state: &GameState) -> bool {
        match self {
            Self::EarlyPlanner => state.current_year < 2050 && state.resilience() >= 50.0,
            Self::EcoWarrior => state.achievements.eco_streak >= ECO_STREAK_TURNS,
            Self::CoastalGuardian => state
                .board
                .iter()
                .filter(|(_, cell)| cell.kind == CellKind::Coast)
                .all(|(_, cell)| cell.is_protected()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementLedger {
    pub unlocked:   Vec<AchievementId>,
    pub eco_streak: u32,
}

impl AchievementLedger {
    pub fn has(&self, id: AchievementId) -> bool {
        self.unlocked.contains(&id)
    }
}

/// Update the eco streak, then unlock and reward anything newly reached.
/// Called once per turn, after events and income.
pub fn evaluate(state: &mut GameState) -> Vec<AchievementId> {
    if state.environment() >= ECO_STREAK_LEVEL {
        state.achievements.eco_streak += 1;
    } else {
        state.achievements.eco_streak = 0;
    }

    let mut unlocked = Vec::new();
    for id in AchievementId::ALL {
        if state.achievements.has(id) || !id.reached(state) {
            continue;
        }
        for &(resource, amount) in id.reward() {
            state.resources.adjust(resource, amount);
        }
        state.achievements.unlocked.push(id);
        log::info!("achievement unlocked: {}", id.title());
        unlocked.push(id);
    }
    unlocked
}
