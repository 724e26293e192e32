use crate::{
    catalog::{default_catalog, ClimateEventRule},
    types::{Turn, Year},
};
use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialConditions {
    pub money:       f64,
    pub wellbeing:   f64,
    pub environment: f64,
    pub resilience:  f64,
    pub year:        Year,
}

impl Default for InitialConditions {
    fn default() -> Self {
        Self {
            money:       100.0,
            wellbeing:   50.0,
            environment: 50.0,
            resilience:  20.0,
            year:        2025,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FloodConfig {
    /// Base chance that a sea-level rise floods the coast.
    pub risk_base:         f64,
    /// Charged per newly flooded cell.
    pub wellbeing_penalty: f64,
    pub money_penalty:     f64,
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            risk_base:         0.1,
            wellbeing_penalty: 5.0,
            money_penalty:     5.0,
        }
    }
}

/// Drawing one real-world event from the snapshot's recent-events list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalEventConfig {
    /// Chance per turn of drawing an event.
    pub probability:          f64,
    /// Penalties apply only while resilience is below this.
    pub resilience_threshold: f64,
    /// Penalties at magnitude 1.0; scaled linearly by magnitude.
    pub wellbeing_penalty:    f64,
    pub money_penalty:        f64,
    /// How many events a refresh asks the provider for.
    pub fetch_limit:          usize,
}

impl Default for ExternalEventConfig {
    fn default() -> Self {
        Self {
            probability:          0.1,
            resilience_threshold: 40.0,
            wellbeing_penalty:    15.0,
            money_penalty:        10.0,
            fetch_limit:          3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VictoryConditions {
    pub min_year:        Year,
    pub min_wellbeing:   f64,
    pub min_resilience:  f64,
    pub min_environment: f64,
}

impl Default for VictoryConditions {
    fn default() -> Self {
        Self {
            min_year:        2060,
            min_wellbeing:   60.0,
            min_resilience:  50.0,
            min_environment: 40.0,
        }
    }
}

/// A resource at or below its floor loses the game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefeatConditions {
    pub min_wellbeing:   f64,
    pub min_money:       f64,
    pub min_environment: f64,
}

impl Default for DefeatConditions {
    fn default() -> Self {
        Self {
            min_wellbeing:   0.0,
            min_money:       0.0,
            min_environment: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConditions {
    /// Absolute horizon, independent of the turn cap.
    pub horizon_year:  Year,
    /// Reaching the horizon with at least this score counts as victory.
    pub victory_score: u32,
}

impl Default for TimeoutConditions {
    fn default() -> Self {
        Self {
            horizon_year:  2100,
            victory_score: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Records with any other version are rejected on load, never migrated.
    pub version:       String,
    /// Session history keeps this many of the most recent entries.
    pub stats_history: usize,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            version:       SAVE_FORMAT_VERSION.into(),
            stats_history: 20,
        }
    }
}

pub const SAVE_FORMAT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub initial:                 InitialConditions,
    pub years_per_turn:          Year,
    /// Turn-count cap; reaching it ends the game with TurnLimitReached.
    pub max_turns:               Turn,
    pub income_per_turn:         f64,
    /// Metres of sea-level rise per turn, reported in the advisory summary.
    pub sea_level_rise_per_turn: f64,
    pub flood:                   FloodConfig,
    pub external_events:         ExternalEventConfig,
    pub victory:                 VictoryConditions,
    pub defeat:                  DefeatConditions,
    pub timeout:                 TimeoutConditions,
    pub achievements_enabled:    bool,
    pub save:                    SaveConfig,
    /// Evaluated in this order every turn.
    pub catalog:                 Vec<ClimateEventRule>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            initial:                 InitialConditions::default(),
            years_per_turn:          5,
            max_turns:               100,
            income_per_turn:         10.0,
            sea_level_rise_per_turn: 0.05,
            flood:                   FloodConfig::default(),
            external_events:         ExternalEventConfig::default(),
            victory:                 VictoryConditions::default(),
            defeat:                  DefeatConditions::default(),
            timeout:                 TimeoutConditions::default(),
            achievements_enabled:    true,
            save:                    SaveConfig::default(),
            catalog:                 default_catalog(),
        }
    }
}

impl GameConfig {
    /// Load from a JSON file. Missing keys fall back to the reference data.
    /// In tests, use GameConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {path}"))?;
        let config: GameConfig = serde_json::from_str(&content)
            .with_context(|| format!("Cannot parse {path}"))?;
        log::info!(
            "loaded config from {path}: {} rules, max_turns={}",
            config.catalog.len(),
            config.max_turns
        );
        Ok(config)
    }

    /// Reference data with every source of chance switched off: no catalog
    /// rules, no external event draws, no achievements. Turns only add income.
    pub fn default_test() -> Self {
        Self {
            catalog: Vec::new(),
            external_events: ExternalEventConfig {
                probability: 0.0,
                ..ExternalEventConfig::default()
            },
            achievements_enabled: false,
            ..Self::default()
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        let preset = difficulty.preset();
        self.initial.money = preset.initial_money;
        self.sea_level_rise_per_turn = preset.sea_level_rise_per_turn;
        self.flood.risk_base = preset.flood_risk_base;
        self
    }

    /// Realistic difficulty tracks the observed trend (mm/yr) instead of
    /// the preset rise.
    pub fn calibrate_sea_level(&mut self, trend_mm_per_year: f64) {
        if trend_mm_per_year.is_finite() && trend_mm_per_year > 0.0 {
            self.sea_level_rise_per_turn = trend_mm_per_year / 1000.0;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Realistic,
}

#[derive(Debug, Clone, Copy)]
pub struct DifficultyPreset {
    pub initial_money:           f64,
    pub sea_level_rise_per_turn: f64,
    pub flood_risk_base:         f64,
}

impl Difficulty {
    pub fn preset(&self) -> DifficultyPreset {
        match self {
            Self::Easy      => DifficultyPreset { initial_money: 150.0, sea_level_rise_per_turn: 0.03, flood_risk_base: 0.05 },
            Self::Normal    => DifficultyPreset { initial_money: 100.0, sea_level_rise_per_turn: 0.05, flood_risk_base: 0.10 },
            Self::Hard      => DifficultyPreset { initial_money:  70.0, sea_level_rise_per_turn: 0.08, flood_risk_base: 0.15 },
            Self::Realistic => DifficultyPreset { initial_money:  50.0, sea_level_rise_per_turn: 0.05, flood_risk_base: 0.20 },
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "easy"      => Some(Self::Easy),
            "normal"    => Some(Self::Normal),
            "hard"      => Some(Self::Hard),
            "realistic" => Some(Self::Realistic),
            _ => None,
        }
    }
}
