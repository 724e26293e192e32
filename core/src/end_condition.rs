//! Win/loss determination. Pure functions of the state.

use crate::{config::GameConfig, state::GameState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    Victory,
    Defeat,
    Timeout,
    /// The turn-count cap was hit before any other condition.
    TurnLimit,
}

impl GameOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Victory   => "victory",
            Self::Defeat    => "defeat",
            Self::Timeout   => "timeout",
            Self::TurnLimit => "turn_limit",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "victory"    => Some(Self::Victory),
            "defeat"     => Some(Self::Defeat),
            "timeout"    => Some(Self::Timeout),
            "turn_limit" => Some(Self::TurnLimit),
            _ => None,
        }
    }
}

/// `wellbeing + money/10 + environment + resilience`, rounded, floored at 0.
pub fn score(state: &GameState) -> u32 {
    let raw = state.wellbeing() + state.money() / 10.0 + state.environment() + state.resilience();
    if raw.is_finite() && raw > 0.0 {
        raw.round() as u32
    } else {
        0
    }
}

/// The terminal outcome the state has reached, if any.
/// When several hold, defeat beats victory and victory beats timeout.
pub fn evaluate(state: &GameState, config: &GameConfig) -> Option<GameOutcome> {
    let defeat = &config.defeat;
    if state.wellbeing() <= defeat.min_wellbeing
        || state.money() <= defeat.min_money
        || state.environment() <= defeat.min_environment
    {
        return Some(GameOutcome::Defeat);
    }

    let victory = &config.victory;
    if state.current_year >= victory.min_year
        && state.wellbeing() >= victory.min_wellbeing
        && state.resilience() >= victory.min_resilience
        && state.environment() >= victory.min_environment
    {
        return Some(GameOutcome::Victory);
    }

    if state.current_year >= config.timeout.horizon_year {
        return Some(if score(state) >= config.timeout.victory_score {
            GameOutcome::Victory
        } else {
            GameOutcome::Timeout
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Resource;

    fn state_with(money: f64, wellbeing: f64, environment: f64, resilience: f64, year: i32) -> GameState {
        let mut state = GameState::new(&GameConfig::default_test());
        state.resources.set(Resource::Money, money);
        state.resources.set(Resource::Wellbeing, wellbeing);
        state.resources.set(Resource::Environment, environment);
        state.resources.set(Resource::Resilience, resilience);
        state.current_year = year;
        state
    }

    #[test]
    fn defeat_beats_victory() {
        let config = GameConfig::default_test();
        // Victory thresholds all met, but money is gone.
        let state = state_with(0.0, 90.0, 90.0, 90.0, 2070);
        assert_eq!(evaluate(&state, &config), Some(GameOutcome::Defeat));
    }

    #[test]
    fn victory_needs_every_threshold() {
        let config = GameConfig::default_test();
        let exact = state_with(50.0, 60.0, 40.0, 50.0, 2060);
        assert_eq!(evaluate(&exact, &config), Some(GameOutcome::Victory));

        assert_eq!(evaluate(&state_with(50.0, 59.0, 40.0, 50.0, 2060), &config), None);
        assert_eq!(evaluate(&state_with(50.0, 60.0, 39.0, 50.0, 2060), &config), None);
        assert_eq!(evaluate(&state_with(50.0, 60.0, 40.0, 49.0, 2060), &config), None);
        assert_eq!(evaluate(&state_with(50.0, 60.0, 40.0, 50.0, 2059), &config), None);
    }

    #[test]
    fn victory_beats_timeout_at_the_horizon() {
        let config = GameConfig::default_test();
        // Score 151 would be a timeout on its own.
        let state = state_with(10.0, 60.0, 40.0, 50.0, 2100);
        assert!(score(&state) < config.timeout.victory_score);
        assert_eq!(evaluate(&state, &config), Some(GameOutcome::Victory));
    }

    #[test]
    fn horizon_with_high_score_is_victory() {
        let config = GameConfig::default_test();
        // Fails the wellbeing threshold so only the horizon applies.
        let high = state_with(100.0, 55.0, 100.0, 45.0, 2100);
        assert_eq!(score(&high), 210);
        assert_eq!(evaluate(&high, &config), Some(GameOutcome::Victory));

        let low = state_with(10.0, 20.0, 20.0, 20.0, 2100);
        assert_eq!(evaluate(&low, &config), Some(GameOutcome::Timeout));
    }

    #[test]
    fn mid_game_is_undecided() {
        let config = GameConfig::default_test();
        let state = GameState::new(&config);
        assert_eq!(evaluate(&state, &config), None);
        assert_eq!(score(&state), 50 + 10 + 50 + 20);
    }
}
