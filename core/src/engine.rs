//! The turn engine. Drives one `GameState` forward a turn at a time.
//!
//! EXECUTION ORDER (fixed, never reordered):
//!   1. Turn-cap check
//!   2. Clock: turn + 1, year + years_per_turn
//!   3. Catalog rules, in catalog order
//!   4. Per-turn income
//!   5. External event draw
//!   6. Achievements
//!   7. End conditions
//!
//! RULES:
//!   - A failing rule is skipped and recorded; the turn carries on.
//!   - All randomness flows through the injected `RandomSource`.
//!   - The engine returns what happened. It never presents anything.

use crate::{
    achievement,
    catalog::{self, contain, RuleContext, RuleFiring, EXTERNAL_EVENT_RULE},
    config::{FloodConfig, GameConfig},
    end_condition::{self, GameOutcome},
    error::{GameError, GameResult},
    event::{TurnEvent, TurnOutcome, TurnStatus},
    rng::{GameRng, RandomSource, TURN_STREAM},
    state::{CellKind, GameState},
    types::Resource,
};

pub struct TurnEngine {
    config: GameConfig,
    rng:    Box<dyn RandomSource>,
}

impl TurnEngine {
    pub fn new(config: GameConfig, seed: u64) -> Self {
        let rng = GameRng::new(seed, TURN_STREAM).with_name("turn");
        Self::with_rng(config, Box::new(rng))
    }

    /// Use a caller-supplied random source. Tests pin outcomes this way.
    pub fn with_rng(config: GameConfig, rng: Box<dyn RandomSource>) -> Self {
        Self { config, rng }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Swap in a new config, e.g. for a different difficulty. The random
    /// stream carries on.
    pub fn reconfigure(&mut self, config: GameConfig) {
        self.config = config;
    }

    /// Advance one turn. A game that is already over is left untouched
    /// and reported as a no-op.
    pub fn advance_turn(&mut self, state: &mut GameState) -> GameResult<TurnOutcome> {
        if state.game_over {
            return Ok(TurnOutcome::for_state(state, TurnStatus::NoOp));
        }
        state.check_invariants(&self.config)?;

        let config = &self.config;
        let rng = &mut self.rng;

        if state.turn >= config.max_turns {
            state.game_over = true;
            state.outcome = Some(GameOutcome::TurnLimit);
            let mut outcome = TurnOutcome::for_state(state, TurnStatus::TurnLimitReached);
            outcome.events.push(TurnEvent::TurnLimitReached { turn: state.turn });
            log::info!("turn cap of {} reached in {}", config.max_turns, state.current_year);
            return Ok(outcome);
        }

        let Some(next_year) = state.current_year.checked_add(config.years_per_turn) else {
            return Err(GameError::InvariantViolation(format!(
                "year {} cannot advance by {}",
                state.current_year, config.years_per_turn
            )));
        };
        state.turn += 1;
        state.current_year = next_year;
        let surge = std::mem::take(&mut state.flood_surge);

        let mut outcome = TurnOutcome::for_state(state, TurnStatus::InProgress);
        outcome.events.push(TurnEvent::TurnStarted {
            turn: state.turn,
            year: state.current_year,
        });

        for rule in &config.catalog {
            let result = {
                let ctx = RuleContext::capture(state, config, surge);
                catalog::evaluate(rule, &ctx, rng.as_mut())
            };
            let firing = contain(&rule.id, result, |id, e| outcome.record_failure(id, e.to_string()));
            let Some(firing) = firing.flatten() else {
                continue;
            };
            outcome.events.push(TurnEvent::RuleFired {
                rule_id:  rule.id.clone(),
                severity: rule.severity,
                tag:      firing.tag,
            });
            apply_firing(state, &firing, &config.flood, &mut outcome);
        }

        state.resources.adjust(Resource::Money, config.income_per_turn);
        outcome.events.push(TurnEvent::IncomeApplied { amount: config.income_per_turn });

        let drawn = contain(
            EXTERNAL_EVENT_RULE,
            catalog::draw_external_event(state, &config.external_events, rng.as_mut()),
            |id, e| outcome.record_failure(id, e.to_string()),
        );
        if let Some((report, firing)) = drawn.flatten() {
            outcome.events.push(TurnEvent::ExternalEventDrawn {
                title:     report.title,
                magnitude: report.magnitude,
                tag:       firing.tag,
            });
            apply_firing(state, &firing, &config.flood, &mut outcome);
        }

        if config.achievements_enabled {
            for id in achievement::evaluate(state) {
                outcome.events.push(TurnEvent::AchievementUnlocked { id });
            }
        }

        if let Some(result) = end_condition::evaluate(state, config) {
            state.game_over = true;
            state.outcome = Some(result);
            let score = end_condition::score(state);
            outcome.events.push(TurnEvent::GameEnded { outcome: result, score });
            outcome.status = TurnStatus::Ended(result);
            log::info!("game ended in {}: {} (score {score})", state.current_year, result.name());
        }

        log::debug!(
            "turn {} ({}): tags={:?} failures={} money={:.1} wellbeing={:.1} environment={:.1} resilience={:.1}",
            state.turn,
            state.current_year,
            outcome.tags,
            outcome.failures.len(),
            state.money(),
            state.wellbeing(),
            state.environment(),
            state.resilience(),
        );
        Ok(outcome)
    }

    /// Run up to `n` turns, stopping early once the game ends.
    pub fn run_turns(&mut self, state: &mut GameState, n: u32) -> GameResult<Vec<TurnOutcome>> {
        let mut outcomes = Vec::new();
        for _ in 0..n {
            let outcome = self.advance_turn(state)?;
            let done = outcome.is_no_op() || outcome.is_terminal();
            outcomes.push(outcome);
            if done {
                break;
            }
        }
        Ok(outcomes)
    }
}

fn apply_firing(state: &mut GameState, firing: &RuleFiring, flood: &FloodConfig, outcome: &mut TurnOutcome) {
    for &(resource, delta) in &firing.deltas {
        state.resources.adjust(resource, delta);
    }
    if firing.flood {
        let count = trigger_flood(state, flood);
        if count > 0 {
            outcome.events.push(TurnEvent::CellsFlooded { count });
        }
    }
    state.flood_surge += firing.surge;
    outcome.push_tag(firing.tag);
}

/// Flood every unprotected coast cell that is not already flooded, and
/// charge the per-cell penalty for each one. Returns the newly flooded count.
pub fn trigger_flood(state: &mut GameState, flood: &FloodConfig) -> usize {
    let mut count = 0;
    for cell in state.board.cells_mut() {
        if cell.kind == CellKind::Coast && !cell.flooded && !cell.is_protected() {
            cell.flooded = true;
            count += 1;
        }
    }
    if count > 0 {
        let n = count as f64;
        state.resources.adjust(Resource::Wellbeing, -flood.wellbeing_penalty * n);
        state.resources.adjust(Resource::Money, -flood.money_penalty * n);
        log::debug!("{count} coast cells flooded");
    }
    count
}
