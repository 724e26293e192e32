//! The climate event catalog and its interpreter.
//!
//! Rules are data: a rule kind plus its parameters. `evaluate` is the one
//! place that knows what each kind means. A rule never touches the state
//! directly; it returns a `RuleFiring` describing the deltas to apply, so
//! a rule that fails halfway has applied nothing.
//!
//! Rules are independent. Every rule whose condition holds fires, in
//! catalog order, with no priority or exclusivity between them.

use crate::{
    climate::ClimateEventReport,
    config::{ExternalEventConfig, GameConfig},
    error::RuleError,
    event::OutcomeTag,
    rng::RandomSource,
    state::GameState,
    types::{Resource, Turn, Year},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
    Low,
    Positive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateEventRule {
    pub id:       String,
    pub severity: Severity,
    #[serde(flatten)]
    pub kind:     RuleKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    /// From `min_year`, every `every_turns` turns, the coast may flood with
    /// chance `flood.risk_base + flood_surge - resilience * resilience_factor`.
    SeaLevelRise {
        min_year:          Year,
        every_turns:       Turn,
        resilience_factor: f64,
    },
    /// Random storm after `after_turn`; damages only a weakly defended city.
    Storm {
        probability:       f64,
        after_turn:        Turn,
        resilience_below:  f64,
        wellbeing_penalty: f64,
        money_penalty:     f64,
    },
    /// Random heat wave from `min_year`.
    HeatWave {
        probability:       f64,
        min_year:          Year,
        money_penalty:     f64,
        wellbeing_penalty: f64,
    },
    /// Random public support while the environment is healthy.
    Awareness {
        probability:       f64,
        environment_above: f64,
        wellbeing_bonus:   f64,
        money_bonus:       f64,
    },
    /// Driven by the observed temperature anomaly. Silent without data.
    ExtremeHeat {
        probability:       f64,
        anomaly_above:     f64,
        wellbeing_penalty: f64,
        money_penalty:     f64,
    },
    /// From `min_year`, every `every_turns` turns, raises next turn's flood risk.
    SeaLevelSpike {
        min_year:    Year,
        every_turns: Turn,
        surge:       f64,
    },
}

/// What a rule wants done. Applied by the engine after evaluation succeeds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleFiring {
    pub tag:    Option<OutcomeTag>,
    pub deltas: Vec<(Resource, f64)>,
    /// Run a coastal flood.
    pub flood:  bool,
    /// Added to next turn's flood risk.
    pub surge:  f64,
}

impl RuleFiring {
    fn quiet() -> Self {
        Self::default()
    }

    fn tagged(tag: OutcomeTag, deltas: Vec<(Resource, f64)>) -> Self {
        Self { tag: Some(tag), deltas, ..Self::default() }
    }
}

/// Read-only view of the state a rule condition may look at.
pub struct RuleContext<'a> {
    pub year:        Year,
    pub turn:        Turn,
    pub resilience:  f64,
    pub environment: f64,
    pub flood_risk:  f64,
    pub state:       &'a GameState,
}

impl<'a> RuleContext<'a> {
    /// `flood_surge` is the surge carried into this turn.
    pub fn capture(state: &'a GameState, config: &GameConfig, flood_surge: f64) -> Self {
        Self {
            year:        state.current_year,
            turn:        state.turn,
            resilience:  state.resilience(),
            environment: state.environment(),
            flood_risk:  config.flood.risk_base + flood_surge,
            state,
        }
    }
}

fn probability(rule: &str, p: f64) -> Result<f64, RuleError> {
    if p.is_finite() && (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(RuleError::InvalidProbability { rule: rule.to_string(), value: p })
    }
}

fn on_cadence(turn: Turn, every: Turn) -> bool {
    every != 0 && turn % every == 0
}

/// Evaluate one rule. `Ok(None)` means the condition did not hold;
/// `Ok(Some(_))` means it fired, possibly with no effect.
pub fn evaluate(
    rule: &ClimateEventRule,
    ctx:  &RuleContext<'_>,
    rng:  &mut dyn RandomSource,
) -> Result<Option<RuleFiring>, RuleError> {
    let id = rule.id.as_str();
    match &rule.kind {
        RuleKind::SeaLevelRise { min_year, every_turns, resilience_factor } => {
            if !(ctx.year >= *min_year && on_cadence(ctx.turn, *every_turns)) {
                return Ok(None);
            }
            let chance = ctx.flood_risk - ctx.resilience * resilience_factor;
            if !chance.is_finite() {
                return Err(RuleError::MalformedData {
                    rule:   id.to_string(),
                    field:  "flood chance",
                    detail: format!("{chance}"),
                });
            }
            if rng.next_f64() < chance {
                Ok(Some(RuleFiring { tag: Some(OutcomeTag::Flood), flood: true, ..RuleFiring::default() }))
            } else {
                Ok(Some(RuleFiring::quiet()))
            }
        }

        RuleKind::Storm { probability: p, after_turn, resilience_below, wellbeing_penalty, money_penalty } => {
            let p = probability(id, *p)?;
            if !(rng.chance(p) && ctx.turn > *after_turn) {
                return Ok(None);
            }
            if ctx.resilience < *resilience_below {
                Ok(Some(RuleFiring::tagged(
                    OutcomeTag::StormDamage,
                    vec![(Resource::Wellbeing, -wellbeing_penalty), (Resource::Money, -money_penalty)],
                )))
            } else {
                Ok(Some(RuleFiring::quiet()))
            }
        }

        RuleKind::HeatWave { probability: p, min_year, money_penalty, wellbeing_penalty } => {
            let p = probability(id, *p)?;
            if !(rng.chance(p) && ctx.year >= *min_year) {
                return Ok(None);
            }
            Ok(Some(RuleFiring::tagged(
                OutcomeTag::HeatWave,
                vec![(Resource::Money, -money_penalty), (Resource::Wellbeing, -wellbeing_penalty)],
            )))
        }

        RuleKind::Awareness { probability: p, environment_above, wellbeing_bonus, money_bonus } => {
            let p = probability(id, *p)?;
            if !(rng.chance(p) && ctx.environment > *environment_above) {
                return Ok(None);
            }
            Ok(Some(RuleFiring::tagged(
                OutcomeTag::PositiveEvent,
                vec![(Resource::Wellbeing, *wellbeing_bonus), (Resource::Money, *money_bonus)],
            )))
        }

        RuleKind::ExtremeHeat { probability: p, anomaly_above, wellbeing_penalty, money_penalty } => {
            let p = probability(id, *p)?;
            let Some(reading) = ctx
                .state
                .environmental_snapshot
                .as_ref()
                .and_then(|s| s.temperature.as_ref())
            else {
                return Ok(None);
            };
            if !reading.anomaly.is_finite() {
                return Err(RuleError::MalformedData {
                    rule:   id.to_string(),
                    field:  "temperature anomaly",
                    detail: format!("{}", reading.anomaly),
                });
            }
            if !(reading.anomaly > *anomaly_above && rng.chance(p)) {
                return Ok(None);
            }
            Ok(Some(RuleFiring::tagged(
                OutcomeTag::ExtremeHeat,
                vec![(Resource::Wellbeing, -wellbeing_penalty), (Resource::Money, -money_penalty)],
            )))
        }

        RuleKind::SeaLevelSpike { min_year, every_turns, surge } => {
            if !(ctx.year >= *min_year && on_cadence(ctx.turn, *every_turns)) {
                return Ok(None);
            }
            if !surge.is_finite() {
                return Err(RuleError::MalformedData {
                    rule:   id.to_string(),
                    field:  "surge",
                    detail: format!("{surge}"),
                });
            }
            Ok(Some(RuleFiring {
                tag: Some(OutcomeTag::SeaLevelSpike),
                surge: *surge,
                ..RuleFiring::default()
            }))
        }
    }
}

/// Rule id reported when the external event draw fails.
pub const EXTERNAL_EVENT_RULE: &str = "external_event";

/// Maybe draw one reported event and charge a magnitude-scaled penalty
/// if resilience is below the threshold.
pub fn draw_external_event(
    state:  &GameState,
    config: &ExternalEventConfig,
    rng:    &mut dyn RandomSource,
) -> Result<Option<(ClimateEventReport, RuleFiring)>, RuleError> {
    let p = probability(EXTERNAL_EVENT_RULE, config.probability)?;
    if !rng.chance(p) {
        return Ok(None);
    }
    let events = match state.environmental_snapshot.as_ref() {
        Some(s) if !s.recent_events.is_empty() => &s.recent_events,
        _ => return Ok(None),
    };
    let report = &events[rng.next_below(events.len())];
    let magnitude = report.magnitude;
    if !(magnitude.is_finite() && (0.0..=1.0).contains(&magnitude)) {
        return Err(RuleError::MalformedData {
            rule:   EXTERNAL_EVENT_RULE.to_string(),
            field:  "event magnitude",
            detail: format!("'{}' reported {magnitude}", report.title),
        });
    }
    let firing = if state.resilience() < config.resilience_threshold {
        RuleFiring::tagged(
            OutcomeTag::ExternalEventImpact,
            vec![
                (Resource::Wellbeing, -config.wellbeing_penalty * magnitude),
                (Resource::Money, -config.money_penalty * magnitude),
            ],
        )
    } else {
        RuleFiring::quiet()
    };
    Ok(Some((report.clone(), firing)))
}

/// The reference catalog, in evaluation order.
pub fn default_catalog() -> Vec<ClimateEventRule> {
    vec![
        ClimateEventRule {
            id:       "sea_level_rise".into(),
            severity: Severity::High,
            kind:     RuleKind::SeaLevelRise { min_year: 2030, every_turns: 3, resilience_factor: 0.01 },
        },
        ClimateEventRule {
            id:       "intense_storm".into(),
            severity: Severity::Medium,
            kind:     RuleKind::Storm {
                probability:       0.3,
                after_turn:        2,
                resilience_below:  30.0,
                wellbeing_penalty: 10.0,
                money_penalty:     5.0,
            },
        },
        ClimateEventRule {
            id:       "heat_wave".into(),
            severity: Severity::Low,
            kind:     RuleKind::HeatWave {
                probability:       0.2,
                min_year:          2040,
                money_penalty:     8.0,
                wellbeing_penalty: 5.0,
            },
        },
        ClimateEventRule {
            id:       "environmental_awareness".into(),
            severity: Severity::Positive,
            kind:     RuleKind::Awareness {
                probability:       0.15,
                environment_above: 60.0,
                wellbeing_bonus:   10.0,
                money_bonus:       5.0,
            },
        },
        ClimateEventRule {
            id:       "extreme_heat".into(),
            severity: Severity::High,
            kind:     RuleKind::ExtremeHeat {
                probability:       0.4,
                anomaly_above:     1.2,
                wellbeing_penalty: 15.0,
                money_penalty:     10.0,
            },
        },
        ClimateEventRule {
            id:       "sea_level_spike".into(),
            severity: Severity::Medium,
            kind:     RuleKind::SeaLevelSpike { min_year: 2040, every_turns: 5, surge: 0.1 },
        },
    ]
}

/// Run `step` and keep its value; on failure, log it, hand the error to
/// `on_failure` and carry on. Nothing escapes.
pub fn contain<T>(
    rule_id:    &str,
    step:       Result<T, RuleError>,
    on_failure: impl FnOnce(&str, RuleError),
) -> Option<T> {
    match step {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("rule '{rule_id}' failed, skipping it this turn: {e}");
            on_failure(rule_id, e);
            None
        }
    }
}
