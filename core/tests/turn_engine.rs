//! Turn engine: ordering, terminal states and per-rule failure containment.
//!
//! Every test pins randomness with a ScriptedRng, so the outcome of each
//! draw is known up front.

use coastal_core::{
    catalog::{default_catalog, ClimateEventRule, RuleKind, Severity},
    climate::{ClimateEventReport, EnvironmentalSnapshot, TemperatureReading},
    config::{ExternalEventConfig, GameConfig},
    end_condition::GameOutcome,
    engine::TurnEngine,
    error::GameError,
    event::{OutcomeTag, TurnEvent, TurnStatus},
    rng::ScriptedRng,
    state::GameState,
    types::Resource,
};

fn engine(config: GameConfig, rng: ScriptedRng) -> TurnEngine {
    TurnEngine::with_rng(config, Box::new(rng))
}

fn rule(id: &str, kind: RuleKind) -> ClimateEventRule {
    ClimateEventRule { id: id.into(), severity: Severity::Medium, kind }
}

fn catalog_rule(id: &str) -> ClimateEventRule {
    default_catalog()
        .into_iter()
        .find(|r| r.id == id)
        .expect("rule in default catalog")
}

#[test]
fn quiet_turn_advances_clock_and_pays_income() {
    let config = GameConfig::default_test();
    let mut state = GameState::new(&config);
    state.resources.set(Resource::Money, 40.0);
    let mut engine = engine(config, ScriptedRng::constant(1.0));

    let outcome = engine.advance_turn(&mut state).expect("turn");

    assert_eq!(outcome.status, TurnStatus::InProgress);
    assert!(outcome.tags.is_empty());
    assert_eq!(state.turn, 1);
    assert_eq!(state.current_year, 2030);
    assert_eq!(state.money(), 50.0);
    assert!(matches!(outcome.events.first(), Some(TurnEvent::TurnStarted { turn: 1, year: 2030 })));
}

#[test]
fn game_over_state_is_a_no_op() {
    let config = GameConfig::default_test();
    let mut state = GameState::new(&config);
    state.game_over = true;
    state.outcome = Some(GameOutcome::Defeat);
    let before = state.clone();
    let mut engine = engine(config, ScriptedRng::constant(0.0));

    let outcome = engine.advance_turn(&mut state).expect("turn");

    assert!(outcome.is_no_op());
    assert!(outcome.events.is_empty());
    assert_eq!(state, before);
}

#[test]
fn turn_cap_ends_the_game_without_passing_it() {
    let config = GameConfig { max_turns: 3, ..GameConfig::default_test() };
    let mut state = GameState::new(&config);
    let mut engine = engine(config, ScriptedRng::constant(1.0));

    for expected_turn in 1..=3 {
        let outcome = engine.advance_turn(&mut state).expect("turn");
        assert_eq!(outcome.status, TurnStatus::InProgress);
        assert_eq!(state.turn, expected_turn);
    }

    let outcome = engine.advance_turn(&mut state).expect("turn");
    assert_eq!(outcome.status, TurnStatus::TurnLimitReached);
    assert!(state.game_over);
    assert_eq!(state.outcome, Some(GameOutcome::TurnLimit));
    assert_eq!(state.turn, 3);

    assert!(engine.advance_turn(&mut state).expect("turn").is_no_op());
    assert_eq!(state.turn, 3);
}

#[test]
fn live_game_past_the_cap_is_refused() {
    let config = GameConfig { max_turns: 3, ..GameConfig::default_test() };
    let mut state = GameState::new(&config);
    state.turn = 7;
    let mut engine = engine(config, ScriptedRng::constant(1.0));

    let result = engine.advance_turn(&mut state);
    assert!(matches!(result, Err(GameError::InvariantViolation(_))));
    assert_eq!(state.turn, 7);
}

#[test]
fn year_that_cannot_advance_is_refused() {
    let config = GameConfig::default_test();
    let mut state = GameState::new(&config);
    state.current_year = i32::MAX - 1;
    let mut engine = engine(config, ScriptedRng::constant(1.0));

    let result = engine.advance_turn(&mut state);
    assert!(matches!(result, Err(GameError::InvariantViolation(_))));
    assert_eq!((state.turn, state.current_year), (0, i32::MAX - 1));
}

#[test]
fn heat_wave_waits_for_2040() {
    let config = GameConfig {
        catalog: vec![catalog_rule("heat_wave")],
        ..GameConfig::default_test()
    };

    // Lands in 2035: the roll succeeds but the year gate holds.
    let mut early = GameState::new(&config);
    early.current_year = 2030;
    let outcome = engine(config.clone(), ScriptedRng::constant(0.1))
        .advance_turn(&mut early)
        .expect("turn");
    assert!(!outcome.fired(OutcomeTag::HeatWave));
    assert_eq!((early.money(), early.wellbeing()), (100.0, 50.0));

    let mut late = GameState::new(&config);
    late.current_year = 2035;
    late.resources.set(Resource::Money, 50.0);
    let outcome = engine(config, ScriptedRng::constant(0.1))
        .advance_turn(&mut late)
        .expect("turn");
    assert_eq!(late.current_year, 2040);
    assert!(outcome.fired(OutcomeTag::HeatWave));
    assert_eq!((late.money(), late.wellbeing()), (52.0, 45.0));
}

#[test]
fn storm_damages_a_weak_city_after_turn_two() {
    let config = GameConfig {
        catalog: vec![catalog_rule("intense_storm")],
        ..GameConfig::default_test()
    };
    let mut state = GameState::new(&config);
    state.turn = 2;
    state.resources.set(Resource::Money, 50.0);
    let mut engine = engine(config, ScriptedRng::new([0.1], 1.0));

    let outcome = engine.advance_turn(&mut state).expect("turn");

    assert!(outcome.fired(OutcomeTag::StormDamage));
    assert_eq!(state.wellbeing(), 40.0);
    assert_eq!(state.money(), 55.0);
}

#[test]
fn storm_is_absorbed_by_a_resilient_city() {
    let config = GameConfig {
        catalog: vec![catalog_rule("intense_storm")],
        ..GameConfig::default_test()
    };
    let mut state = GameState::new(&config);
    state.turn = 2;
    state.resources.set(Resource::Resilience, 30.0);
    let mut engine = engine(config, ScriptedRng::new([0.1], 1.0));

    let outcome = engine.advance_turn(&mut state).expect("turn");

    assert!(outcome.tags.is_empty());
    assert!(outcome
        .events
        .iter()
        .any(|e| matches!(e, TurnEvent::RuleFired { rule_id, tag: None, .. } if rule_id == "intense_storm")));
    assert_eq!(state.wellbeing(), 50.0);
}

#[test]
fn failing_rules_are_skipped_and_the_turn_carries_on() {
    let config = GameConfig {
        catalog: vec![
            rule(
                "broken_storm",
                RuleKind::Storm {
                    probability:       1.5,
                    after_turn:        0,
                    resilience_below:  100.0,
                    wellbeing_penalty: 10.0,
                    money_penalty:     10.0,
                },
            ),
            catalog_rule("extreme_heat"),
            rule(
                "awareness",
                RuleKind::Awareness {
                    probability:       0.15,
                    environment_above: 40.0,
                    wellbeing_bonus:   10.0,
                    money_bonus:       5.0,
                },
            ),
        ],
        ..GameConfig::default_test()
    };
    let mut state = GameState::new(&config);
    state.resources.set(Resource::Money, 50.0);
    state.environmental_snapshot = Some(EnvironmentalSnapshot {
        temperature: Some(TemperatureReading { anomaly: f64::NAN, trend: 0.0 }),
        ..EnvironmentalSnapshot::default()
    });
    let mut engine = engine(config, ScriptedRng::constant(0.0));

    let outcome = engine.advance_turn(&mut state).expect("a failing rule must not abort the turn");

    let failed: Vec<&str> = outcome.failures.iter().map(|f| f.rule_id.as_str()).collect();
    assert_eq!(failed, ["broken_storm", "extreme_heat"]);
    assert_eq!(outcome.tags, [OutcomeTag::PositiveEvent]);
    assert_eq!(state.wellbeing(), 60.0);
    assert_eq!(state.money(), 65.0);
    assert_eq!(outcome.status, TurnStatus::InProgress);
}

#[test]
fn sea_level_spike_raises_next_turns_flood_risk() {
    let config = GameConfig {
        catalog: vec![catalog_rule("sea_level_rise"), catalog_rule("sea_level_spike")],
        ..GameConfig::default_test()
    };
    let mut state = GameState::new(&config);
    state.turn = 4;
    state.current_year = 2035;
    state.resources.set(Resource::Resilience, 5.0);
    // Flood chance on turn 6 is 0.1 - 0.05 = 0.05 alone, 0.15 with the surge.
    let mut engine = engine(config, ScriptedRng::constant(0.12));

    let outcome = engine.advance_turn(&mut state).expect("turn 5");
    assert!(outcome.fired(OutcomeTag::SeaLevelSpike));
    assert!((state.flood_surge - 0.1).abs() < 1e-12);

    let mut without_surge = state.clone();
    without_surge.flood_surge = 0.0;

    let outcome = engine.advance_turn(&mut state).expect("turn 6");
    assert!(outcome.fired(OutcomeTag::Flood));
    assert_eq!(state.flood_surge, 0.0);

    let outcome = engine.advance_turn(&mut without_surge).expect("turn 6, no surge");
    assert!(!outcome.fired(OutcomeTag::Flood));
}

#[test]
fn flood_rule_can_end_the_game() {
    let config = GameConfig {
        catalog: vec![catalog_rule("sea_level_rise")],
        ..GameConfig::default_test()
    };
    let mut state = GameState::new(&config);
    state.turn = 2;
    state.resources.set(Resource::Resilience, 0.0);
    let mut engine = engine(config, ScriptedRng::new([0.05], 1.0));

    let outcome = engine.advance_turn(&mut state).expect("turn");

    assert!(outcome.fired(OutcomeTag::Flood));
    assert!(outcome.events.contains(&TurnEvent::CellsFlooded { count: 12 }));
    assert_eq!(state.wellbeing(), 0.0);
    assert_eq!(outcome.status, TurnStatus::Ended(GameOutcome::Defeat));
    assert_eq!(state.outcome, Some(GameOutcome::Defeat));
}

fn event(magnitude: f64) -> ClimateEventReport {
    ClimateEventReport {
        title:     "Coastal storm surge".into(),
        kind:      "Severe Storms".into(),
        magnitude,
        date:      chrono::Utc::now(),
    }
}

fn external_config() -> GameConfig {
    GameConfig {
        external_events: ExternalEventConfig {
            probability: 1.0,
            ..ExternalEventConfig::default()
        },
        ..GameConfig::default_test()
    }
}

#[test]
fn external_event_penalty_scales_with_magnitude() {
    let config = external_config();
    let mut state = GameState::new(&config);
    state.environmental_snapshot = Some(EnvironmentalSnapshot {
        recent_events: vec![event(0.5)],
        ..EnvironmentalSnapshot::default()
    });
    let mut engine = engine(config, ScriptedRng::constant(0.0));

    let outcome = engine.advance_turn(&mut state).expect("turn");

    assert!(outcome.fired(OutcomeTag::ExternalEventImpact));
    assert_eq!(state.wellbeing(), 42.5);
    assert_eq!(state.money(), 95.0);
}

#[test]
fn malformed_external_event_is_contained() {
    let config = external_config();
    let mut state = GameState::new(&config);
    state.resources.set(Resource::Money, 40.0);
    state.environmental_snapshot = Some(EnvironmentalSnapshot {
        recent_events: vec![event(1.5)],
        ..EnvironmentalSnapshot::default()
    });
    let mut engine = engine(config, ScriptedRng::constant(0.0));

    let outcome = engine.advance_turn(&mut state).expect("turn");

    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].rule_id, "external_event");
    assert_eq!(state.wellbeing(), 50.0);
    assert_eq!(state.money(), 50.0);
}

#[test]
fn achievement_reward_is_paid_once() {
    let config = GameConfig { achievements_enabled: true, ..GameConfig::default_test() };
    let mut state = GameState::new(&config);
    state.resources.set(Resource::Resilience, 50.0);
    state.resources.set(Resource::Money, 20.0);
    let mut engine = engine(config, ScriptedRng::constant(1.0));

    let first = engine.advance_turn(&mut state).expect("turn");
    assert!(first.events.iter().any(|e| matches!(e, TurnEvent::AchievementUnlocked { .. })));
    assert_eq!(state.money(), 80.0);
    assert_eq!(state.wellbeing(), 60.0);

    let second = engine.advance_turn(&mut state).expect("turn");
    assert!(!second.events.iter().any(|e| matches!(e, TurnEvent::AchievementUnlocked { .. })));
    assert_eq!(state.money(), 90.0);
}

#[test]
fn horizon_without_enough_score_is_a_timeout() {
    let config = GameConfig::default_test();
    let mut state = GameState::new(&config);
    let mut engine = engine(config, ScriptedRng::constant(1.0));

    let outcomes = engine.run_turns(&mut state, 50).expect("turns");

    // 2025 + 15 * 5 = 2100
    assert_eq!(outcomes.len(), 15);
    assert_eq!(state.current_year, 2100);
    assert_eq!(outcomes.last().map(|o| o.status), Some(TurnStatus::Ended(GameOutcome::Timeout)));
}
