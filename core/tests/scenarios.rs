//! End-to-end scenarios from a fresh game: building, and what building
//! does to the next turn.

use coastal_core::{
    config::GameConfig,
    end_condition::GameOutcome,
    engine::TurnEngine,
    error::PlacementError,
    event::TurnStatus,
    rng::ScriptedRng,
    state::GameState,
    structure::{place_structure, StructureKind},
    types::CellCoord,
};

fn fresh() -> (GameConfig, GameState) {
    let config = GameConfig::default_test();
    let state = GameState::new(&config);
    (config, state)
}

#[test]
fn mangrove_on_the_coast() {
    let (_, mut state) = fresh();
    assert_eq!(
        (state.money(), state.wellbeing(), state.environment(), state.resilience()),
        (100.0, 50.0, 50.0, 20.0)
    );
    assert_eq!((state.current_year, state.turn), (2025, 0));

    let receipt = place_structure(&mut state, StructureKind::Mangrove, CellCoord::new(4, 3))
        .expect("mangrove on unflooded coast");

    assert_eq!(receipt.money_after, 85.0);
    assert_eq!(state.money(), 85.0);
    assert_eq!(state.environment(), 65.0);
    assert_eq!(state.resilience(), 25.0);
}

#[test]
fn industry_wrecks_the_environment_and_loses_the_game() {
    let (config, mut state) = fresh();
    for col in 0..5 {
        place_structure(&mut state, StructureKind::Industrial, CellCoord::new(0, col))
            .expect("industry on land");
    }
    assert_eq!(state.environment(), 0.0);
    assert_eq!(state.money(), 25.0);

    let mut engine = TurnEngine::with_rng(config, Box::new(ScriptedRng::constant(1.0)));
    let outcome = engine.advance_turn(&mut state).expect("turn");

    assert_eq!(outcome.status, TurnStatus::Ended(GameOutcome::Defeat));
    assert!(state.game_over);
    assert_eq!(state.outcome, Some(GameOutcome::Defeat));
}

#[test]
fn protected_city_wins_in_2060() {
    let (config, mut state) = fresh();
    let builds = [
        (StructureKind::Residential, CellCoord::new(0, 0)),
        (StructureKind::Mangrove, CellCoord::new(4, 0)),
        (StructureKind::Mangrove, CellCoord::new(4, 1)),
        (StructureKind::Seawall, CellCoord::new(4, 2)),
        (StructureKind::Seawall, CellCoord::new(4, 3)),
    ];
    for (kind, at) in builds {
        place_structure(&mut state, kind, at).expect("affordable build");
    }
    assert_eq!(
        (state.money(), state.wellbeing(), state.environment(), state.resilience()),
        (0.0, 60.0, 75.0, 50.0)
    );

    let mut engine = TurnEngine::with_rng(config, Box::new(ScriptedRng::constant(1.0)));
    let outcomes = engine.run_turns(&mut state, 20).expect("turns");

    // 2025 + 7 * 5 = 2060
    assert_eq!(outcomes.len(), 7);
    assert!(outcomes[..6].iter().all(|o| o.status == TurnStatus::InProgress));
    assert_eq!(outcomes[6].status, TurnStatus::Ended(GameOutcome::Victory));
    assert_eq!(state.current_year, 2060);
    assert_eq!(state.outcome, Some(GameOutcome::Victory));
}

#[test]
fn coastal_structures_stay_on_the_coast() {
    let (_, mut state) = fresh();
    let result = place_structure(&mut state, StructureKind::Seawall, CellCoord::new(1, 1));
    assert!(matches!(result, Err(PlacementError::RuleViolation { terrain: "land", .. })));
    assert_eq!(state.money(), 100.0);
}

#[test]
fn placement_rejections_leave_state_alone() {
    let (_, mut state) = fresh();
    place_structure(&mut state, StructureKind::Residential, CellCoord::new(2, 2)).expect("house");
    let before = state.clone();

    assert_eq!(
        place_structure(&mut state, StructureKind::Industrial, CellCoord::new(2, 2)),
        Err(PlacementError::Occupied(StructureKind::Residential))
    );
    assert_eq!(
        place_structure(&mut state, StructureKind::Industrial, CellCoord::new(6, 0)),
        Err(PlacementError::OutOfBounds { row: 6, col: 0 })
    );
    assert_eq!(state, before);

    state.resources.set(coastal_core::types::Resource::Money, 10.0);
    assert!(matches!(
        place_structure(&mut state, StructureKind::Seawall, CellCoord::new(4, 0)),
        Err(PlacementError::InsufficientFunds { cost, .. }) if cost == 25.0
    ));
}

#[test]
fn finished_game_refuses_building() {
    let (_, mut state) = fresh();
    state.game_over = true;
    assert_eq!(
        place_structure(&mut state, StructureKind::Residential, CellCoord::new(0, 0)),
        Err(PlacementError::GameOver)
    );
}

#[test]
fn resources_never_leave_their_bounds() {
    let (_, mut state) = fresh();
    use coastal_core::types::Resource;
    for resource in Resource::ALL {
        assert_eq!(state.resources.adjust(resource, 1e9), 100.0);
        assert_eq!(state.resources.adjust(resource, -1e9), 0.0);
        assert_eq!(state.resources.set(resource, f64::INFINITY), 100.0);
        assert_eq!(state.resources.adjust(resource, f64::NAN), 100.0);
        assert_eq!(state.resources.set(resource, -3.0), 0.0);
        // Clamping twice changes nothing.
        let once = state.resources.adjust(resource, 250.0);
        assert_eq!(state.resources.adjust(resource, 0.0), once);
    }
}
