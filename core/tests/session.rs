//! GameSession: checkpoint saves, session records and command handling.

use coastal_core::{
    command::PlayerCommand,
    config::{Difficulty, GameConfig},
    end_condition::GameOutcome,
    rng::ScriptedRng,
    session::{CommandResult, GameSession},
    stats::SessionOutcome,
    store::SqliteStore,
    structure::StructureKind,
    types::CellCoord,
};

fn store() -> SqliteStore {
    let store = SqliteStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn session(config: GameConfig) -> GameSession<SqliteStore> {
    GameSession::with_rng(config, Box::new(ScriptedRng::constant(1.0)), store())
}

#[test]
fn each_turn_leaves_a_checkpoint() {
    let mut session = session(GameConfig::default_test());
    session.advance_turn().expect("turn");

    let saved = session.saves_mut().load().expect("checkpoint");
    assert_eq!(&saved, session.state());
    assert_eq!(saved.turn, 1);
}

#[test]
fn finished_game_is_recorded_once() {
    let mut session = session(GameConfig { max_turns: 1, ..GameConfig::default_test() });
    session.advance_turn().expect("turn 1");
    let last = session.advance_turn().expect("cap");
    assert!(last.is_terminal());
    assert!(session.advance_turn().expect("no-op").is_no_op());

    let sessions = session.saves().load_stats().sessions;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].outcome, SessionOutcome::TurnLimit);
    assert_eq!(session.state().outcome, Some(GameOutcome::TurnLimit));
}

#[test]
fn selecting_then_building() {
    let mut session = session(GameConfig::default_test());
    assert!(!session.select_cell(9, 9));
    assert!(session.select_cell(5, 2));

    let receipt = session.place_selected(StructureKind::Seawall).expect("seawall");
    assert_eq!(receipt.at, CellCoord::new(5, 2));
    assert_eq!(session.state().selected_cell, None);
    assert!(session.place_selected(StructureKind::Seawall).is_err());
}

#[test]
fn commands_drive_the_session() {
    let mut session = session(GameConfig::default_test());

    let built = session
        .apply(PlayerCommand::Build { structure: StructureKind::Mangrove, row: Some(4), col: Some(0) })
        .expect("build");
    assert!(matches!(built, CommandResult::Built { .. }));

    let rejected = session
        .apply(PlayerCommand::Build { structure: StructureKind::Mangrove, row: Some(0), col: Some(0) })
        .expect("build");
    assert!(matches!(rejected, CommandResult::Rejected { .. }));

    match session.apply(PlayerCommand::AdvanceTurn { count: 3 }).expect("turns") {
        CommandResult::Turns { outcomes } => assert_eq!(outcomes.len(), 3),
        other => panic!("unexpected result {other:?}"),
    }
    assert_eq!(session.state().turn, 3);

    assert!(matches!(session.apply(PlayerCommand::Save).expect("save"), CommandResult::Saved));
    session.apply(PlayerCommand::NewGame { difficulty: None }).expect("new game");
    assert_eq!(session.state().turn, 0);
    assert!(matches!(
        session.apply(PlayerCommand::Load).expect("load"),
        CommandResult::Loaded { found: true }
    ));
    assert_eq!(session.state().turn, 3);
}

#[test]
fn hard_difficulty_starts_poorer() {
    let mut session = session(GameConfig::default_test());
    session
        .apply(PlayerCommand::NewGame { difficulty: Some(Difficulty::Hard) })
        .expect("new game");
    assert_eq!(session.state().money(), 70.0);
    assert_eq!(session.config().flood.risk_base, 0.15);
}

#[test]
fn commands_parse_from_json() {
    let cmd: PlayerCommand =
        serde_json::from_str(r#"{"cmd": "build", "structure": "seawall"}"#).expect("parse");
    assert_eq!(cmd, PlayerCommand::Build { structure: StructureKind::Seawall, row: None, col: None });

    let cmd: PlayerCommand = serde_json::from_str(r#"{"cmd": "advance_turn"}"#).expect("parse");
    assert_eq!(cmd, PlayerCommand::AdvanceTurn { count: 1 });
}

#[test]
fn summary_mentions_the_essentials() {
    let session = session(GameConfig::default_test());
    let text = session.summary();
    assert!(text.contains("Year 2025"));
    assert!(text.contains("0 of 12 cells protected"));
    assert!(text.contains("Score so far: 130"));
    assert!(text.contains("rising 0.0500 m per turn"));
}

#[test]
fn calibrated_sea_level_shows_in_the_summary() {
    let mut config = GameConfig::default_test().with_difficulty(Difficulty::Realistic);
    config.calibrate_sea_level(3.4);
    let mut session = session(GameConfig::default_test());
    session.reconfigure(config);

    assert!(session.summary().contains("rising 0.0034 m per turn"));
}
