//! coastal-runner: headless game runner.
//!
//! Usage:
//!   coastal-runner --seed 12345 --turns 20 --db game.db
//!   coastal-runner --seed 12345 --difficulty hard --config game.json
//!   coastal-runner --db game.db --ipc-mode

use anyhow::{Context, Result};
use chrono::Utc;
use coastal_core::{
    climate::{CachedClimateData, FallbackClimateData},
    command::PlayerCommand,
    config::{Difficulty, GameConfig},
    end_condition,
    error::{GameError, GameResult},
    session::{CommandResult, GameSession},
    snapshot::SerializedGameState,
    stats::StatsSummary,
    store::SqliteStore,
    structure::StructureKind,
    types::{CellCoord, Turn, Year},
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Turn {
        #[serde(default = "one")]
        count: u32,
    },
    Build {
        structure: StructureKind,
        #[serde(default)]
        row:       Option<usize>,
        #[serde(default)]
        col:       Option<usize>,
    },
    Select {
        row: usize,
        col: usize,
    },
    Save,
    Load,
    Export,
    Import {
        data: serde_json::Value,
    },
    Stats,
    Quit,
}

fn one() -> u32 {
    1
}

#[derive(serde::Serialize)]
struct UiState {
    session_id: String,
    turn:       Turn,
    year:       Year,
    game_over:  bool,
    outcome:    Option<&'static str>,
    score:      u32,
    selected:   Option<CellCoord>,
    state:      SerializedGameState,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let turns = parse_arg(&args, "--turns", 20u32);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let offline = args.iter().any(|a| a == "--no-climate-data");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let difficulty = match flag_value(&args, "--difficulty") {
        Some(name) => Some(Difficulty::from_name(name).with_context(|| format!("unknown difficulty `{name}`"))?),
        None => None,
    };

    let mut config = match flag_value(&args, "--config") {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    if let Some(d) = difficulty {
        config = config.with_difficulty(d);
    }

    if !ipc_mode {
        println!("Coastal Savior - coastal-runner");
        println!("  started:    {}", Utc::now().to_rfc3339());
        println!("  seed:       {seed}");
        println!("  turns:      {turns}");
        println!("  db:         {db}");
        println!("  difficulty: {difficulty:?}");
        println!();
    }

    let store = SqliteStore::open_migrated(db)?;
    let mut climate = CachedClimateData::new(FallbackClimateData);

    let mut session = GameSession::resume(config.clone(), seed, store);
    log::info!(
        "session {} stored in {}",
        session.id,
        session.saves().storage().path().unwrap_or("memory")
    );
    if !offline {
        let report = session.refresh_environment(&mut climate);
        log::info!("climate data: {} readings, {} failures", report.updated.len(), report.failures.len());
        if difficulty == Some(Difficulty::Realistic) {
            if let Some(trend) = session
                .state()
                .environmental_snapshot
                .as_ref()
                .and_then(|s| s.sea_level.as_ref())
                .map(|s| s.trend)
            {
                config.calibrate_sea_level(trend);
                session.reconfigure(config.clone());
                log::info!("sea-level rise calibrated to {:.4} m/turn", config.sea_level_rise_per_turn);
            }
        }
    }

    if ipc_mode {
        run_ipc_loop(&mut session)?;
    } else {
        let result = session.apply(PlayerCommand::AdvanceTurn { count: turns })?;
        if let CommandResult::Turns { outcomes } = &result {
            for outcome in outcomes {
                println!(
                    "  turn {:>3} ({}) {:?} {:?}",
                    outcome.turn, outcome.year, outcome.status, outcome.tags
                );
            }
        }
        println!();
        print_summary(&session)?;
    }

    Ok(())
}

fn run_ipc_loop(session: &mut GameSession<SqliteStore>) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        let reply = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => serde_json::to_value(build_ui_state(session))?,
            IpcCommand::Turn { count } => {
                let result = session.apply(PlayerCommand::AdvanceTurn { count });
                reply_with_state(session, result)?
            }
            IpcCommand::Build { structure, row, col } => {
                let result = session.apply(PlayerCommand::Build { structure, row, col });
                reply_with_state(session, result)?
            }
            IpcCommand::Select { row, col } => {
                let result = session.apply(PlayerCommand::SelectCell { row, col });
                reply_with_state(session, result)?
            }
            IpcCommand::Save => {
                let result = session.apply(PlayerCommand::Save);
                reply_with_state(session, result)?
            }
            IpcCommand::Load => {
                let result = session.apply(PlayerCommand::Load);
                reply_with_state(session, result)?
            }
            IpcCommand::Export => match session.saves().export_json() {
                Some(raw) => serde_json::json!({ "export": serde_json::from_str::<serde_json::Value>(&raw)? }),
                None => serde_json::json!({ "error": "no saved game" }),
            },
            IpcCommand::Import { data } => match session.import_snapshot(&data.to_string()) {
                Ok(()) => serde_json::to_value(build_ui_state(session))?,
                Err(GameError::Validation(e)) => serde_json::json!({ "error": e.to_string() }),
                Err(e) => return Err(e.into()),
            },
            IpcCommand::Stats => serde_json::json!({
                "summary": session.saves().stats_summary(),
                "sessions": session.saves().load_stats().sessions,
                "storage": session.saves().storage_info()?,
            }),
        };
        writeln!(stdout, "{}", serde_json::to_string(&reply)?)?;
        stdout.flush()?;
    }
    Ok(())
}

/// A failed command is reported to the client; the loop keeps serving.
fn reply_with_state(
    session: &GameSession<SqliteStore>,
    result: GameResult<CommandResult>,
) -> Result<serde_json::Value> {
    match result {
        Ok(result) => Ok(serde_json::json!({
            "result": result,
            "state":  build_ui_state(session),
        })),
        Err(e) => {
            log::warn!("command failed: {e}");
            Ok(serde_json::json!({
                "error": e.to_string(),
                "state": build_ui_state(session),
            }))
        }
    }
}

fn build_ui_state(session: &GameSession<SqliteStore>) -> UiState {
    let state = session.state();
    UiState {
        session_id: session.id.clone(),
        turn:       state.turn,
        year:       state.current_year,
        game_over:  state.game_over,
        outcome:    state.outcome.map(|o| o.name()),
        score:      end_condition::score(state),
        selected:   state.selected_cell,
        state:      session.snapshot(),
    }
}

fn print_summary(session: &GameSession<SqliteStore>) -> Result<()> {
    let state = session.state();
    println!("=== GAME SUMMARY ===");
    println!("  session:     {}", session.id);
    println!("  final turn:  {}", state.turn);
    println!("  final year:  {}", state.current_year);
    println!("  outcome:     {}", state.outcome.map_or("in progress", |o| o.name()));
    println!("  score:       {}", end_condition::score(state));
    println!("  money:       {:.0}", state.money());
    println!("  wellbeing:   {:.0}", state.wellbeing());
    println!("  environment: {:.0}", state.environment());
    println!("  resilience:  {:.0}", state.resilience());

    println!();
    println!("=== ADVISORY ===");
    for line in session.summary().lines() {
        println!("  {line}");
    }

    println!();
    println!("=== HISTORY ===");
    let StatsSummary { total_games, victories, defeats, best_score, average_score } =
        session.saves().stats_summary();
    println!("  games:       {total_games}");
    println!("  victories:   {victories}");
    println!("  defeats:     {defeats}");
    println!("  best score:  {best_score}");
    println!("  avg score:   {average_score:.1}");
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    flag_value(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
