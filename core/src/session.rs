//! One play session: the owned state, its engine and its save slot.
//!
//! The UI talks to this. It reads `state()`, issues commands, and never
//! mutates the state directly.

use crate::{
    climate::{projected_sea_level, refresh_snapshot, ClimateDataSource, RefreshReport},
    command::PlayerCommand,
    config::GameConfig,
    end_condition,
    engine::TurnEngine,
    error::{GameError, GameResult, PlacementError},
    event::TurnOutcome,
    rng::RandomSource,
    save_manager::SaveManager,
    snapshot::{serialize, SerializedGameState},
    state::{CellKind, GameState},
    stats::new_session_id,
    store::Storage,
    structure::{place_structure, PlacementReceipt, StructureKind},
    types::{CellCoord, SessionId},
};
use serde::Serialize;

/// What a command did, for hosts that drive the session by command.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandResult {
    Selected { accepted: bool },
    Built { receipt: PlacementReceipt },
    Rejected { reason: String },
    Turns { outcomes: Vec<TurnOutcome> },
    Saved,
    Loaded { found: bool },
    NewGame,
}

pub struct GameSession<S: Storage> {
    pub id:   SessionId,
    state:    GameState,
    engine:   TurnEngine,
    saves:    SaveManager<S>,
    autosave: bool,
}

impl<S: Storage> GameSession<S> {
    /// A fresh game. Any existing save is left alone until the first save.
    pub fn new(config: GameConfig, seed: u64, storage: S) -> Self {
        let engine = TurnEngine::new(config.clone(), seed);
        Self::assemble(config, engine, storage)
    }

    pub fn with_rng(config: GameConfig, rng: Box<dyn RandomSource>, storage: S) -> Self {
        let engine = TurnEngine::with_rng(config.clone(), rng);
        Self::assemble(config, engine, storage)
    }

    /// Continue from the saved game if there is a valid one.
    pub fn resume(config: GameConfig, seed: u64, storage: S) -> Self {
        let mut session = Self::new(config, seed, storage);
        session.load();
        session
    }

    fn assemble(config: GameConfig, engine: TurnEngine, storage: S) -> Self {
        Self {
            id:       new_session_id(),
            state:    GameState::new(&config),
            engine,
            saves:    SaveManager::new(storage, config),
            autosave: true,
        }
    }

    /// Swap the config for later turns and saves. The current state is kept.
    pub fn reconfigure(&mut self, config: GameConfig) {
        self.engine.reconfigure(config.clone());
        self.saves.reconfigure(config);
    }

    /// Save after every turn (the default).
    pub fn set_autosave(&mut self, on: bool) {
        self.autosave = on;
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &GameConfig {
        self.engine.config()
    }

    pub fn saves(&self) -> &SaveManager<S> {
        &self.saves
    }

    pub fn saves_mut(&mut self) -> &mut SaveManager<S> {
        &mut self.saves
    }

    // ── Board ──────────────────────────────────────────────────

    pub fn select_cell(&mut self, row: usize, col: usize) -> bool {
        self.state.select_cell(CellCoord::new(row, col))
    }

    pub fn place_structure(
        &mut self,
        kind: StructureKind,
        at:   CellCoord,
    ) -> Result<PlacementReceipt, PlacementError> {
        place_structure(&mut self.state, kind, at)
    }

    /// Build on the selected cell and clear the selection.
    pub fn place_selected(&mut self, kind: StructureKind) -> Result<PlacementReceipt, PlacementError> {
        let at = self.state.selected_cell.ok_or(PlacementError::NoSelection)?;
        let receipt = place_structure(&mut self.state, kind, at)?;
        self.state.selected_cell = None;
        Ok(receipt)
    }

    // ── Turns ──────────────────────────────────────────────────

    /// Advance one turn. Saves a checkpoint afterwards and records the
    /// session when the game ends. Storage failures are logged, not raised:
    /// the turn has already happened.
    pub fn advance_turn(&mut self) -> GameResult<TurnOutcome> {
        let outcome = self.engine.advance_turn(&mut self.state)?;
        if outcome.is_no_op() {
            return Ok(outcome);
        }
        if self.autosave {
            if let Err(e) = self.saves.save(&self.state) {
                log::warn!("checkpoint save failed: {e}");
            }
        }
        if outcome.is_terminal() {
            if let Err(e) = self.saves.record_session(&self.state) {
                log::error!("could not record session: {e}");
            }
        }
        Ok(outcome)
    }

    // ── Persistence ────────────────────────────────────────────

    pub fn save(&mut self) -> GameResult<()> {
        self.saves.save(&self.state)
    }

    /// Replace the live state with the saved game. `false` if there is none.
    pub fn load(&mut self) -> bool {
        match self.saves.load() {
            Some(state) => {
                self.state = state;
                true
            }
            None => false,
        }
    }

    pub fn export_snapshot(&self) -> Option<SerializedGameState> {
        self.saves.export_snapshot()
    }

    /// The live state in persisted form, saved or not.
    pub fn snapshot(&self) -> SerializedGameState {
        serialize(&self.state)
    }

    /// Validate, persist, then adopt an imported game. On error nothing changes.
    pub fn import_snapshot(&mut self, blob: &str) -> GameResult<()> {
        self.state = self.saves.import_snapshot(blob)?;
        Ok(())
    }

    /// Start over with the session's config. The environmental snapshot
    /// is external data and carries over.
    pub fn new_game(&mut self) {
        let snapshot = self.state.environmental_snapshot.take();
        self.state = GameState::new(self.engine.config());
        self.state.environmental_snapshot = snapshot;
        self.id = new_session_id();
    }

    // ── External data ──────────────────────────────────────────

    /// Fetch and merge the latest climate readings.
    pub fn refresh_environment(&mut self, source: &mut dyn ClimateDataSource) -> RefreshReport {
        let limit = self.engine.config().external_events.fetch_limit;
        refresh_snapshot(&mut self.state, source, limit)
    }

    /// Read-only plain-text summary of the current situation, for an
    /// advisory text provider.
    pub fn summary(&self) -> String {
        advisory_summary(&self.state, self.engine.config())
    }

    // ── Commands ───────────────────────────────────────────────

    /// Apply one player command. Rejected placements come back as
    /// `Rejected`; only engine and storage errors are raised.
    pub fn apply(&mut self, command: PlayerCommand) -> GameResult<CommandResult> {
        match command {
            PlayerCommand::SelectCell { row, col } => Ok(CommandResult::Selected {
                accepted: self.select_cell(row, col),
            }),
            PlayerCommand::Build { structure, row, col } => {
                let placed = match (row, col) {
                    (Some(row), Some(col)) => self.place_structure(structure, CellCoord::new(row, col)),
                    _ => self.place_selected(structure),
                };
                Ok(match placed {
                    Ok(receipt) => CommandResult::Built { receipt },
                    Err(e) => CommandResult::Rejected { reason: e.to_string() },
                })
            }
            PlayerCommand::AdvanceTurn { count } => {
                let mut outcomes = Vec::new();
                for _ in 0..count.max(1) {
                    let outcome = self.advance_turn()?;
                    let done = outcome.is_no_op() || outcome.is_terminal();
                    outcomes.push(outcome);
                    if done {
                        break;
                    }
                }
                Ok(CommandResult::Turns { outcomes })
            }
            PlayerCommand::Save => match self.save() {
                Ok(()) => Ok(CommandResult::Saved),
                Err(GameError::Validation(e)) => Ok(CommandResult::Rejected { reason: e.to_string() }),
                Err(e) => Err(e),
            },
            PlayerCommand::Load => Ok(CommandResult::Loaded { found: self.load() }),
            PlayerCommand::NewGame { difficulty } => {
                match difficulty {
                    Some(d) => {
                        let config = self.engine.config().clone().with_difficulty(d);
                        self.reconfigure(config);
                        self.new_game();
                    }
                    None => self.new_game(),
                }
                Ok(CommandResult::NewGame)
            }
        }
    }
}

pub fn advisory_summary(state: &GameState, config: &GameConfig) -> String {
    let coast_total = state.board.count_where(|c| c.kind == CellKind::Coast);
    let coast_protected = state
        .board
        .count_where(|c| c.kind == CellKind::Coast && c.is_protected());
    let flooded = state.board.count_where(|c| c.flooded);
    let built = |kind: StructureKind| state.board.count_where(|c| c.structure == Some(kind));

    let mut lines = vec![
        format!("Year {} (turn {} of {})", state.current_year, state.turn, config.max_turns),
        format!(
            "Money {:.0}, wellbeing {:.0}, environment {:.0}, resilience {:.0}",
            state.money(),
            state.wellbeing(),
            state.environment(),
            state.resilience()
        ),
        format!(
            "Coast: {coast_protected} of {coast_total} cells protected, {flooded} cells flooded"
        ),
        format!(
            "Structures: {} residential, {} industrial, {} mangrove, {} seawall",
            built(StructureKind::Residential),
            built(StructureKind::Industrial),
            built(StructureKind::Mangrove),
            built(StructureKind::Seawall)
        ),
        format!(
            "Projected sea level: +{:.2} m, rising {:.4} m per turn",
            projected_sea_level(state, config.initial.year),
            config.sea_level_rise_per_turn
        ),
    ];
    if let Some(snapshot) = &state.environmental_snapshot {
        if let Some(t) = &snapshot.temperature {
            lines.push(format!("Temperature anomaly: {:+.1} C", t.anomaly));
        }
        if let Some(co2) = &snapshot.co2 {
            lines.push(format!("CO2: {:.0} ppm", co2.level));
        }
    }
    match state.outcome {
        Some(outcome) => lines.push(format!(
            "Game over: {} (score {})",
            outcome.name(),
            end_condition::score(state)
        )),
        None => lines.push(format!("Score so far: {}", end_condition::score(state))),
    }
    lines.join("\n")
}
