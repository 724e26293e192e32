//! The persistence manager: versioned save/load with a backup slot,
//! import/export, and session statistics.
//!
//! RULES:
//!   - Nothing is written or restored without passing validation first.
//!   - The backup write completes before the primary write begins.
//!   - An invalid record is discarded, never coerced into a playable state.
//!   - Statistics live under their own key; clearing the save keeps them.

use crate::{
    config::GameConfig,
    error::{GameResult, ValidationError},
    snapshot::{self, serialize, SaveRecord, SerializedGameState},
    state::GameState,
    stats::{SessionStat, StatsLog, StatsSummary},
    store::Storage,
    types::{Turn, Year},
    validate::{validate_progress, validate_record_value, validate_state_value},
};
use serde::Serialize;
use serde_json::Value;

pub const SAVE_KEY: &str = "coastal_savior_save";
pub const BACKUP_KEY: &str = "coastal_savior_backup";
pub const STATS_KEY: &str = "coastal_savior_stats";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveInfo {
    pub timestamp: String,
    pub version:   String,
    pub year:      Option<Year>,
    pub turn:      Option<Turn>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageInfo {
    pub has_save:       bool,
    pub save_kb:        f64,
    pub stats_kb:       f64,
    pub total_sessions: usize,
}

pub struct SaveManager<S: Storage> {
    storage: S,
    config:  GameConfig,
}

impl<S: Storage> SaveManager<S> {
    pub fn new(storage: S, config: GameConfig) -> Self {
        Self { storage, config }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn reconfigure(&mut self, config: GameConfig) {
        self.config = config;
    }

    fn version(&self) -> &str {
        &self.config.save.version
    }

    // ── Save / load ────────────────────────────────────────────

    /// Validate and commit `state`, backing up the previous save first.
    pub fn save(&mut self, state: &GameState) -> GameResult<()> {
        let record = SaveRecord::new(self.version(), state);
        let value = serde_json::to_value(&record)?;
        validate_record_value(&value, self.version())?;
        let text = serde_json::to_string(&value)?;

        if let Err(e) = self.create_backup() {
            log::error!("save aborted, backup write failed: {e}");
            return Err(e);
        }
        if let Err(e) = self.storage.set(SAVE_KEY, &text) {
            log::error!("save write failed: {e}");
            if let Err(restore_err) = self.restore_from_backup() {
                log::error!("could not put the backup back: {restore_err}");
            }
            return Err(e);
        }
        log::info!("saved turn {} ({})", state.turn, state.current_year);
        Ok(())
    }

    /// The saved game, if there is a valid one.
    ///
    /// An unreadable record falls back to the backup. A readable but
    /// invalid record is cleared.
    pub fn load(&mut self) -> Option<GameState> {
        let raw = match self.storage.get(SAVE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("save unreadable ({e}), trying backup");
                return self.load_from_backup();
            }
        };
        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("save is not valid JSON ({e}), trying backup");
                return self.load_from_backup();
            }
        };
        match self.decode(&value) {
            Ok(state) => {
                log::info!("loaded turn {} ({})", state.turn, state.current_year);
                Some(state)
            }
            Err(e) => {
                log::warn!("discarding saved game: {e}");
                if let Err(e) = self.clear() {
                    log::error!("could not clear rejected save: {e}");
                }
                None
            }
        }
    }

    fn decode(&self, record: &Value) -> GameResult<GameState> {
        validate_record_value(record, self.version())?;
        validate_progress(&record["state"], self.config.max_turns)?;
        snapshot::restore(&record["state"], &self.config)
    }

    fn read_record(&self, key: &str) -> GameResult<Option<Value>> {
        match self.storage.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn load_from_backup(&self) -> Option<GameState> {
        let record = match self.read_record(BACKUP_KEY) {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("backup unreadable: {e}");
                return None;
            }
        };
        match self.decode(&record) {
            Ok(state) => {
                log::info!("loaded backup at turn {}", state.turn);
                Some(state)
            }
            Err(e) => {
                log::warn!("backup rejected: {e}");
                None
            }
        }
    }

    /// Copy the current save into the backup slot. `false` if there was
    /// nothing to copy.
    pub fn create_backup(&mut self) -> GameResult<bool> {
        match self.storage.get(SAVE_KEY)? {
            Some(current) => {
                self.storage.set(BACKUP_KEY, &current)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Copy the backup over the current save. `false` if there is no backup.
    pub fn restore_from_backup(&mut self) -> GameResult<bool> {
        match self.storage.get(BACKUP_KEY)? {
            Some(backup) => {
                self.storage.set(SAVE_KEY, &backup)?;
                log::info!("backup restored to the primary slot");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Erase the current save. Backup and statistics are kept.
    pub fn clear(&mut self) -> GameResult<()> {
        self.storage.remove(SAVE_KEY)?;
        log::info!("saved game cleared");
        Ok(())
    }

    pub fn has_saved_game(&self) -> bool {
        matches!(self.storage.get(SAVE_KEY), Ok(Some(_)))
    }

    pub fn save_info(&self) -> Option<SaveInfo> {
        let record = self.read_record(SAVE_KEY).ok().flatten()?;
        let state = &record["state"];
        Some(SaveInfo {
            timestamp: record["timestamp"].as_str()?.to_string(),
            version:   record["version"].as_str()?.to_string(),
            year:      state["current_year"].as_i64().and_then(|y| Year::try_from(y).ok()),
            turn:      state["turn"].as_u64().and_then(|t| Turn::try_from(t).ok()),
        })
    }

    // ── Import / export ────────────────────────────────────────

    /// The current save as a serialized state.
    pub fn export_snapshot(&self) -> Option<SerializedGameState> {
        let record = self.read_record(SAVE_KEY).ok().flatten()?;
        match self.decode(&record) {
            Ok(state) => Some(serialize(&state)),
            Err(e) => {
                log::warn!("nothing exported: {e}");
                None
            }
        }
    }

    /// The raw persisted record, for writing to a file.
    pub fn export_json(&self) -> Option<String> {
        self.storage.get(SAVE_KEY).ok().flatten()
    }

    /// Accept a full save record or a bare serialized state. Invalid input
    /// is rejected before anything is written.
    pub fn import_snapshot(&mut self, blob: &str) -> GameResult<GameState> {
        let value: Value = serde_json::from_str(blob)
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        let state_value = if value.get("version").is_some() {
            validate_record_value(&value, self.version())?;
            &value["state"]
        } else {
            validate_state_value(&value)?;
            &value
        };
        validate_progress(state_value, self.config.max_turns)?;
        let state = snapshot::restore(state_value, &self.config)?;
        self.save(&state)?;
        log::info!("imported game at turn {} ({})", state.turn, state.current_year);
        Ok(state)
    }

    // ── Statistics ─────────────────────────────────────────────

    /// Append a session record for `state` to the capped history.
    pub fn record_session(&mut self, state: &GameState) -> GameResult<SessionStat> {
        let stat = SessionStat::from_state(state);
        let mut log = self.load_stats();
        log.record(stat.clone(), self.config.save.stats_history);
        self.storage.set(STATS_KEY, &serde_json::to_string(&log)?)?;
        log::info!("recorded session {} ({:?}, score {})", stat.id, stat.outcome, stat.final_score);
        Ok(stat)
    }

    /// Session history, newest first. Unreadable history reads as empty.
    pub fn load_stats(&self) -> StatsLog {
        let raw = match self.storage.get(STATS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return StatsLog::default(),
            Err(e) => {
                log::warn!("stats unreadable: {e}");
                return StatsLog::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("stats malformed, starting fresh: {e}");
            StatsLog::default()
        })
    }

    pub fn stats_summary(&self) -> StatsSummary {
        self.load_stats().summary()
    }

    pub fn clear_stats(&mut self) -> GameResult<()> {
        self.storage.remove(STATS_KEY)?;
        Ok(())
    }

    pub fn storage_info(&self) -> GameResult<StorageInfo> {
        let kb = |bytes: usize| (bytes as f64 / 1024.0 * 100.0).round() / 100.0;
        Ok(StorageInfo {
            has_save:       self.has_saved_game(),
            save_kb:        kb(self.storage.size_of(SAVE_KEY)?),
            stats_kb:       kb(self.storage.size_of(STATS_KEY)?),
            total_sessions: self.load_stats().sessions.len(),
        })
    }
}

