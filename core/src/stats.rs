//! Session statistics. One immutable record per finished or abandoned game.

use crate::{
    end_condition::{self, GameOutcome},
    state::GameState,
    types::{SessionId, Turn, Year},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Victory,
    Defeat,
    Timeout,
    TurnLimit,
    /// Recorded while the game was still running.
    Incomplete,
}

impl SessionOutcome {
    pub fn of(state: &GameState) -> Self {
        if !state.game_over {
            return Self::Incomplete;
        }
        match state.outcome {
            Some(GameOutcome::Victory)   => Self::Victory,
            Some(GameOutcome::Defeat)    => Self::Defeat,
            Some(GameOutcome::TurnLimit) => Self::TurnLimit,
            Some(GameOutcome::Timeout) | None => Self::Timeout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub money:       f64,
    pub wellbeing:   f64,
    pub environment: f64,
    pub resilience:  f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStat {
    pub id:          SessionId,
    pub date:        DateTime<Utc>,
    pub final_year:  Year,
    pub final_score: u32,
    pub turns:       Turn,
    pub outcome:     SessionOutcome,
    pub resources:   ResourceSnapshot,
}

impl SessionStat {
    pub fn from_state(state: &GameState) -> Self {
        Self {
            id:          new_session_id(),
            date:        Utc::now(),
            final_year:  state.current_year,
            final_score: end_condition::score(state),
            turns:       state.turn,
            outcome:     SessionOutcome::of(state),
            resources:   ResourceSnapshot {
                money:       state.money(),
                wellbeing:   state.wellbeing(),
                environment: state.environment(),
                resilience:  state.resilience(),
            },
        }
    }
}

pub fn new_session_id() -> SessionId {
    format!("session_{}", Uuid::new_v4())
}

/// The persisted history, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsLog {
    #[serde(default)]
    pub sessions: Vec<SessionStat>,
}

impl StatsLog {
    /// Add `stat`, keep the `cap` most recent sessions, newest first.
    pub fn record(&mut self, stat: SessionStat, cap: usize) {
        self.sessions.insert(0, stat);
        // Stable: equal dates keep the newer insert in front.
        self.sessions.sort_by(|a, b| b.date.cmp(&a.date));
        self.sessions.truncate(cap);
    }

    pub fn summary(&self) -> StatsSummary {
        let count = |o: SessionOutcome| self.sessions.iter().filter(|s| s.outcome == o).count();
        let total = self.sessions.len();
        let average_score = if total == 0 {
            0.0
        } else {
            self.sessions.iter().map(|s| f64::from(s.final_score)).sum::<f64>() / total as f64
        };
        StatsSummary {
            total_games: total,
            victories:   count(SessionOutcome::Victory),
            defeats:     count(SessionOutcome::Defeat),
            best_score:  self.sessions.iter().map(|s| s.final_score).max().unwrap_or(0),
            average_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub total_games:   usize,
    pub victories:     usize,
    pub defeats:       usize,
    pub best_score:    u32,
    pub average_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use chrono::Duration;

    fn stat_at(minutes_ago: i64, score: u32) -> SessionStat {
        let mut stat = SessionStat::from_state(&GameState::new(&GameConfig::default_test()));
        stat.date = Utc::now() - Duration::minutes(minutes_ago);
        stat.final_score = score;
        stat
    }

    #[test]
    fn history_is_capped_and_newest_first() {
        let mut log = StatsLog::default();
        for i in 0..25 {
            // Recorded oldest first.
            log.record(stat_at(100 - i, i as u32), 20);
        }
        assert_eq!(log.sessions.len(), 20);
        assert_eq!(log.sessions[0].final_score, 24);
        assert_eq!(log.sessions[19].final_score, 5);
        assert!(log.sessions.windows(2).all(|w| w[0].date >= w[1].date));
    }

    #[test]
    fn unfinished_game_is_incomplete() {
        let state = GameState::new(&GameConfig::default_test());
        assert_eq!(SessionOutcome::of(&state), SessionOutcome::Incomplete);
        let summary = StatsLog::default().summary();
        assert_eq!(summary.total_games, 0);
        assert_eq!(summary.best_score, 0);
    }
}
