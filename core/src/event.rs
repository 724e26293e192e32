//! Turn outcome types: everything a turn reports back to the host.
//!
//! RULE: The engine never presents anything. It returns tags and a
//! structured event list; the host decides what to show.

use crate::{
    achievement::AchievementId,
    catalog::Severity,
    end_condition::GameOutcome,
    state::GameState,
    types::{Turn, Year},
};
use serde::{Deserialize, Serialize};

/// What a firing rule did, as far as the host is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeTag {
    Flood,
    StormDamage,
    HeatWave,
    PositiveEvent,
    ExtremeHeat,
    SeaLevelSpike,
    ExternalEventImpact,
}

/// Every event emitted while processing a turn.
/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    TurnStarted {
        turn: Turn,
        year: Year,
    },
    RuleFired {
        rule_id:  String,
        severity: Severity,
        tag:      Option<OutcomeTag>,
    },
    RuleFailed {
        rule_id: String,
        reason:  String,
    },
    CellsFlooded {
        count: usize,
    },
    IncomeApplied {
        amount: f64,
    },
    ExternalEventDrawn {
        title:     String,
        magnitude: f64,
        tag:       Option<OutcomeTag>,
    },
    AchievementUnlocked {
        id: AchievementId,
    },
    GameEnded {
        outcome: GameOutcome,
        score:   u32,
    },
    TurnLimitReached {
        turn: Turn,
    },
}

/// Where the game stands after the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "outcome", rename_all = "snake_case")]
pub enum TurnStatus {
    /// The game was already over. Nothing changed.
    NoOp,
    InProgress,
    TurnLimitReached,
    Ended(GameOutcome),
}

/// A rule that failed and was skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleFailure {
    pub rule_id: String,
    pub reason:  String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    pub turn:     Turn,
    pub year:     Year,
    pub status:   TurnStatus,
    /// Tags in the order they fired.
    pub tags:     Vec<OutcomeTag>,
    pub events:   Vec<TurnEvent>,
    pub failures: Vec<RuleFailure>,
}

impl TurnOutcome {
    pub(crate) fn for_state(state: &GameState, status: TurnStatus) -> Self {
        Self {
            turn: state.turn,
            year: state.current_year,
            status,
            tags: Vec::new(),
            events: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// The game had already ended before this call.
    pub fn is_no_op(&self) -> bool {
        self.status == TurnStatus::NoOp
    }

    /// This call ended the game.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TurnStatus::TurnLimitReached | TurnStatus::Ended(_))
    }

    pub fn fired(&self, tag: OutcomeTag) -> bool {
        self.tags.contains(&tag)
    }

    pub(crate) fn push_tag(&mut self, tag: Option<OutcomeTag>) {
        if let Some(tag) = tag {
            self.tags.push(tag);
        }
    }

    pub(crate) fn record_failure(&mut self, rule_id: &str, reason: String) {
        self.events.push(TurnEvent::RuleFailed {
            rule_id: rule_id.to_string(),
            reason:  reason.clone(),
        });
        self.failures.push(RuleFailure {
            rule_id: rule_id.to_string(),
            reason,
        });
    }
}
