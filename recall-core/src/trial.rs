use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::item::{Response, Stimulus};
use crate::mode::ModeKind;

/// Which score decides pass/fail and the feedback shown for a mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPolicy {
    Positional,
    FirstLast,
    MultisetCredit,
    AllOrNothing,
}

impl ScoringPolicy {
    /// Same spelling as in config files.
    pub fn label(&self) -> &'static str {
        match self {
            ScoringPolicy::Positional => "positional",
            ScoringPolicy::FirstLast => "first_last",
            ScoringPolicy::MultisetCredit => "multiset_credit",
            ScoringPolicy::AllOrNothing => "all_or_nothing",
        }
    }
}

/// Score of one trial. Computed once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub policy: ScoringPolicy,
    /// Stimulus length.
    pub length: usize,
    pub correct_positions: usize,
    /// Multiset credit.
    pub correct_numbers: usize,
    /// `length - correct_numbers`; empty slots always count here.
    pub wrong_numbers: usize,
    pub first_correct: Option<bool>,
    pub last_correct: Option<bool>,
    pub all_or_nothing: bool,
    pub completion_rate: f64,
    pub pattern_mistakes: Option<u32>,
}

impl ScoreResult {
    pub fn first_wrong(&self) -> bool {
        self.first_correct == Some(false)
    }

    pub fn last_wrong(&self) -> bool {
        self.last_correct == Some(false)
    }

    pub fn passed(&self) -> bool {
        match self.policy {
            ScoringPolicy::Positional => self.correct_positions == self.length,
            ScoringPolicy::FirstLast => {
                self.first_correct == Some(true) && self.last_correct == Some(true)
            }
            ScoringPolicy::MultisetCredit => self.wrong_numbers == 0,
            ScoringPolicy::AllOrNothing => self.all_or_nothing,
        }
    }
}

/// Running per-mode totals. Only grow until explicitly reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounters {
    pub trials: u64,
    pub wrong_first: u64,
    pub wrong_last: u64,
    pub wrong_numbers: u64,
    pub correct_numbers: u64,
}

impl SessionCounters {
    pub fn absorb(&mut self, score: &ScoreResult) {
        self.trials += 1;
        self.wrong_first += score.first_wrong() as u64;
        self.wrong_last += score.last_wrong() as u64;
        self.wrong_numbers += score.wrong_numbers as u64;
        self.correct_numbers += score.correct_numbers as u64;
    }

    /// Field-wise `>=`.
    pub fn dominates(&self, earlier: &SessionCounters) -> bool {
        self.trials >= earlier.trials
            && self.wrong_first >= earlier.wrong_first
            && self.wrong_last >= earlier.wrong_last
            && self.wrong_numbers >= earlier.wrong_numbers
            && self.correct_numbers >= earlier.correct_numbers
    }
}

/// One completed trial, as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub timestamp: DateTime<Utc>,
    pub participant: Option<String>,
    /// Attempt index across the lifetime of the machine, 1-based.
    pub attempt: u64,
    /// Round within the session, 1-based.
    pub round: usize,
    pub mode: ModeKind,
    pub stimulus: Stimulus,
    pub response: Response,
    pub score: ScoreResult,
    /// Totals snapshot including this trial; filled in by the sink.
    pub totals: SessionCounters,
    pub reveal_ms: Option<u64>,
    pub input_secs: Option<f64>,
    /// Scheduled reveal interval, speed mode only.
    pub speed_ms: Option<u64>,
    /// Taps during retention, tapping mode only.
    pub taps: Option<u32>,
}

/// Where completed trials go.
pub trait TrialSink {
    /// Persists one record and folds it into the per-mode totals.
    fn record(&mut self, record: TrialRecord) -> Result<()>;
}
