use std::path::Path;

use recall_core::{RecallError, Result, ScoringPolicy};
use serde::{Deserialize, Serialize};

use crate::generator::WORD_POOL;
use crate::mode::{RevealSchedule, ScheduleStep};

/// Resolved timing and round-count settings, loadable from TOML.
///
/// Every section falls back to its defaults, so a config file only needs the values it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub normal: NormalConfig,
    pub speed: SpeedConfig,
    pub pattern: PatternConfig,
    pub free_recall: FreeRecallConfig,
    /// Pause after scoring before the next reveal.
    pub feedback_delay_ms: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            normal: NormalConfig::default(),
            speed: SpeedConfig::default(),
            pattern: PatternConfig::default(),
            free_recall: FreeRecallConfig::default(),
            feedback_delay_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalConfig {
    pub reveal_ms: u64,
    pub rounds: usize,
    pub digits: usize,
    pub policy: ScoringPolicy,
}

impl Default for NormalConfig {
    fn default() -> Self {
        Self {
            reveal_ms: 5000,
            rounds: 10,
            digits: 10,
            policy: ScoringPolicy::FirstLast,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    /// Ordered (interval, repetitions) pairs; intervals must not increase.
    pub schedule: Vec<ScheduleStep>,
    pub digits: usize,
    pub policy: ScoringPolicy,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            schedule: vec![
                ScheduleStep::new(10_000, 5),
                ScheduleStep::new(5_000, 5),
                ScheduleStep::new(2_500, 5),
            ],
            digits: 10,
            policy: ScoringPolicy::FirstLast,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Reveal of the digit stimulus that precedes the grid round.
    pub reveal_ms: u64,
    pub rounds: usize,
    pub digits: usize,
    pub grid_length: usize,
    pub cell_on_ms: u64,
    pub gap_ms: u64,
    /// Pause between the last correct click and digit entry.
    pub handoff_ms: u64,
    pub policy: ScoringPolicy,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            reveal_ms: 5000,
            rounds: 10,
            digits: 10,
            grid_length: 6,
            cell_on_ms: 600,
            gap_ms: 200,
            handoff_ms: 500,
            policy: ScoringPolicy::MultisetCredit,
        }
    }
}

/// Letter, cluster, word and retention-task conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeRecallConfig {
    /// List length is drawn from these per trial; a single entry fixes it.
    pub list_lengths: Vec<usize>,
    pub trials: usize,
    pub item_on_ms: u64,
    pub isi_blank_ms: u64,
    /// Blank retention interval of the plain conditions.
    pub retention_ms: u64,
    /// Retention interval of the suppression and tapping conditions.
    pub task_retention_ms: u64,
    /// How often tapping mode rechecks for a first tap once retention has run out.
    pub tap_recheck_ms: u64,
    pub policy: ScoringPolicy,
}

impl FreeRecallConfig {
    /// Exposure of a whole list: every item on, then blank.
    pub fn exposure_ms(&self, length: usize) -> u64 {
        length as u64 * (self.item_on_ms + self.isi_blank_ms)
    }
}

impl Default for FreeRecallConfig {
    fn default() -> Self {
        Self {
            list_lengths: vec![10],
            trials: 5,
            item_on_ms: 750,
            isi_blank_ms: 250,
            retention_ms: 200,
            task_retention_ms: 10_000,
            tap_recheck_ms: 500,
            policy: ScoringPolicy::Positional,
        }
    }
}

impl ExperimentConfig {
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| RecallError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("normal.reveal_ms", self.normal.reveal_ms as usize),
            ("normal.rounds", self.normal.rounds),
            ("normal.digits", self.normal.digits),
            ("speed.digits", self.speed.digits),
            ("pattern.reveal_ms", self.pattern.reveal_ms as usize),
            ("pattern.rounds", self.pattern.rounds),
            ("pattern.digits", self.pattern.digits),
            ("pattern.grid_length", self.pattern.grid_length),
            ("free_recall.trials", self.free_recall.trials),
            ("free_recall.item_on_ms", self.free_recall.item_on_ms as usize),
            ("free_recall.task_retention_ms", self.free_recall.task_retention_ms as usize),
            ("free_recall.tap_recheck_ms", self.free_recall.tap_recheck_ms as usize),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(RecallError::invalid(format!("{name} must be > 0")));
        }
        let lengths = &self.free_recall.list_lengths;
        if lengths.is_empty() || lengths.contains(&0) {
            return Err(RecallError::invalid(
                "free_recall.list_lengths must be non-empty and > 0",
            ));
        }
        if let Some(too_long) = lengths.iter().find(|l| **l > WORD_POOL.len()) {
            return Err(RecallError::invalid(format!(
                "free_recall list length {too_long} exceeds the {}-word pool",
                WORD_POOL.len()
            )));
        }
        RevealSchedule::new(self.speed.schedule.clone())?;
        Ok(())
    }
}
