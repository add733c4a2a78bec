//! Session modes and the reveal-time schedules they carry.

use rand::Rng;
use rand::seq::IndexedRandom;
use recall_core::{ModeKind, RecallError, Result, ScoringPolicy};
use serde::{Deserialize, Serialize};

use crate::config::ExperimentConfig;
use crate::generator::StimulusMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleStep {
    pub interval_ms: u64,
    pub repeat: usize,
}

impl ScheduleStep {
    pub const fn new(interval_ms: u64, repeat: usize) -> Self {
        Self {
            interval_ms,
            repeat,
        }
    }
}

/// Per-round reveal intervals. Never increasing; the session ends once it runs out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealSchedule {
    steps: Vec<ScheduleStep>,
}

impl RevealSchedule {
    pub fn new(steps: Vec<ScheduleStep>) -> Result<Self> {
        if steps.is_empty() {
            return Err(RecallError::invalid("reveal schedule is empty"));
        }
        if let Some(step) = steps.iter().find(|s| s.interval_ms == 0 || s.repeat == 0) {
            return Err(RecallError::invalid(format!(
                "schedule step {}ms x{} must be positive",
                step.interval_ms, step.repeat
            )));
        }
        if steps.windows(2).any(|w| w[1].interval_ms > w[0].interval_ms) {
            return Err(RecallError::invalid(
                "reveal schedule intervals must not increase",
            ));
        }
        Ok(Self { steps })
    }

    pub fn constant(interval_ms: u64, rounds: usize) -> Result<Self> {
        Self::new(vec![ScheduleStep::new(interval_ms, rounds)])
    }

    /// Reveal interval for 0-based `round`, `None` once exhausted.
    pub fn interval_for(&self, round: usize) -> Option<u64> {
        let mut remaining = round;
        for step in &self.steps {
            if remaining < step.repeat {
                return Some(step.interval_ms);
            }
            remaining -= step.repeat;
        }
        None
    }

    pub fn total_rounds(&self) -> usize {
        self.steps.iter().map(|s| s.repeat).sum()
    }

    pub fn steps(&self) -> &[ScheduleStep] {
        &self.steps
    }
}

/// Timings of the nested grid round in pattern mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridTiming {
    pub length: usize,
    pub cell_on_ms: u64,
    pub gap_ms: u64,
    pub handoff_ms: u64,
}

/// What fills the interval between the last list item and the response screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionTask {
    Blank,
    /// Silent repetition of a syllable.
    Suppression,
    /// Tapping; the response screen waits for at least one tap.
    Tapping,
}

/// Item pacing and retention of the list conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListTiming {
    pub item_on_ms: u64,
    pub isi_blank_ms: u64,
    pub retention_ms: u64,
    pub task_retention_ms: u64,
    pub tap_recheck_ms: u64,
}

/// A mode together with the pacing data it runs on. Chosen once when the session starts.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionMode {
    /// Constant reveal for a fixed number of rounds.
    Normal {
        reveal_ms: u64,
        rounds: usize,
        digits: usize,
        policy: ScoringPolicy,
    },
    /// Shrinking reveal intervals.
    Speed {
        schedule: RevealSchedule,
        digits: usize,
        policy: ScoringPolicy,
    },
    /// Digit reveal, a full grid round, then digit entry.
    Pattern {
        reveal_ms: u64,
        rounds: usize,
        digits: usize,
        grid: GridTiming,
        policy: ScoringPolicy,
    },
    /// Letter, cluster or word lists, optionally with a retention task.
    FreeRecall {
        condition: ModeKind,
        trials: usize,
        lengths: Vec<usize>,
        timing: ListTiming,
        policy: ScoringPolicy,
    },
}

impl SessionMode {
    pub fn from_config(kind: ModeKind, config: &ExperimentConfig) -> Result<Self> {
        config.validate()?;
        Ok(match kind {
            ModeKind::Normal => SessionMode::Normal {
                reveal_ms: config.normal.reveal_ms,
                rounds: config.normal.rounds,
                digits: config.normal.digits,
                policy: config.normal.policy,
            },
            ModeKind::Speed => SessionMode::Speed {
                schedule: RevealSchedule::new(config.speed.schedule.clone())?,
                digits: config.speed.digits,
                policy: config.speed.policy,
            },
            ModeKind::Pattern => SessionMode::Pattern {
                reveal_ms: config.pattern.reveal_ms,
                rounds: config.pattern.rounds,
                digits: config.pattern.digits,
                grid: GridTiming {
                    length: config.pattern.grid_length,
                    cell_on_ms: config.pattern.cell_on_ms,
                    gap_ms: config.pattern.gap_ms,
                    handoff_ms: config.pattern.handoff_ms,
                },
                policy: config.pattern.policy,
            },
            ModeKind::Letters
            | ModeKind::Clusters
            | ModeKind::Words
            | ModeKind::Suppression
            | ModeKind::Tapping => {
                let list = &config.free_recall;
                SessionMode::FreeRecall {
                    condition: kind,
                    trials: list.trials,
                    lengths: list.list_lengths.clone(),
                    timing: ListTiming {
                        item_on_ms: list.item_on_ms,
                        isi_blank_ms: list.isi_blank_ms,
                        retention_ms: list.retention_ms,
                        task_retention_ms: list.task_retention_ms,
                        tap_recheck_ms: list.tap_recheck_ms,
                    },
                    policy: list.policy,
                }
            }
        })
    }

    pub fn kind(&self) -> ModeKind {
        match self {
            SessionMode::Normal { .. } => ModeKind::Normal,
            SessionMode::Speed { .. } => ModeKind::Speed,
            SessionMode::Pattern { .. } => ModeKind::Pattern,
            SessionMode::FreeRecall { condition, .. } => *condition,
        }
    }

    /// Reveal duration of 0-based `round` for a stimulus of `length` items, `None` when the
    /// session is over. Only list conditions depend on the length.
    pub fn reveal_for(&self, round: usize, length: usize) -> Option<u64> {
        match self {
            SessionMode::Speed { schedule, .. } => schedule.interval_for(round),
            SessionMode::Normal { reveal_ms, .. } | SessionMode::Pattern { reveal_ms, .. } => {
                self.has_round(round).then_some(*reveal_ms)
            }
            SessionMode::FreeRecall { timing, .. } => self
                .has_round(round)
                .then(|| length as u64 * (timing.item_on_ms + timing.isi_blank_ms)),
        }
    }

    pub fn has_round(&self, round: usize) -> bool {
        round < self.total_rounds()
    }

    pub fn total_rounds(&self) -> usize {
        match self {
            SessionMode::Normal { rounds, .. } | SessionMode::Pattern { rounds, .. } => *rounds,
            SessionMode::Speed { schedule, .. } => schedule.total_rounds(),
            SessionMode::FreeRecall { trials, .. } => *trials,
        }
    }

    /// Retention task and its duration. Only list conditions have one.
    pub fn retention(&self) -> Option<(RetentionTask, u64)> {
        let SessionMode::FreeRecall {
            condition, timing, ..
        } = self
        else {
            return None;
        };
        Some(match condition {
            ModeKind::Suppression => (RetentionTask::Suppression, timing.task_retention_ms),
            ModeKind::Tapping => (RetentionTask::Tapping, timing.task_retention_ms),
            _ => (RetentionTask::Blank, timing.retention_ms),
        })
    }

    pub fn tap_recheck_ms(&self) -> Option<u64> {
        match self {
            SessionMode::FreeRecall { timing, .. } => Some(timing.tap_recheck_ms),
            _ => None,
        }
    }

    pub fn stimulus_mode(&self) -> StimulusMode {
        match self {
            SessionMode::FreeRecall { condition, .. } => match condition {
                ModeKind::Clusters => StimulusMode::Clusters,
                ModeKind::Words => StimulusMode::Words,
                _ => StimulusMode::Letters,
            },
            _ => StimulusMode::Digits,
        }
    }

    /// Length of the next main recall stimulus. List conditions draw it per trial.
    pub fn draw_length<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        match self {
            SessionMode::Normal { digits, .. }
            | SessionMode::Speed { digits, .. }
            | SessionMode::Pattern { digits, .. } => *digits,
            SessionMode::FreeRecall { lengths, .. } => {
                lengths.choose(rng).copied().unwrap_or_default()
            }
        }
    }

    pub fn policy(&self) -> ScoringPolicy {
        match self {
            SessionMode::Normal { policy, .. }
            | SessionMode::Speed { policy, .. }
            | SessionMode::Pattern { policy, .. }
            | SessionMode::FreeRecall { policy, .. } => *policy,
        }
    }

    pub fn grid(&self) -> Option<GridTiming> {
        match self {
            SessionMode::Pattern { grid, .. } => Some(*grid),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_tier_schedule() {
        let schedule = RevealSchedule::new(ExperimentConfig::default().speed.schedule).unwrap();
        assert_eq!(schedule.total_rounds(), 15);
        let intervals: Vec<u64> = (0..15).filter_map(|r| schedule.interval_for(r)).collect();
        assert_eq!(intervals[..5], [10_000; 5]);
        assert_eq!(intervals[5..10], [5_000; 5]);
        assert_eq!(intervals[10..], [2_500; 5]);
        assert_eq!(schedule.interval_for(15), None);
    }

    #[test]
    fn schedule_rejects_bad_steps() {
        assert!(RevealSchedule::new(vec![]).is_err());
        assert!(RevealSchedule::new(vec![ScheduleStep::new(100, 0)]).is_err());
        assert!(
            RevealSchedule::new(vec![ScheduleStep::new(100, 1), ScheduleStep::new(200, 1)])
                .is_err()
        );
        assert!(
            RevealSchedule::new(vec![ScheduleStep::new(200, 1), ScheduleStep::new(200, 1)])
                .is_ok()
        );
    }

    #[test]
    fn modes_from_default_config() {
        let config = ExperimentConfig::default();
        let normal = SessionMode::from_config(ModeKind::Normal, &config).unwrap();
        assert_eq!(normal.reveal_for(9, 10), Some(5000));
        assert_eq!(normal.reveal_for(10, 10), None);
        assert_eq!(normal.retention(), None);
        assert_eq!(normal.stimulus_mode(), StimulusMode::Digits);

        let pattern = SessionMode::from_config(ModeKind::Pattern, &config).unwrap();
        assert_eq!(pattern.grid().map(|g| g.length), Some(6));
        assert_eq!(pattern.policy(), ScoringPolicy::MultisetCredit);

        let words = SessionMode::from_config(ModeKind::Words, &config).unwrap();
        assert_eq!(words.kind(), ModeKind::Words);
        assert_eq!(words.stimulus_mode(), StimulusMode::Words);
        assert_eq!(words.total_rounds(), 5);
        assert_eq!(words.reveal_for(0, 10), Some(10_000));
        assert_eq!(words.reveal_for(4, 6), Some(6_000));
        assert_eq!(words.reveal_for(5, 10), None);
        assert_eq!(words.retention(), Some((RetentionTask::Blank, 200)));
    }

    #[test]
    fn retention_tasks_use_the_long_interval() {
        let config = ExperimentConfig::default();
        let tapping = SessionMode::from_config(ModeKind::Tapping, &config).unwrap();
        assert_eq!(tapping.retention(), Some((RetentionTask::Tapping, 10_000)));
        assert_eq!(tapping.tap_recheck_ms(), Some(500));
        assert_eq!(tapping.stimulus_mode(), StimulusMode::Letters);
        let suppression = SessionMode::from_config(ModeKind::Suppression, &config).unwrap();
        assert_eq!(
            suppression.retention(),
            Some((RetentionTask::Suppression, 10_000))
        );
    }

    #[test]
    fn list_length_is_drawn_from_config() {
        use rand::SeedableRng;
        use rand::rngs::StdRng;

        let mut config = ExperimentConfig::default();
        config.free_recall.list_lengths = vec![5, 6, 7];
        let letters = SessionMode::from_config(ModeKind::Letters, &config).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let drawn: Vec<usize> = (0..200).map(|_| letters.draw_length(&mut rng)).collect();
        assert!(drawn.iter().all(|l| (5..=7).contains(l)));
        for l in 5..=7 {
            assert!(drawn.contains(&l));
        }
        let normal = SessionMode::from_config(ModeKind::Normal, &config).unwrap();
        assert_eq!(normal.draw_length(&mut rng), 10);
    }
}
