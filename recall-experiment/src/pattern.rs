//! Grid-click sub-engine for pattern mode.
//!
//! Instead of batch-scoring a whole response, the engine follows a cursor through the
//! generated cell sequence and counts wrong clicks. A wrong click never advances the cursor.

use rand::Rng;
use recall_core::{GRID_CELLS, Item, RecallError, Result, Stimulus};

use crate::generator::{StimulusMode, generate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatternState {
    #[default]
    Idle,
    AwaitingClick,
    RoundComplete,
}

impl std::fmt::Display for PatternState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PatternState::Idle => "pattern idle",
            PatternState::AwaitingClick => "pattern awaiting click",
            PatternState::RoundComplete => "pattern round complete",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickOutcome {
    pub correct: bool,
    pub done: bool,
}

#[derive(Debug)]
pub struct PatternEngine<R: Rng> {
    rng: R,
    sequence: Vec<u8>,
    cursor: usize,
    mistakes: u32,
    state: PatternState,
}

impl<R: Rng> PatternEngine<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            sequence: Vec::new(),
            cursor: 0,
            mistakes: 0,
            state: PatternState::Idle,
        }
    }

    /// Starts a fresh round from any state and returns the cells to reveal.
    pub fn new_round(&mut self, length: usize) -> Result<&[u8]> {
        let stimulus = generate(&mut self.rng, StimulusMode::Grid, length)?;
        self.sequence = stimulus
            .items()
            .iter()
            .filter_map(|item| match item {
                Item::Cell(i) => Some(*i),
                _ => None,
            })
            .collect();
        self.cursor = 0;
        self.mistakes = 0;
        self.state = PatternState::AwaitingClick;
        Ok(&self.sequence)
    }

    pub fn submit_click(&mut self, index: usize) -> Result<ClickOutcome> {
        if self.state != PatternState::AwaitingClick {
            return Err(RecallError::illegal("submit_click", self.state));
        }
        if index >= GRID_CELLS as usize {
            return Err(RecallError::invalid(format!(
                "grid index {index} outside 0..={}",
                GRID_CELLS - 1
            )));
        }
        if self.sequence[self.cursor] as usize != index {
            self.mistakes += 1;
            return Ok(ClickOutcome {
                correct: false,
                done: false,
            });
        }
        self.cursor += 1;
        let done = self.cursor == self.sequence.len();
        if done {
            self.state = PatternState::RoundComplete;
        }
        Ok(ClickOutcome {
            correct: true,
            done,
        })
    }

    /// Next cell the participant must click, `None` outside an active round.
    pub fn expected_index(&self) -> Option<u8> {
        match self.state {
            PatternState::AwaitingClick => self.sequence.get(self.cursor).copied(),
            _ => None,
        }
    }

    /// `(cursor, length)`.
    pub fn progress(&self) -> (usize, usize) {
        (self.cursor, self.sequence.len())
    }

    pub fn mistakes(&self) -> u32 {
        self.mistakes
    }

    pub fn state(&self) -> PatternState {
        self.state
    }

    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    pub fn stimulus(&self) -> Stimulus {
        Stimulus::new(
            recall_core::ItemKind::Cell,
            self.sequence.iter().map(|i| Item::Cell(*i)).collect(),
        )
    }
}
