use recall_core::{Item, ItemKind, Result, Stimulus, TrialRecord};
use serde::{Deserialize, Serialize};

use crate::codec;

/// One line of a per-mode CSV log.
///
/// Column order is the header order. Optional values serialize as empty cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    pub timestamp: String,
    pub participant: String,
    pub attempt: u64,
    pub mode: String,
    pub round: usize,
    pub item_kind: String,
    pub serial: String,
    pub user_input: String,
    pub policy: String,
    pub correct_positions: usize,
    pub correct_numbers: usize,
    pub wrong_numbers: usize,
    pub first_wrong: Option<u8>,
    pub last_wrong: Option<u8>,
    pub all_or_nothing: u8,
    pub completion_rate: String,
    pub pattern_mistakes: Option<u32>,
    pub cumulative_wrong_first: u64,
    pub cumulative_wrong_last: u64,
    pub cumulative_wrong_numbers: u64,
    pub cumulative_correct_numbers: u64,
    pub recall_time_ms: Option<u64>,
    pub input_time_seconds: String,
    pub speed_ms: Option<u64>,
    pub taps: Option<u32>,
}

impl From<&TrialRecord> for CsvRow {
    fn from(r: &TrialRecord) -> Self {
        let score = &r.score;
        Self {
            timestamp: r.timestamp.to_rfc3339(),
            participant: r.participant.clone().unwrap_or_default(),
            attempt: r.attempt,
            mode: r.mode.label().to_string(),
            round: r.round,
            item_kind: r.stimulus.kind().to_string(),
            serial: codec::encode_items(r.stimulus.items()),
            user_input: codec::encode_slots(r.response.slots()),
            policy: score.policy.label().to_string(),
            correct_positions: score.correct_positions,
            correct_numbers: score.correct_numbers,
            wrong_numbers: score.wrong_numbers,
            first_wrong: score.first_correct.map(|ok| u8::from(!ok)),
            last_wrong: score.last_correct.map(|ok| u8::from(!ok)),
            all_or_nothing: u8::from(score.all_or_nothing),
            completion_rate: finite_or_blank(score.completion_rate),
            pattern_mistakes: score.pattern_mistakes,
            cumulative_wrong_first: r.totals.wrong_first,
            cumulative_wrong_last: r.totals.wrong_last,
            cumulative_wrong_numbers: r.totals.wrong_numbers,
            cumulative_correct_numbers: r.totals.correct_numbers,
            recall_time_ms: r.reveal_ms,
            input_time_seconds: r.input_secs.map(finite_or_blank).unwrap_or_default(),
            speed_ms: r.speed_ms,
            taps: r.taps,
        }
    }
}

/// A value that cannot be represented is logged blank instead of failing the row.
fn finite_or_blank(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.3}")
    } else {
        String::new()
    }
}

impl CsvRow {
    pub fn kind(&self) -> Result<ItemKind> {
        self.item_kind.parse()
    }

    pub fn stimulus(&self) -> Result<Stimulus> {
        codec::decode_stimulus(self.kind()?, &self.serial)
    }

    pub fn response_slots(&self) -> Result<Vec<Option<Item>>> {
        Ok(codec::decode_slots(self.kind()?, &self.user_input))
    }
}
