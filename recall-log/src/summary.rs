//! Offline statistics over a mode's CSV log.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use recall_core::{Item, ItemKind, Result};
use tracing::warn;

use crate::logger::read_rows;
use crate::row::CsvRow;

/// Descriptive statistics of `correct_numbers` across logged trials.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeSummary {
    pub trials: usize,
    pub mean: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Normal-approximation 95% interval of the mean.
    pub ci95: (f64, f64),
    pub wrong_first_rate: f64,
    pub wrong_last_rate: f64,
    /// Most frequent substitutions, at most [`TOP_SUBSTITUTIONS`].
    pub substitutions: Vec<Substitution>,
}

/// An item recalled in place of the one shown at that position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub given: Item,
    pub expected: Item,
    pub count: usize,
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instead of {}", self.given, self.expected)
    }
}

const Z_95: f64 = 1.96;
pub const TOP_SUBSTITUTIONS: usize = 10;

/// `None` when there are no rows.
pub fn summarize(rows: &[CsvRow]) -> Option<ModeSummary> {
    if rows.is_empty() {
        return None;
    }
    let n = rows.len() as f64;
    let mut values: Vec<f64> = rows.iter().map(|r| r.correct_numbers as f64).collect();
    values.sort_by(f64::total_cmp);

    let mean = values.iter().sum::<f64>() / n;
    let half_width = if rows.len() > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Z_95 * var.sqrt() / n.sqrt()
    } else {
        0.0
    };

    // rows without a first/last column don't count as wrong
    let rate = |f: fn(&CsvRow) -> Option<u8>| {
        rows.iter().filter(|r| f(r) == Some(1)).count() as f64 / n
    };

    Some(ModeSummary {
        trials: rows.len(),
        mean,
        q1: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q3: quantile(&values, 0.75),
        ci95: (mean - half_width, mean + half_width),
        wrong_first_rate: rate(|r| r.first_wrong),
        wrong_last_rate: rate(|r| r.last_wrong),
        substitutions: substitution_errors(rows, TOP_SUBSTITUTIONS),
    })
}

/// Counts positions where a filled response slot differs from the stimulus, most frequent first.
///
/// Word lists are skipped. Ties are broken by item order so the ranking is stable.
pub fn substitution_errors(rows: &[CsvRow], top: usize) -> Vec<Substitution> {
    let mut counts: HashMap<(Item, Item), usize> = HashMap::new();
    for row in rows {
        if matches!(row.kind(), Ok(ItemKind::Word)) {
            continue;
        }
        let (stimulus, slots) = match (row.stimulus(), row.response_slots()) {
            (Ok(stimulus), Ok(slots)) => (stimulus, slots),
            (Err(e), _) | (_, Err(e)) => {
                warn!(attempt = row.attempt, error = %e, "skipping undecodable row");
                continue;
            }
        };
        for (expected, given) in stimulus.items().iter().zip(&slots) {
            if let Some(given) = given.as_ref().filter(|g| *g != expected) {
                *counts.entry((given.clone(), expected.clone())).or_default() += 1;
            }
        }
    }
    let mut ranked: Vec<Substitution> = counts
        .into_iter()
        .map(|((given, expected), count)| Substitution {
            given,
            expected,
            count,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| (&a.given, &a.expected).cmp(&(&b.given, &b.expected)))
    });
    ranked.truncate(top);
    ranked
}

pub fn summarize_file(path: &Path) -> Result<Option<ModeSummary>> {
    Ok(summarize(&read_rows(path)?))
}

/// Linear interpolation between closest ranks. `sorted` must be non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

impl fmt::Display for ModeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "trials:          {}", self.trials)?;
        writeln!(f, "mean correct:    {:.2}", self.mean)?;
        writeln!(
            f,
            "quartiles:       {:.2} / {:.2} / {:.2}",
            self.q1, self.median, self.q3
        )?;
        writeln!(f, "95% CI:          [{:.2}, {:.2}]", self.ci95.0, self.ci95.1)?;
        writeln!(f, "wrong first:     {:.1}%", self.wrong_first_rate * 100.0)?;
        write!(f, "wrong last:      {:.1}%", self.wrong_last_rate * 100.0)?;
        if !self.substitutions.is_empty() {
            write!(f, "\ntop substitutions:")?;
            for (rank, sub) in self.substitutions.iter().enumerate() {
                write!(f, "\n  {:>2}. {sub} ({})", rank + 1, sub.count)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(correct: usize, first_wrong: Option<u8>) -> CsvRow {
        CsvRow {
            timestamp: String::new(),
            participant: String::new(),
            attempt: 1,
            mode: "normal".into(),
            round: 1,
            item_kind: "number".into(),
            serial: String::new(),
            user_input: String::new(),
            policy: "first_last".into(),
            correct_positions: correct,
            correct_numbers: correct,
            wrong_numbers: 10 - correct,
            first_wrong,
            last_wrong: Some(0),
            all_or_nothing: 0,
            completion_rate: String::new(),
            pattern_mistakes: None,
            cumulative_wrong_first: 0,
            cumulative_wrong_last: 0,
            cumulative_wrong_numbers: 0,
            cumulative_correct_numbers: 0,
            recall_time_ms: None,
            input_time_seconds: String::new(),
            speed_ms: None,
            taps: None,
        }
    }

    fn recalled(kind: &str, serial: &str, user_input: &str) -> CsvRow {
        CsvRow {
            item_kind: kind.into(),
            serial: serial.into(),
            user_input: user_input.into(),
            ..row(0, None)
        }
    }

    #[test]
    fn empty_log_has_no_summary() {
        assert_eq!(summarize(&[]), None);
    }

    #[test]
    fn quartiles_interpolate() {
        let rows: Vec<_> = [4, 2, 8, 6].iter().map(|&c| row(c, Some(0))).collect();
        let s = summarize(&rows).unwrap();
        assert_eq!(s.trials, 4);
        assert_eq!(s.mean, 5.0);
        assert_eq!(s.median, 5.0);
        assert_eq!(s.q1, 3.5);
        assert_eq!(s.q3, 6.5);
        assert!(s.ci95.0 < 5.0 && s.ci95.1 > 5.0);
    }

    #[test]
    fn single_trial_has_zero_width_interval() {
        let s = summarize(&[row(7, Some(1))]).unwrap();
        assert_eq!(s.ci95, (7.0, 7.0));
        assert_eq!(s.wrong_first_rate, 1.0);
        assert_eq!(s.wrong_last_rate, 0.0);
    }

    #[test]
    fn missing_first_column_is_not_wrong() {
        let s = summarize(&[row(3, None), row(3, Some(1))]).unwrap();
        assert_eq!(s.wrong_first_rate, 0.5);
    }

    #[test]
    fn substitutions_are_ranked_by_count() {
        let rows = vec![
            recalled("letter", "|B||K||R|", "|B||X||F|"),
            recalled("letter", "|K||R|", "|X||F||Z|"),
            recalled("letter", "|B||K|", "|||K|"),
            recalled("number", "|3||4|", "|4||4|"),
        ];
        let subs = substitution_errors(&rows, 10);
        let named: Vec<(String, usize)> = subs.iter().map(|s| (s.to_string(), s.count)).collect();
        assert_eq!(
            named,
            [
                ("F instead of R".to_string(), 2),
                ("X instead of K".to_string(), 2),
                ("4 instead of 3".to_string(), 1),
            ]
        );
        assert_eq!(substitution_errors(&rows, 1).len(), 1);
    }

    #[test]
    fn word_lists_and_broken_rows_have_no_substitutions() {
        let rows = vec![
            recalled("word", "|CAT||DOG|", "|DOG||CAT|"),
            recalled("letter", "|B|||", "|C|"),
            recalled("colour", "|B|", "|C|"),
        ];
        assert!(substitution_errors(&rows, 10).is_empty());
    }

    #[test]
    fn summary_lists_top_substitutions() {
        let rows = vec![recalled("letter", "|B||K|", "|B||X|")];
        let s = summarize(&rows).unwrap();
        assert_eq!(s.substitutions.len(), 1);
        assert!(s.to_string().ends_with("top substitutions:\n   1. X instead of K (1)"));
    }
}
