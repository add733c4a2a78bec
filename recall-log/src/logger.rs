//! Result logger: per-mode CSV files plus running totals.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use recall_core::{ModeKind, Result, SessionCounters, TrialRecord, TrialSink};
use tracing::{debug, info};

use crate::row::CsvRow;

#[derive(Debug)]
enum Backend {
    Csv { dir: PathBuf },
    Memory { records: Vec<TrialRecord> },
}

/// Appends one record per completed trial and keeps per-mode [`SessionCounters`].
///
/// Totals live as long as the logger. A fresh logger or [`ResultLogger::reset_totals`]
/// marks a session boundary.
#[derive(Debug)]
pub struct ResultLogger {
    backend: Backend,
    totals: HashMap<ModeKind, SessionCounters>,
}

impl ResultLogger {
    /// Logs to `<dir>/<mode>_log.csv`, creating `dir` if needed.
    pub fn csv(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), "logging trials to csv");
        Ok(Self {
            backend: Backend::Csv { dir },
            totals: HashMap::new(),
        })
    }

    /// Keeps records in memory only.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory {
                records: Vec::new(),
            },
            totals: HashMap::new(),
        }
    }

    pub fn log_path(&self, mode: ModeKind) -> Option<PathBuf> {
        match &self.backend {
            Backend::Csv { dir } => Some(log_path(dir, mode)),
            Backend::Memory { .. } => None,
        }
    }

    pub fn get_totals(&self, mode: ModeKind) -> SessionCounters {
        self.totals.get(&mode).copied().unwrap_or_default()
    }

    pub fn reset_totals(&mut self, mode: ModeKind) {
        self.totals.remove(&mode);
    }

    /// Records held by the in-memory backend. Empty for CSV logging.
    pub fn records(&self) -> &[TrialRecord] {
        match &self.backend {
            Backend::Memory { records } => records,
            Backend::Csv { .. } => &[],
        }
    }
}

impl TrialSink for ResultLogger {
    fn record(&mut self, mut record: TrialRecord) -> Result<()> {
        let mut totals = self.get_totals(record.mode);
        totals.absorb(&record.score);
        record.totals = totals;

        match &mut self.backend {
            Backend::Csv { dir } => append_row(&log_path(dir, record.mode), &CsvRow::from(&record))?,
            Backend::Memory { records } => records.push(record.clone()),
        }
        // only count what was actually stored
        self.totals.insert(record.mode, totals);
        debug!(
            mode = %record.mode,
            attempt = record.attempt,
            cumulative_correct = totals.correct_numbers,
            "trial recorded"
        );
        Ok(())
    }
}

pub fn log_path(dir: &Path, mode: ModeKind) -> PathBuf {
    dir.join(format!("{}_log.csv", mode.label()))
}

fn append_row(path: &Path, row: &CsvRow) -> Result<()> {
    let needs_header = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);
    writer.serialize(row).map_err(io::Error::from)?;
    writer.flush()?;
    Ok(())
}

/// Reads every row of a per-mode log.
pub fn read_rows(path: &Path) -> Result<Vec<CsvRow>> {
    let mut reader = csv::Reader::from_path(path).map_err(io::Error::from)?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<CsvRow>, csv::Error>>()
        .map_err(io::Error::from)?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use recall_core::{Item, ItemKind, Response, ScoreResult, ScoringPolicy, Stimulus};

    fn record(mode: ModeKind, correct: usize) -> TrialRecord {
        let stimulus = Stimulus::new(
            ItemKind::Number,
            vec![Item::Number(1), Item::Number(2), Item::Number(3)],
        );
        TrialRecord {
            timestamp: Utc::now(),
            participant: Some("P001".into()),
            attempt: 1,
            round: 1,
            mode,
            stimulus,
            response: Response::new(vec![Some(Item::Number(1)), None, Some(Item::Number(9))]),
            score: ScoreResult {
                policy: ScoringPolicy::FirstLast,
                length: 3,
                correct_positions: correct,
                correct_numbers: correct,
                wrong_numbers: 3 - correct,
                first_correct: Some(true),
                last_correct: Some(false),
                all_or_nothing: false,
                completion_rate: 2.0 / 3.0,
                pattern_mistakes: None,
            },
            totals: SessionCounters::default(),
            reveal_ms: Some(5000),
            input_secs: Some(1.25),
            speed_ms: None,
            taps: None,
        }
    }

    #[test]
    fn totals_are_scoped_per_mode() {
        let mut logger = ResultLogger::in_memory();
        logger.record(record(ModeKind::Normal, 1)).unwrap();
        logger.record(record(ModeKind::Normal, 2)).unwrap();
        logger.record(record(ModeKind::Speed, 1)).unwrap();

        let normal = logger.get_totals(ModeKind::Normal);
        assert_eq!(normal.trials, 2);
        assert_eq!(normal.correct_numbers, 3);
        assert_eq!(normal.wrong_last, 2);
        assert_eq!(normal.wrong_first, 0);
        assert_eq!(logger.get_totals(ModeKind::Speed).trials, 1);
        assert_eq!(logger.get_totals(ModeKind::Pattern), SessionCounters::default());

        // stored snapshot includes the trial itself
        assert_eq!(logger.records()[1].totals, normal);
    }

    #[test]
    fn reset_clears_one_mode() {
        let mut logger = ResultLogger::in_memory();
        logger.record(record(ModeKind::Normal, 1)).unwrap();
        logger.record(record(ModeKind::Speed, 1)).unwrap();
        logger.reset_totals(ModeKind::Normal);
        assert_eq!(logger.get_totals(ModeKind::Normal), SessionCounters::default());
        assert_eq!(logger.get_totals(ModeKind::Speed).trials, 1);
    }

    #[test]
    fn csv_gets_one_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = ResultLogger::csv(dir.path()).unwrap();
        logger.record(record(ModeKind::Normal, 1)).unwrap();
        logger.record(record(ModeKind::Normal, 2)).unwrap();

        let path = logger.log_path(ModeKind::Normal).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.starts_with("timestamp,participant,attempt,mode"));

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows[1].cumulative_correct_numbers, 3);
        assert_eq!(rows[0].first_wrong, Some(0));
        assert_eq!(rows[0].last_wrong, Some(1));
        assert_eq!(rows[0].completion_rate, "0.667");
        assert_eq!(rows[0].input_time_seconds, "1.250");
        assert_eq!(rows[0].speed_ms, None);
        assert_eq!(rows[0].taps, None);
        assert_eq!(rows[0].policy, "first_last");
        assert_eq!(rows[0].user_input, "|1||||9|");
    }

    #[test]
    fn unwritable_storage_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = ResultLogger::csv(dir.path()).unwrap();
        // a directory where the log file should be
        std::fs::create_dir(logger.log_path(ModeKind::Normal).unwrap()).unwrap();
        let err = logger.record(record(ModeKind::Normal, 1)).unwrap_err();
        assert!(err.is_session_fatal());
        assert_eq!(logger.get_totals(ModeKind::Normal).trials, 0);
    }
}
