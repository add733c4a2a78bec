use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};
use rand::rngs::StdRng;
use recall_core::{ModeKind, RecallError, SessionPhase};
use recall_experiment::{RetentionTask, SessionEvent, SessionMachine};
use recall_log::ResultLogger;
use recall_timing::Timer;
use tracing::warn;

use crate::console::Console;

/// Console driver: sleeps through timed phases and feeds typed lines to the machine.
pub struct App<T: Timer, I: BufRead, W: Write> {
    machine: SessionMachine<T, StdRng, ResultLogger>,
    console: Console<W>,
    input: I,
}

impl<T: Timer, I: BufRead, W: Write> App<T, I, W> {
    pub fn new(machine: SessionMachine<T, StdRng, ResultLogger>, console: Console<W>, input: I) -> Self {
        Self {
            machine,
            console,
            input,
        }
    }

    /// Runs one session to the end. End of input abandons it.
    pub fn run(&mut self, mode: ModeKind) -> Result<()> {
        let events = self.machine.start_session(mode)?;
        let rounds = self.machine.progress().map_or(0, |(_, total)| total);
        self.console.banner(mode, self.machine.participant(), rounds)?;
        self.present(&events)?;

        while self.machine.phase() != SessionPhase::Finished {
            let events = match self.machine.phase() {
                SessionPhase::AwaitingResponse => match self.read_line()? {
                    Some(line) => self
                        .machine
                        .submit_response(&split_slots(&line))
                        .context("saving trial result")?,
                    None => self.machine.abandon(),
                },
                // clicks are taken until the round completes and the hand-off is armed
                SessionPhase::PatternEntry if self.machine.next_deadline().is_none() => {
                    match self.read_line()? {
                        Some(line) => self.click(&line)?,
                        None => self.machine.abandon(),
                    }
                }
                SessionPhase::Retention if self.taps_wanted() => match self.read_line()? {
                    Some(_) => self.tap()?,
                    None => self.machine.abandon(),
                },
                _ => self.wait()?,
            };
            self.present(&events)?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn machine(&self) -> &SessionMachine<T, StdRng, ResultLogger> {
        &self.machine
    }

    #[cfg(test)]
    pub fn into_console(self) -> Console<W> {
        self.console
    }

    fn wait(&mut self) -> Result<Vec<SessionEvent>> {
        let Some(remaining) = self.machine.next_deadline() else {
            bail!("session stalled while {}", self.machine.phase());
        };
        self.machine.timer().sleep(remaining);
        Ok(self.machine.update()?)
    }

    fn taps_wanted(&self) -> bool {
        self.machine
            .mode()
            .and_then(|m| m.retention())
            .is_some_and(|(task, _)| task == RetentionTask::Tapping)
    }

    /// Every line is a tap. Cues that fell due meanwhile fire afterwards.
    fn tap(&mut self) -> Result<Vec<SessionEvent>> {
        let mut events = self.machine.submit_tap()?;
        events.extend(self.machine.update()?);
        Ok(events)
    }

    fn click(&mut self, line: &str) -> Result<Vec<SessionEvent>> {
        let Ok(index) = line.trim().parse::<usize>() else {
            self.console.message(&format!("'{}' is not a cell number", line.trim()))?;
            return Ok(Vec::new());
        };
        match self.machine.submit_click(index) {
            Ok(events) => Ok(events),
            Err(RecallError::InvalidArgument(msg)) => {
                warn!(%msg, "click rejected");
                self.console.message(&msg)?;
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// `None` on end of input or `q`.
    fn read_line(&mut self) -> Result<Option<String>> {
        self.console.prompt()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        if line.trim().eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn present(&mut self, events: &[SessionEvent]) -> Result<()> {
        self.console.show(events, self.machine.progress())?;
        Ok(())
    }
}

/// Comma-separated slots keep empty positions; without commas, whitespace separates.
fn split_slots(line: &str) -> Vec<&str> {
    if line.trim().is_empty() {
        Vec::new()
    } else if line.contains(',') {
        line.split(',').map(str::trim).collect()
    } else {
        line.split_whitespace().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use recall_experiment::ExperimentConfig;
    use recall_timing::ManualTimer;
    use std::io::{self, Cursor, Read};
    use std::time::Duration;

    fn app(
        config: ExperimentConfig,
        log: ResultLogger,
        input: &str,
    ) -> App<ManualTimer, Cursor<Vec<u8>>, Vec<u8>> {
        let machine =
            SessionMachine::new(config, ManualTimer::new(), StdRng::seed_from_u64(3), log)
                .with_participant("P001");
        App::new(
            machine,
            Console::new(Vec::new(), false),
            Cursor::new(input.as_bytes().to_vec()),
        )
    }

    #[test]
    fn slots_split_on_commas_first() {
        assert_eq!(split_slots("12, ,5"), vec!["12", "", "5"]);
        assert_eq!(split_slots("cat dog"), vec!["cat", "dog"]);
        assert!(split_slots("   ").is_empty());
    }

    #[test]
    fn scripted_normal_session_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ExperimentConfig::default();
        config.normal.rounds = 2;
        config.normal.digits = 3;
        let log = ResultLogger::csv(dir.path()).unwrap();

        let mut app = app(config, log, "1,2,3\n\n");
        app.run(ModeKind::Normal).unwrap();
        assert_eq!(app.machine().phase(), SessionPhase::Finished);

        let text = std::fs::read_to_string(dir.path().join("normal_log.csv")).unwrap();
        assert_eq!(text.lines().count(), 3);
        let out = String::from_utf8(app.into_console().into_inner()).unwrap();
        assert!(out.contains("Round 2/2 (5000 ms)"));
        assert!(out.contains("normal session complete after 2 rounds."));
    }

    #[test]
    fn end_of_input_abandons() {
        let mut app = app(ExperimentConfig::default(), ResultLogger::in_memory(), "4,5\n");
        app.run(ModeKind::Speed).unwrap();
        assert_eq!(app.machine().sink().records().len(), 1);
        let out = String::from_utf8(app.into_console().into_inner()).unwrap();
        assert!(out.contains("speed session abandoned after 1 rounds."));
    }

    #[test]
    fn pattern_session_reads_clicks() {
        let mut config = ExperimentConfig::default();
        config.pattern.rounds = 1;
        config.pattern.grid_length = 1;
        // the grid sequence is not known up front, so try every cell
        let mut input = String::from("x\n9\n");
        for cell in 0..9 {
            input.push_str(&format!("{cell}\n"));
        }
        input.push_str("1,2\n");
        let mut app = app(config, ResultLogger::in_memory(), &input);
        app.run(ModeKind::Pattern).unwrap();

        let records = app.machine().sink().records();
        assert_eq!(records.len(), 1);
        let mistakes = records[0].score.pattern_mistakes.unwrap();
        assert!(mistakes < 9);
        let out = String::from_utf8(app.into_console().into_inner()).unwrap();
        assert!(out.contains("'x' is not a cell number"));
        assert!(out.contains("pattern complete"));
    }

    /// Scripted input where every line takes `per_line` on the session clock.
    struct TimedInput {
        lines: Cursor<Vec<u8>>,
        timer: ManualTimer,
        per_line: Duration,
    }

    impl Read for TimedInput {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.lines.read(buf)
        }
    }

    impl BufRead for TimedInput {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            self.lines.fill_buf()
        }

        fn consume(&mut self, amt: usize) {
            let newlines = self.lines.fill_buf().map_or(0, |buf| {
                buf[..amt.min(buf.len())].iter().filter(|&&b| b == b'\n').count()
            });
            self.lines.consume(amt);
            for _ in 0..newlines {
                self.timer.advance(self.per_line);
            }
        }
    }

    #[test]
    fn tapping_session_counts_enter_presses() {
        let mut config = ExperimentConfig::default();
        config.free_recall.trials = 1;
        config.free_recall.list_lengths = vec![4];
        let timer = ManualTimer::new();
        let machine = SessionMachine::new(
            config,
            timer.clone(),
            StdRng::seed_from_u64(3),
            ResultLogger::in_memory(),
        );
        let input = TimedInput {
            lines: Cursor::new(b"\n\n\nB,C,D,F\n".to_vec()),
            timer,
            per_line: Duration::from_secs(4),
        };
        let mut app = App::new(machine, Console::new(Vec::new(), false), input);
        app.run(ModeKind::Tapping).unwrap();

        // retention opens at 4 s and closes at 14 s; the third tap lands at 16 s
        let records = app.machine().sink().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].taps, Some(3));
        let out = String::from_utf8(app.into_console().into_inner()).unwrap();
        assert!(out.contains("Tap by pressing ENTER repeatedly for 10 s."));
        assert!(out.contains("tap 3"));
        assert!(out.contains("tapping session complete after 1 rounds."));
    }

    #[test]
    fn suppression_session_sleeps_through_retention() {
        let mut config = ExperimentConfig::default();
        config.free_recall.trials = 1;
        config.free_recall.list_lengths = vec![3];
        let mut app = app(config, ResultLogger::in_memory(), "B,C,D\n");
        app.run(ModeKind::Suppression).unwrap();

        assert_eq!(app.machine().sink().records().len(), 1);
        let out = String::from_utf8(app.into_console().into_inner()).unwrap();
        assert!(out.contains("Repeat \"tah-dah\" silently for 10 s."));
    }
}
