use std::io::{self, Write};

use recall_core::{GRID_CELLS, ModeKind};
use recall_experiment::{RetentionTask, SessionEvent};

const CLEAR: &str = "\x1b[2J\x1b[H";

/// Text presentation of session events.
pub struct Console<W: Write> {
    out: W,
    /// Wipe the screen when a stimulus is hidden. Off when output is not a terminal.
    clear_screen: bool,
}

impl<W: Write> Console<W> {
    pub fn new(out: W, clear_screen: bool) -> Self {
        Self { out, clear_screen }
    }

    pub fn banner(&mut self, mode: ModeKind, participant: Option<&str>, rounds: usize) -> io::Result<()> {
        writeln!(self.out, "=== SERIAL RECALL: {} ===", mode.label().to_uppercase())?;
        if let Some(p) = participant {
            writeln!(self.out, "Participant: {p}")?;
        }
        writeln!(self.out, "Rounds: {rounds}. Type q to quit.\n")?;
        self.out.flush()
    }

    pub fn show(&mut self, events: &[SessionEvent], progress: Option<(usize, usize)>) -> io::Result<()> {
        for event in events {
            self.show_one(event, progress)?;
        }
        self.out.flush()
    }

    pub fn message(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    pub fn prompt(&mut self) -> io::Result<()> {
        write!(self.out, "> ")?;
        self.out.flush()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn show_one(&mut self, event: &SessionEvent, progress: Option<(usize, usize)>) -> io::Result<()> {
        match event {
            SessionEvent::StimulusReady { stimulus, reveal_ms } => {
                if let Some((round, total)) = progress {
                    writeln!(self.out, "Round {round}/{total} ({reveal_ms} ms)")?;
                }
                writeln!(self.out, "    {stimulus}")?;
            }
            SessionEvent::StimulusHidden => {
                if self.clear_screen {
                    write!(self.out, "{CLEAR}")?;
                } else {
                    writeln!(self.out, "[hidden]")?;
                }
            }
            SessionEvent::CellHighlighted(cell) => self.grid(Some(*cell))?,
            SessionEvent::CellCleared(_) => self.grid(None)?,
            SessionEvent::AwaitingClicks { length } => {
                writeln!(self.out, "Enter the {length} cells in order, one per line (0-8):")?;
                self.grid_legend()?;
            }
            SessionEvent::ClickJudged { correct, done, mistakes, .. } => {
                let verdict = if *correct { "ok" } else { "wrong" };
                if *done {
                    writeln!(self.out, "{verdict}, pattern complete ({mistakes} mistakes)")?;
                } else {
                    writeln!(self.out, "{verdict}")?;
                }
            }
            SessionEvent::RetentionStarted { task, retention_ms } => match task {
                RetentionTask::Blank => {}
                RetentionTask::Suppression => writeln!(
                    self.out,
                    "Repeat \"tah-dah\" silently for {} s.",
                    retention_ms / 1000
                )?,
                RetentionTask::Tapping => writeln!(
                    self.out,
                    "Tap by pressing ENTER repeatedly for {} s.",
                    retention_ms / 1000
                )?,
            },
            SessionEvent::TapRequired => {
                writeln!(self.out, "Tap at least once to continue.")?;
            }
            SessionEvent::TapCounted { taps } => writeln!(self.out, "tap {taps}")?,
            SessionEvent::AwaitingResponse { slots, kind } => {
                writeln!(
                    self.out,
                    "Enter {slots} {kind} items separated by commas, leave a slot empty to skip:"
                )?;
            }
            SessionEvent::ScoreReady { feedback, .. } => writeln!(self.out, "{feedback}\n")?,
            SessionEvent::SessionFinished { mode, rounds, abandoned } => {
                let how = if *abandoned { "abandoned" } else { "complete" };
                writeln!(self.out, "{mode} session {how} after {rounds} rounds.")?;
            }
        }
        Ok(())
    }

    fn grid(&mut self, lit: Option<u8>) -> io::Result<()> {
        if self.clear_screen {
            write!(self.out, "{CLEAR}")?;
        }
        for row in 0..3 {
            let line: Vec<&str> = (0..3)
                .map(|col| if lit == Some(row * 3 + col) { "#" } else { "." })
                .collect();
            writeln!(self.out, "    {}", line.join(" "))?;
        }
        writeln!(self.out)
    }

    fn grid_legend(&mut self) -> io::Result<()> {
        for row in (0..GRID_CELLS).step_by(3) {
            writeln!(self.out, "    {} {} {}", row, row + 1, row + 2)?;
        }
        Ok(())
    }
}
