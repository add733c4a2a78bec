use std::time::Duration;

use chrono::Utc;
use rand::{Rng, SeedableRng};
use recall_core::{
    ItemKind, ModeKind, RecallError, Response, Result, ScoreResult, SessionPhase, Stimulus,
    TrialRecord, TrialSink,
};
use recall_timing::{Alarm, Timer};
use tracing::{debug, error, info, warn};

use super::config::ExperimentConfig;
use super::generator::generate;
use super::mode::{RetentionTask, SessionMode};
use super::pattern::PatternEngine;
use super::scorer;

/// What the presentation layer should show next
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StimulusReady { stimulus: Stimulus, reveal_ms: u64 },
    StimulusHidden,
    CellHighlighted(u8),
    CellCleared(u8),
    AwaitingClicks { length: usize },
    ClickJudged {
        index: u8,
        correct: bool,
        done: bool,
        mistakes: u32,
    },
    RetentionStarted { task: RetentionTask, retention_ms: u64 },
    /// Retention ran out in tapping mode before any tap.
    TapRequired,
    TapCounted { taps: u32 },
    AwaitingResponse { slots: usize, kind: ItemKind },
    ScoreReady { score: ScoreResult, feedback: String },
    SessionFinished {
        mode: ModeKind,
        rounds: usize,
        abandoned: bool,
    },
}

/// Timer cues; at most one is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cue {
    EndReveal,
    /// Turn off the cell lit at this step.
    CellOff(usize),
    /// Light the cell at this step, or open clicking once past the end.
    CellOn(usize),
    HandOff,
    EndRetention,
    /// Tapping mode waiting for its first tap.
    TapCheck,
    NextRound,
}

#[derive(Debug)]
struct ActiveTrial {
    stimulus: Stimulus,
    reveal_ms: u64,
    input_from: Option<u64>,
    pattern_mistakes: Option<u32>,
    /// `Some` only in tapping mode.
    taps: Option<u32>,
}

/// Drives sessions: generate, reveal, collect, score, record, repeat.
///
/// Single-threaded and timer-driven. The machine never sleeps; the presentation layer calls
/// [`SessionMachine::update`] whenever it likes (a frame tick, or after waiting
/// [`SessionMachine::next_deadline`]) and forwards user actions as they happen.
pub struct SessionMachine<T, R, S>
where
    T: Timer,
    R: Rng + SeedableRng,
    S: TrialSink,
{
    config: ExperimentConfig,
    timer: T,
    rng: R,
    sink: S,
    pattern: PatternEngine<R>,
    phase: SessionPhase,
    mode: Option<SessionMode>,
    /// Completed rounds in the current session.
    round: usize,
    attempt: u64,
    current: Option<ActiveTrial>,
    alarm: Alarm<Cue>,
    participant: Option<String>,
    /// Events produced on a failing path, handed out by the next `update`.
    outbox: Vec<SessionEvent>,
}

impl<T, R, S> SessionMachine<T, R, S>
where
    T: Timer,
    R: Rng + SeedableRng,
    S: TrialSink,
{
    pub fn new(config: ExperimentConfig, timer: T, mut rng: R, sink: S) -> Self {
        let pattern = PatternEngine::new(R::from_rng(&mut rng));
        Self {
            config,
            timer,
            rng,
            sink,
            pattern,
            phase: SessionPhase::Configuring,
            mode: None,
            round: 0,
            attempt: 0,
            current: None,
            alarm: Alarm::new(),
            participant: None,
            outbox: Vec::new(),
        }
    }

    pub fn with_participant(mut self, participant: impl Into<String>) -> Self {
        self.participant = Some(participant.into());
        self
    }

    pub fn start_session(&mut self, kind: ModeKind) -> Result<Vec<SessionEvent>> {
        if !self.phase.accepts_start() {
            return Err(RecallError::illegal("start_session", self.phase));
        }
        let mode = SessionMode::from_config(kind, &self.config)?;
        info!(
            mode = %kind,
            rounds = mode.total_rounds(),
            participant = self.participant.as_deref().unwrap_or("-"),
            "session started"
        );
        self.mode = Some(mode);
        self.round = 0;
        self.current = None;
        self.alarm.cancel();
        self.outbox.clear();

        let mut events = Vec::new();
        self.begin_round(&mut events)?;
        Ok(events)
    }

    /// Fires whatever timer cue is due.
    pub fn update(&mut self) -> Result<Vec<SessionEvent>> {
        let mut events = std::mem::take(&mut self.outbox);
        let now = self.timer.now();
        while let Some(cue) = self.alarm.poll(now) {
            self.on_cue(cue, now, &mut events)?;
        }
        Ok(events)
    }

    /// Submits the typed response slots. Unparseable slots become empty.
    pub fn submit_response<Slot: AsRef<str>>(&mut self, raw: &[Slot]) -> Result<Vec<SessionEvent>> {
        if !self.phase.allows_response() {
            return Err(RecallError::illegal("submit_response", self.phase));
        }
        let (Some(trial), Some(mode)) = (self.current.take(), self.mode.as_ref()) else {
            return Err(RecallError::illegal("submit_response", self.phase));
        };
        let kind = mode.kind();
        let policy = mode.policy();
        self.enter(SessionPhase::Scoring);

        let (response, coerced) = Response::parse(trial.stimulus.kind(), raw);
        if coerced > 0 {
            warn!(coerced, "unparseable response slots treated as empty");
        }
        let response = response.padded(trial.stimulus.len());
        let mut score = scorer::score(&trial.stimulus, &response, policy);
        score.pattern_mistakes = trial.pattern_mistakes;

        let attempt = self.attempt + 1;
        let now = self.timer.now();
        let record = TrialRecord {
            timestamp: Utc::now(),
            participant: self.participant.clone(),
            attempt,
            round: self.round + 1,
            mode: kind,
            stimulus: trial.stimulus,
            response,
            score: score.clone(),
            totals: Default::default(),
            reveal_ms: Some(trial.reveal_ms),
            input_secs: trial
                .input_from
                .map(|from| now.saturating_sub(from) as f64 / 1e9),
            speed_ms: (kind == ModeKind::Speed).then_some(trial.reveal_ms),
            taps: trial.taps,
        };
        if let Err(e) = self.sink.record(record) {
            error!(error = %e, mode = %kind, "could not record trial, ending session");
            let mut finished = Vec::new();
            self.finish(true, &mut finished);
            self.outbox = finished;
            return Err(e);
        }
        self.attempt = attempt;

        let feedback = scorer::feedback(&score);
        debug!(
            round = self.round + 1,
            correct = score.correct_numbers,
            positions = score.correct_positions,
            %feedback,
            "trial scored"
        );
        let mut events = vec![SessionEvent::ScoreReady { score, feedback }];

        self.round += 1;
        let more = self.mode.as_ref().is_some_and(|m| m.has_round(self.round));
        if more {
            self.enter(SessionPhase::Delay);
            self.alarm.arm(
                now,
                Duration::from_millis(self.config.feedback_delay_ms),
                Cue::NextRound,
            );
        } else {
            self.finish(false, &mut events);
        }
        Ok(events)
    }

    /// Forwards a grid click during pattern entry.
    pub fn submit_click(&mut self, index: usize) -> Result<Vec<SessionEvent>> {
        if !self.phase.allows_click() {
            return Err(RecallError::illegal("submit_click", self.phase));
        }
        let outcome = self.pattern.submit_click(index)?;
        let mistakes = self.pattern.mistakes();
        let mut events = vec![SessionEvent::ClickJudged {
            index: index as u8,
            correct: outcome.correct,
            done: outcome.done,
            mistakes,
        }];
        if outcome.done {
            debug!(mistakes, "pattern round complete");
            if let Some(trial) = self.current.as_mut() {
                trial.pattern_mistakes = Some(mistakes);
            }
            let handoff = self.mode.as_ref().and_then(|m| m.grid()).map_or(0, |g| g.handoff_ms);
            let now = self.timer.now();
            self.alarm
                .arm(now, Duration::from_millis(handoff), Cue::HandOff);
            // a zero hand-off goes straight to entry
            if handoff == 0 {
                events.extend(self.update()?);
            }
        }
        Ok(events)
    }

    /// Counts a tap during the retention interval of tapping mode.
    pub fn submit_tap(&mut self) -> Result<Vec<SessionEvent>> {
        let taps = match self.current.as_mut() {
            Some(ActiveTrial {
                taps: Some(taps), ..
            }) if self.phase.allows_tap() => {
                *taps += 1;
                *taps
            }
            _ => return Err(RecallError::illegal("submit_tap", self.phase)),
        };
        Ok(vec![SessionEvent::TapCounted { taps }])
    }

    /// Ends the running session at once. The in-flight trial is dropped unrecorded.
    pub fn abandon(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.phase.is_running() {
            info!(round = self.round, "session abandoned");
            self.finish(true, &mut events);
        }
        events
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn participant(&self) -> Option<&str> {
        self.participant.as_deref()
    }

    pub fn mode(&self) -> Option<&SessionMode> {
        self.mode.as_ref()
    }

    pub fn current_stimulus(&self) -> Option<&Stimulus> {
        self.current.as_ref().map(|t| &t.stimulus)
    }

    /// `(current round, total rounds)`, 1-based.
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.mode.as_ref().map(|m| {
            let total = m.total_rounds();
            ((self.round + 1).min(total), total)
        })
    }

    /// Time until the pending timer cue, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.alarm.remaining(self.timer.now())
    }

    pub fn expected_cell(&self) -> Option<u8> {
        if self.phase.allows_click() {
            self.pattern.expected_index()
        } else {
            None
        }
    }

    pub fn pattern(&self) -> &PatternEngine<R> {
        &self.pattern
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    fn begin_round(&mut self, events: &mut Vec<SessionEvent>) -> Result<()> {
        let Some(mode) = self.mode.as_ref() else {
            return Err(RecallError::illegal("begin_round", self.phase));
        };
        let length = mode.draw_length(&mut self.rng);
        let Some(reveal_ms) = mode.reveal_for(self.round, length) else {
            self.finish(false, events);
            return Ok(());
        };
        let stimulus = generate(&mut self.rng, mode.stimulus_mode(), length)?;
        let taps = (mode.kind() == ModeKind::Tapping).then_some(0);
        let now = self.timer.now();
        debug!(round = self.round + 1, %stimulus, reveal_ms, "stimulus revealed");

        self.current = Some(ActiveTrial {
            stimulus: stimulus.clone(),
            reveal_ms,
            input_from: None,
            pattern_mistakes: None,
            taps,
        });
        self.enter(SessionPhase::Revealing);
        self.alarm
            .arm(now, Duration::from_millis(reveal_ms), Cue::EndReveal);
        events.push(SessionEvent::StimulusReady {
            stimulus,
            reveal_ms,
        });
        Ok(())
    }

    fn on_cue(&mut self, cue: Cue, now: u64, events: &mut Vec<SessionEvent>) -> Result<()> {
        let grid = self.mode.as_ref().and_then(|m| m.grid());
        match cue {
            Cue::EndReveal => {
                events.push(SessionEvent::StimulusHidden);
                match grid {
                    Some(grid) => {
                        self.pattern.new_round(grid.length)?;
                        self.enter(SessionPhase::PatternReveal);
                        self.light_cell(0, now, events);
                    }
                    None => match self.mode.as_ref().and_then(|m| m.retention()) {
                        Some((task, retention_ms)) => {
                            self.enter(SessionPhase::Retention);
                            self.alarm.arm(
                                now,
                                Duration::from_millis(retention_ms),
                                Cue::EndRetention,
                            );
                            events.push(SessionEvent::RetentionStarted { task, retention_ms });
                        }
                        None => self.enter_response(now, events),
                    },
                }
            }
            Cue::EndRetention | Cue::TapCheck => {
                let untapped = self.current.as_ref().is_some_and(|t| t.taps == Some(0));
                if untapped {
                    if cue == Cue::EndRetention {
                        events.push(SessionEvent::TapRequired);
                    }
                    let recheck = self
                        .mode
                        .as_ref()
                        .and_then(|m| m.tap_recheck_ms())
                        .unwrap_or(500);
                    self.alarm
                        .arm(now, Duration::from_millis(recheck), Cue::TapCheck);
                } else {
                    self.enter_response(now, events);
                }
            }
            Cue::CellOff(step) => {
                if let Some(cell) = self.pattern.sequence().get(step).copied() {
                    events.push(SessionEvent::CellCleared(cell));
                }
                let gap = grid.map_or(0, |g| g.gap_ms);
                self.alarm
                    .arm(now, Duration::from_millis(gap), Cue::CellOn(step + 1));
            }
            Cue::CellOn(step) => {
                if step < self.pattern.sequence().len() {
                    self.light_cell(step, now, events);
                } else {
                    self.enter(SessionPhase::PatternEntry);
                    events.push(SessionEvent::AwaitingClicks {
                        length: self.pattern.sequence().len(),
                    });
                }
            }
            Cue::HandOff => self.enter_response(now, events),
            Cue::NextRound => self.begin_round(events)?,
        }
        Ok(())
    }

    fn light_cell(&mut self, step: usize, now: u64, events: &mut Vec<SessionEvent>) {
        let Some(cell) = self.pattern.sequence().get(step).copied() else {
            return;
        };
        let on_ms = self
            .mode
            .as_ref()
            .and_then(|m| m.grid())
            .map_or(0, |g| g.cell_on_ms);
        events.push(SessionEvent::CellHighlighted(cell));
        self.alarm
            .arm(now, Duration::from_millis(on_ms), Cue::CellOff(step));
    }

    fn enter_response(&mut self, now: u64, events: &mut Vec<SessionEvent>) {
        let Some(trial) = self.current.as_mut() else {
            return;
        };
        trial.input_from = Some(now);
        let event = SessionEvent::AwaitingResponse {
            slots: trial.stimulus.len(),
            kind: trial.stimulus.kind(),
        };
        self.enter(SessionPhase::AwaitingResponse);
        events.push(event);
    }

    fn enter(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            info!(from = %self.phase, to = %phase, "phase");
            self.phase = phase;
        }
    }

    fn finish(&mut self, abandoned: bool, events: &mut Vec<SessionEvent>) {
        self.alarm.cancel();
        self.current = None;
        self.enter(SessionPhase::Finished);
        if let Some(mode) = self.mode.as_ref() {
            let kind = mode.kind();
            info!(mode = %kind, rounds = self.round, abandoned, "session finished");
            events.push(SessionEvent::SessionFinished {
                mode: kind,
                rounds: self.round,
                abandoned,
            });
        }
    }
}
