//! Single pending timer with an attached cue.
//!
//! Arming replaces whatever was pending, so at most one deadline exists at a time.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Alarm<E> {
    pending: Option<(u64, E)>,
}

impl<E> Alarm<E> {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Schedules `cue` to fire `after` from `now_ns`.
    pub fn arm(&mut self, now_ns: u64, after: Duration, cue: E) {
        let due = now_ns.saturating_add(after.as_nanos() as u64);
        self.pending = Some((due, cue));
    }

    pub fn cancel(&mut self) -> Option<E> {
        self.pending.take().map(|(_, cue)| cue)
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Takes the cue if its deadline has passed.
    pub fn poll(&mut self, now_ns: u64) -> Option<E> {
        match &self.pending {
            Some((due, _)) if now_ns >= *due => self.pending.take().map(|(_, cue)| cue),
            _ => None,
        }
    }

    /// Time left until the pending cue fires, zero if already due.
    pub fn remaining(&self, now_ns: u64) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|(due, _)| Duration::from_nanos(due.saturating_sub(now_ns)))
    }

    pub fn peek(&self) -> Option<&E> {
        self.pending.as_ref().map(|(_, cue)| cue)
    }
}

impl<E> Default for Alarm<E> {
    fn default() -> Self {
        Self::new()
    }
}
