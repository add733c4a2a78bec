use std::fmt;

/// Top-level phases of a recall session
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Configuring,
    Revealing,
    /// Pattern sequence is being lit cell by cell.
    PatternReveal,
    /// Waiting for grid clicks.
    PatternEntry,
    /// Interval between the last item and the response screen.
    Retention,
    AwaitingResponse,
    Scoring,
    /// Post-scoring feedback pause.
    Delay,
    Finished,
}

impl SessionPhase {
    /// A new session may start from here.
    pub fn accepts_start(&self) -> bool {
        matches!(self, Self::Configuring | Self::Finished)
    }

    pub fn allows_response(&self) -> bool {
        matches!(self, Self::AwaitingResponse)
    }

    pub fn allows_click(&self) -> bool {
        matches!(self, Self::PatternEntry)
    }

    /// Taps are only counted during retention, and only in tapping mode.
    pub fn allows_tap(&self) -> bool {
        matches!(self, Self::Retention)
    }

    /// Phases that end on a timer rather than a user action.
    pub fn is_timed(&self) -> bool {
        matches!(
            self,
            Self::Revealing | Self::PatternReveal | Self::Retention | Self::Delay
        )
    }

    pub fn is_running(&self) -> bool {
        !self.accepts_start()
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use SessionPhase::*;
        let name = match self {
            Configuring => "configuring",
            Revealing => "revealing",
            PatternReveal => "revealing pattern",
            PatternEntry => "awaiting clicks",
            Retention => "in retention",
            AwaitingResponse => "awaiting response",
            Scoring => "scoring",
            Delay => "in feedback delay",
            Finished => "finished",
        };
        f.write_str(name)
    }
}
