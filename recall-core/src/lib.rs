pub mod error;
pub mod item;
pub mod mode;
pub mod phase;
pub mod trial;

pub use error::{RecallError, Result};
pub use item::{GRID_CELLS, Item, ItemKind, Response, Stimulus};
pub use mode::ModeKind;
pub use phase::SessionPhase;
pub use trial::{ScoreResult, ScoringPolicy, SessionCounters, TrialRecord, TrialSink};
