pub mod config;
pub mod generator;
pub mod mode;
pub mod pattern;
pub mod scorer;
pub mod state;

pub use config::ExperimentConfig;
pub use generator::{StimulusMode, generate};
pub use mode::{GridTiming, ListTiming, RetentionTask, RevealSchedule, ScheduleStep, SessionMode};
pub use pattern::{ClickOutcome, PatternEngine, PatternState};
pub use state::{SessionEvent, SessionMachine};
