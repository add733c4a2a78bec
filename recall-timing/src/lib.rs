pub mod alarm;
pub mod timer;

pub use alarm::Alarm;
pub use timer::{HighPrecisionTimer, ManualTimer, Timer};
