pub mod codec;
pub mod logger;
pub mod participant;
pub mod row;
pub mod summary;

pub use logger::{ResultLogger, read_rows};
pub use participant::{allocate_participant, next_participant_id, save_participant_id};
pub use row::CsvRow;
pub use summary::{ModeSummary, Substitution, substitution_errors, summarize, summarize_file};
