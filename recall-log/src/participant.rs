//! Participant id bookkeeping in `participants.json`.

use std::fs;
use std::path::{Path, PathBuf};

use recall_core::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const FILE_NAME: &str = "participants.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ParticipantFile {
    last_id: u32,
}

fn file_path(dir: &Path) -> PathBuf {
    dir.join(FILE_NAME)
}

/// Id the next run should use. A missing or unreadable file restarts the count at 1.
pub fn next_participant_id(dir: &Path) -> u32 {
    let path = file_path(dir);
    let Ok(text) = fs::read_to_string(&path) else {
        return 1;
    };
    match serde_json::from_str::<ParticipantFile>(&text) {
        Ok(file) => file.last_id.saturating_add(1),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable participant file, restarting at 1");
            1
        }
    }
}

pub fn save_participant_id(dir: &Path, id: u32) -> Result<()> {
    fs::create_dir_all(dir)?;
    let json = serde_json::to_string_pretty(&ParticipantFile { last_id: id })
        .map_err(std::io::Error::from)?;
    fs::write(file_path(dir), json)?;
    Ok(())
}

/// Reserves the next id and returns its label, e.g. `P007`.
pub fn allocate_participant(dir: &Path) -> Result<String> {
    let id = next_participant_id(dir);
    save_participant_id(dir, id)?;
    let label = format!("P{id:03}");
    info!(participant = %label, "participant allocated");
    Ok(label)
}
