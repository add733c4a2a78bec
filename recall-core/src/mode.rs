use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RecallError;
use crate::item::ItemKind;

/// Experiment mode tag. Selected once per session; the schedule data lives in
/// `recall_experiment::SessionMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    Normal,
    Speed,
    Pattern,
    Letters,
    Clusters,
    Words,
    /// Letters, then silent articulation through the retention interval.
    Suppression,
    /// Letters, then tapping through the retention interval.
    Tapping,
}

impl ModeKind {
    pub const ALL: [ModeKind; 8] = [
        ModeKind::Normal,
        ModeKind::Speed,
        ModeKind::Pattern,
        ModeKind::Letters,
        ModeKind::Clusters,
        ModeKind::Words,
        ModeKind::Suppression,
        ModeKind::Tapping,
    ];

    /// Stable lowercase label, used for log file names and counter keys.
    pub fn label(&self) -> &'static str {
        match self {
            ModeKind::Normal => "normal",
            ModeKind::Speed => "speed",
            ModeKind::Pattern => "pattern",
            ModeKind::Letters => "letters",
            ModeKind::Clusters => "clusters",
            ModeKind::Words => "words",
            ModeKind::Suppression => "suppression",
            ModeKind::Tapping => "tapping",
        }
    }

    /// Kind of item the main recall stimulus is made of.
    pub fn item_kind(&self) -> ItemKind {
        match self {
            ModeKind::Normal | ModeKind::Speed | ModeKind::Pattern => ItemKind::Number,
            ModeKind::Letters
            | ModeKind::Clusters
            | ModeKind::Suppression
            | ModeKind::Tapping => ItemKind::Letter,
            ModeKind::Words => ItemKind::Word,
        }
    }

    pub fn is_free_recall(&self) -> bool {
        matches!(
            self,
            ModeKind::Letters
                | ModeKind::Clusters
                | ModeKind::Words
                | ModeKind::Suppression
                | ModeKind::Tapping
        )
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ModeKind {
    type Err = RecallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ModeKind::ALL
            .into_iter()
            .find(|m| m.label() == wanted)
            .ok_or_else(|| RecallError::invalid(format!("unknown mode '{s}'")))
    }
}
