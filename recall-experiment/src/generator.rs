//! Stimulus generation for every item mode.

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use recall_core::{GRID_CELLS, Item, ItemKind, RecallError, Result, Stimulus};
use serde::{Deserialize, Serialize};

/// Consonant-only letter pool, vowels removed to limit letter-name ambiguity.
pub const CONSONANTS: [char; 21] = [
    'B', 'C', 'D', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'V', 'W',
    'X', 'Y', 'Z',
];

/// Letters that sound alike.
pub const PHONOLOGICAL_CLUSTERS: [&str; 5] = ["BPD", "FV", "SZ", "CGJKQ", "TMN"];

/// Letters that look alike in uppercase.
pub const VISUAL_CLUSTERS: [&str; 5] = ["MW", "NV", "BDPR", "CEGOQ", "ILJT"];

pub const WORD_POOL: [&str; 30] = [
    "CAT", "DOG", "JOB", "EYE", "SUN", "BOX", "HAT", "CAR", "MAP", "PEN", "KEY", "BED", "CUP",
    "LIP", "BUS", "HOT", "RED", "BIG", "TOP", "LEG", "ARM", "ANT", "FOX", "OWL", "BAG", "CAP",
    "HEN", "PIG", "RAT", "JAM",
];

/// Share of cluster-mode draws taken from the chosen clusters.
const CLUSTER_BIAS: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StimulusMode {
    /// Integers 1..=99, repeats allowed.
    Digits,
    /// Consonants, no immediate repeat.
    Letters,
    /// Consonants biased towards confusable clusters, no immediate repeat.
    Clusters,
    /// Distinct words from [`WORD_POOL`].
    Words,
    /// 3x3 grid indices 0..=8, repeats allowed.
    Grid,
}

impl StimulusMode {
    pub fn item_kind(&self) -> ItemKind {
        match self {
            StimulusMode::Digits => ItemKind::Number,
            StimulusMode::Letters | StimulusMode::Clusters => ItemKind::Letter,
            StimulusMode::Words => ItemKind::Word,
            StimulusMode::Grid => ItemKind::Cell,
        }
    }
}

pub fn generate<R: Rng + ?Sized>(rng: &mut R, mode: StimulusMode, length: usize) -> Result<Stimulus> {
    if length == 0 {
        return Err(RecallError::invalid("stimulus length must be > 0"));
    }
    let items = match mode {
        StimulusMode::Digits => (0..length)
            .map(|_| Item::Number(rng.random_range(1..=99)))
            .collect(),
        StimulusMode::Letters => letters(rng, length),
        StimulusMode::Clusters => clustered_letters(rng, length),
        StimulusMode::Words => words(rng, length)?,
        StimulusMode::Grid => (0..length)
            .map(|_| Item::Cell(rng.random_range(0..GRID_CELLS)))
            .collect(),
    };
    Ok(Stimulus::new(mode.item_kind(), items))
}

fn letters<R: Rng + ?Sized>(rng: &mut R, length: usize) -> Vec<Item> {
    let mut previous = None;
    (0..length)
        .map(|_| {
            let c = draw_avoiding(rng, &CONSONANTS, previous);
            previous = Some(c);
            Item::Letter(c)
        })
        .collect()
}

fn clustered_letters<R: Rng + ?Sized>(rng: &mut R, length: usize) -> Vec<Item> {
    ClusterPools::choose(rng).draw(rng, length)
}

/// Letter pools of one cluster-mode stimulus.
#[derive(Debug)]
struct ClusterPools {
    family: &'static [&'static str],
    /// Letters of the one or two clusters picked from `family`.
    heavy: Vec<char>,
    /// Consonants that belong to no cluster of `family`.
    others: Vec<char>,
}

impl ClusterPools {
    fn choose<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let family: &'static [&'static str] = if rng.random_bool(0.5) {
            &PHONOLOGICAL_CLUSTERS
        } else {
            &VISUAL_CLUSTERS
        };
        let how_many = rng.random_range(1..=2);
        let mut heavy: Vec<char> = family
            .choose_multiple(rng, how_many)
            .flat_map(|cluster| cluster.chars())
            .collect();
        heavy.sort_unstable();
        heavy.dedup();
        let others = CONSONANTS
            .iter()
            .copied()
            .filter(|c| !family.iter().any(|cluster| cluster.contains(*c)))
            .collect();
        Self {
            family,
            heavy,
            others,
        }
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R, length: usize) -> Vec<Item> {
        let mut previous = None;
        (0..length)
            .map(|_| {
                let pool = if rng.random::<f64>() < CLUSTER_BIAS {
                    &self.heavy
                } else {
                    &self.others
                };
                let c = draw_avoiding(rng, pool, previous);
                previous = Some(c);
                Item::Letter(c)
            })
            .collect()
    }
}

/// Uniform draw from `pool` that differs from `previous`. Falls back to the
/// consonant pool if nothing else is left.
fn draw_avoiding<R: Rng + ?Sized>(rng: &mut R, pool: &[char], previous: Option<char>) -> char {
    let candidates: Vec<char> = pool.iter().copied().filter(|c| Some(*c) != previous).collect();
    let fallback: Vec<char>;
    let candidates = if candidates.is_empty() {
        fallback = CONSONANTS
            .iter()
            .copied()
            .filter(|c| Some(*c) != previous)
            .collect();
        &fallback
    } else {
        &candidates
    };
    // Both pools hold at least two distinct letters, so one always survives the filter.
    candidates.choose(rng).copied().unwrap_or('X')
}

fn words<R: Rng + ?Sized>(rng: &mut R, length: usize) -> Result<Vec<Item>> {
    if length > WORD_POOL.len() {
        return Err(RecallError::invalid(format!(
            "cannot draw {length} distinct words from a pool of {}",
            WORD_POOL.len()
        )));
    }
    let mut picked: Vec<&str> = WORD_POOL.choose_multiple(rng, length).copied().collect();
    picked.shuffle(rng);
    Ok(picked.into_iter().map(|w| Item::Word(w.to_string())).collect())
}
