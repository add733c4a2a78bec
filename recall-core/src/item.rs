use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of cells on the 3x3 pattern grid, indexed row-major 0..=8.
pub const GRID_CELLS: u8 = 9;

/// What a stimulus is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Number,
    Letter,
    Word,
    Cell,
}

impl ItemKind {
    /// Lenient parse of one typed response slot.
    ///
    /// Anything that is not a valid item of this kind comes back as `None`, i.e. an empty slot.
    /// A running session never aborts over a keystroke.
    pub fn parse(&self, raw: &str) -> Option<Item> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }
        match self {
            ItemKind::Number => text
                .parse::<u8>()
                .ok()
                .filter(|n| *n <= 99)
                .map(Item::Number),
            ItemKind::Letter => text
                .chars()
                .next()
                .filter(|c| c.is_ascii_alphabetic())
                .map(|c| Item::Letter(c.to_ascii_uppercase())),
            ItemKind::Word => {
                if text.chars().all(|c| c.is_ascii_alphabetic()) {
                    Some(Item::Word(text.to_ascii_uppercase()))
                } else {
                    None
                }
            }
            ItemKind::Cell => text
                .parse::<u8>()
                .ok()
                .filter(|i| *i < GRID_CELLS)
                .map(Item::Cell),
        }
    }
}

impl std::str::FromStr for ItemKind {
    type Err = crate::error::RecallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "number" => Ok(ItemKind::Number),
            "letter" => Ok(ItemKind::Letter),
            "word" => Ok(ItemKind::Word),
            "cell" => Ok(ItemKind::Cell),
            other => Err(crate::error::RecallError::invalid(format!(
                "unknown item kind '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemKind::Number => "number",
            ItemKind::Letter => "letter",
            ItemKind::Word => "word",
            ItemKind::Cell => "cell",
        };
        f.write_str(name)
    }
}

/// One atomic stimulus/response item
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Item {
    Number(u8),
    Letter(char),
    Word(String),
    Cell(u8),
}

impl Item {
    pub fn kind(&self) -> ItemKind {
        match self {
            Item::Number(_) => ItemKind::Number,
            Item::Letter(_) => ItemKind::Letter,
            Item::Word(_) => ItemKind::Word,
            Item::Cell(_) => ItemKind::Cell,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Number(n) => write!(f, "{n}"),
            Item::Letter(c) => write!(f, "{c}"),
            Item::Word(w) => f.write_str(w),
            Item::Cell(i) => write!(f, "{i}"),
        }
    }
}

/// The sequence to memorize. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stimulus {
    kind: ItemKind,
    items: Vec<Item>,
}

impl Stimulus {
    pub fn new(kind: ItemKind, items: Vec<Item>) -> Self {
        debug_assert!(items.iter().all(|i| i.kind() == kind));
        Self { kind, items }
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }
}

impl fmt::Display for Stimulus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

/// The participant's reconstruction. `None` marks an unanswered slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    slots: Vec<Option<Item>>,
}

impl Response {
    pub fn new(slots: Vec<Option<Item>>) -> Self {
        Self { slots }
    }

    /// Parses raw slot text, coercing anything malformed to an empty slot.
    ///
    /// Returns the response together with the number of non-blank slots that were coerced.
    pub fn parse<S: AsRef<str>>(kind: ItemKind, raw: &[S]) -> (Self, usize) {
        let mut coerced = 0;
        let slots = raw
            .iter()
            .map(|s| {
                let parsed = kind.parse(s.as_ref());
                if parsed.is_none() && !s.as_ref().trim().is_empty() {
                    coerced += 1;
                }
                parsed
            })
            .collect();
        (Self { slots }, coerced)
    }

    pub fn slots(&self) -> &[Option<Item>] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of non-empty slots.
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Pads short responses with empty slots up to `len`. Never truncates.
    pub fn padded(&self, len: usize) -> Response {
        let mut slots = self.slots.clone();
        if slots.len() < len {
            slots.resize(len, None);
        }
        Response { slots }
    }

    /// Slot `index`, treating anything past the end as empty.
    pub fn slot(&self, index: usize) -> Option<&Item> {
        self.slots.get(index).and_then(|s| s.as_ref())
    }
}

impl From<Vec<Option<Item>>> for Response {
    fn from(slots: Vec<Option<Item>>) -> Self {
        Self::new(slots)
    }
}
