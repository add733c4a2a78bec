//! Text form of item sequences inside a CSV cell.
//!
//! Slots are wrapped as `|a||b||c|`, so an empty slot is an empty segment and survives the round
//! trip. Older space-separated cells (`a  c`) are still readable.

use recall_core::{Item, ItemKind, RecallError, Result, Stimulus};

pub fn encode_slots(slots: &[Option<Item>]) -> String {
    if slots.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = slots
        .iter()
        .map(|s| s.as_ref().map(Item::to_string).unwrap_or_default())
        .collect();
    format!("|{}|", parts.join("||"))
}

pub fn encode_items(items: &[Item]) -> String {
    let slots: Vec<Option<Item>> = items.iter().cloned().map(Some).collect();
    encode_slots(&slots)
}

/// Lenient: segments that do not parse as `kind` come back as empty slots.
pub fn decode_slots(kind: ItemKind, text: &str) -> Vec<Option<Item>> {
    if text.is_empty() {
        return Vec::new();
    }
    match text.strip_prefix('|').and_then(|t| t.strip_suffix('|')) {
        Some(inner) => inner.split("||").map(|seg| kind.parse(seg)).collect(),
        None => text.split(' ').map(|seg| kind.parse(seg)).collect(),
    }
}

/// Strict: every slot must hold an item.
pub fn decode_stimulus(kind: ItemKind, text: &str) -> Result<Stimulus> {
    let items = decode_slots(kind, text)
        .into_iter()
        .collect::<Option<Vec<Item>>>()
        .ok_or_else(|| RecallError::invalid(format!("stimulus '{text}' has an empty slot")))?;
    Ok(Stimulus::new(kind, items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slots_are_preserved() {
        let slots = vec![Some(Item::Number(12)), None, Some(Item::Number(5)), None];
        let text = encode_slots(&slots);
        assert_eq!(text, "|12||||5|||");
        assert_eq!(decode_slots(ItemKind::Number, &text), slots);
    }

    #[test]
    fn single_empty_slot_differs_from_no_slots() {
        assert_eq!(encode_slots(&[]), "");
        assert_eq!(encode_slots(&[None]), "||");
        assert_eq!(decode_slots(ItemKind::Letter, "||"), vec![None]);
        assert!(decode_slots(ItemKind::Letter, "").is_empty());
    }

    #[test]
    fn reads_space_separated_cells() {
        assert_eq!(
            decode_slots(ItemKind::Number, "3  7"),
            vec![Some(Item::Number(3)), None, Some(Item::Number(7))]
        );
    }

    #[test]
    fn stimulus_decode_is_strict() {
        let s = decode_stimulus(ItemKind::Word, "|CAT||DOG|").unwrap();
        assert_eq!(s.len(), 2);
        assert!(decode_stimulus(ItemKind::Word, "|CAT|||").is_err());
    }
}
