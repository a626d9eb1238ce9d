//! Items the player carries.
//!
//! Items found in the narrative are added with a fresh id; items with the
//! same name stay distinct. Using an item removes the oldest one whose name
//! matches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest accepted item name, in characters.
pub const MAX_ITEM_NAME_CHARS: usize = 60;

/// Longest accepted item description, in characters.
pub const MAX_ITEM_DESCRIPTION_CHARS: usize = 200;

/// Identifier of an item, unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub found_round: u32,
}

/// The player's inventory plus the id counter that keeps ids unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    items: Vec<InventoryItem>,
    next_id: u32,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(items: Vec<InventoryItem>, next_id: u32) -> Self {
        Self { items, next_id }
    }

    /// Add an item. Returns `None` if the name is blank after cleanup.
    pub fn add(&mut self, name: &str, description: &str, round: u32) -> Option<ItemId> {
        let name = clip(name, MAX_ITEM_NAME_CHARS);
        if name.is_empty() {
            return None;
        }
        let id = ItemId(self.next_id);
        self.next_id += 1;
        self.items.push(InventoryItem {
            id,
            name,
            description: clip(description, MAX_ITEM_DESCRIPTION_CHARS),
            found_round: round,
        });
        Some(id)
    }

    /// Remove the oldest item whose name matches (case-insensitive).
    pub fn consume(&mut self, name: &str) -> Option<InventoryItem> {
        let wanted = name.trim().to_lowercase();
        let idx = self
            .items
            .iter()
            .position(|i| i.name.to_lowercase() == wanted)?;
        Some(self.items.remove(idx))
    }

    pub fn get(&self, id: ItemId) -> Option<&InventoryItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The id the next added item will receive.
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Numbered listing in the style of the `inventory` command.
    pub fn listing(&self) -> String {
        if self.items.is_empty() {
            return "Your inventory is empty.".to_string();
        }
        let mut out = String::from("=== INVENTORY ===\n");
        for (n, item) in self.items.iter().enumerate() {
            out.push_str(&format!("{}. {}", n + 1, item.name));
            if !item.description.is_empty() {
                out.push_str(&format!(" - {}", item.description));
            }
            out.push('\n');
        }
        out
    }
}

/// Trim, collapse inner whitespace and cut to `max` characters.
fn clip(text: &str, max: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(max).collect::<String>().trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_names_get_distinct_ids() {
        let mut inv = Inventory::new();
        let a = inv.add("Water flask", "Half full", 1).unwrap();
        let b = inv.add("water flask", "", 2).unwrap();

        assert_ne!(a, b);
        assert_eq!(inv.len(), 2);
        assert_eq!(inv.next_id(), 2);
    }

    #[test]
    fn test_consume_removes_oldest_match() {
        let mut inv = Inventory::new();
        let first = inv.add("Flare", "red", 1).unwrap();
        inv.add("Rope", "", 1);
        let second = inv.add("Flare", "green", 2).unwrap();

        let used = inv.consume("FLARE").unwrap();
        assert_eq!(used.id, first);
        assert!(inv.get(second).is_some());
        assert!(inv.consume("lantern").is_none());
    }

    #[test]
    fn test_ids_never_reused() {
        let mut inv = Inventory::new();
        inv.add("Flare", "", 1);
        inv.consume("Flare");
        let next = inv.add("Flare", "", 2).unwrap();
        assert_eq!(next, ItemId(1));
    }

    #[test]
    fn test_names_are_cleaned() {
        let mut inv = Inventory::new();
        assert!(inv.add("   ", "nothing", 1).is_none());

        let id = inv.add(&format!("  rusty\n {}", "k".repeat(80)), "", 1).unwrap();
        let item = inv.get(id).unwrap();
        assert!(item.name.starts_with("rusty k"));
        assert_eq!(item.name.chars().count(), MAX_ITEM_NAME_CHARS);
    }

    #[test]
    fn test_listing() {
        let mut inv = Inventory::new();
        assert_eq!(inv.listing(), "Your inventory is empty.");

        inv.add("Geiger counter", "Clicks near the river", 1);
        inv.add("Seed packet", "", 2);
        let listing = inv.listing();
        assert!(listing.contains("1. Geiger counter - Clicks near the river"));
        assert!(listing.contains("2. Seed packet\n"));
    }
}
