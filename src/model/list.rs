use serde::{Deserialize, Serialize};

use super::item::{Item, ItemId};
use super::patch::ItemPatch;

/// One page of a list query. `items` keeps the server's order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ListResult {
    #[serde(alias = "products")]
    pub items: Vec<Item>,
    pub total: u64,
    #[serde(default)]
    pub skip: u32,
    #[serde(default)]
    pub limit: u32,
}

impl ListResult {
    pub fn new(items: Vec<Item>, total: u64) -> Self {
        let limit = items.len() as u32;
        ListResult {
            items,
            total,
            skip: 0,
            limit,
        }
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    /// Insert at the top and count it.
    pub fn prepend(&mut self, item: Item) {
        self.items.insert(0, item);
        self.total += 1;
    }

    /// Remove the row with `id`. The total only drops if a row was removed.
    pub fn remove(&mut self, id: ItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        let removed = self.items.len() != before;
        if removed {
            self.total = self.total.saturating_sub(1);
        }
        removed
    }

    /// Merge `patch` into the row with `id`, if present.
    pub fn merge(&mut self, id: ItemId, patch: &ItemPatch) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                patch.apply(item);
                true
            }
            None => false,
        }
    }

    /// Swap the row with id `id` for `item`, keeping its position.
    pub fn replace(&mut self, id: ItemId, item: &Item) -> bool {
        match self.items.iter_mut().find(|existing| existing.id == id) {
            Some(existing) => {
                *existing = item.clone();
                true
            }
            None => false,
        }
    }
}
