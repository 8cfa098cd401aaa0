use serde::{Deserialize, Serialize};

use super::draft::ItemDraft;

/// Identifier of a catalog record. Server-assigned ids are positive.
pub type ItemId = i64;

/// Reserved id of the unsaved row the grid shows while adding a record.
pub const NEW_ROW_ID: ItemId = -1;

/// Returns true for ids that do not name a persisted record: the new-row
/// sentinel and the placeholders used for optimistic creates.
pub fn is_unpersisted(id: ItemId) -> bool {
    id <= NEW_ROW_ID
}

/// Stock-derived availability, as reported by the catalog service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AvailabilityStatus {
    #[default]
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Low Stock")]
    LowStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
}

impl AvailabilityStatus {
    const LOW_STOCK_THRESHOLD: u32 = 5;

    pub fn from_stock(stock: u32) -> Self {
        match stock {
            0 => AvailabilityStatus::OutOfStock,
            n if n <= Self::LOW_STOCK_THRESHOLD => AvailabilityStatus::LowStock,
            _ => AvailabilityStatus::InStock,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::InStock => "In Stock",
            AvailabilityStatus::LowStock => "Low Stock",
            AvailabilityStatus::OutOfStock => "Out of Stock",
        }
    }
}

/// A catalog record.
///
/// `title`, `brand`, `sku`, `price`, `stock` and `category` are editable;
/// `rating`, `minimum_order_quantity` and `availability_status` are owned by
/// the server and only ever replaced wholesale from a server response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default = "default_minimum_order_quantity")]
    pub minimum_order_quantity: u32,
    #[serde(default)]
    pub availability_status: AvailabilityStatus,
}

fn default_minimum_order_quantity() -> u32 {
    1
}

impl Item {
    /// Build a complete record from draft values, filling every field the
    /// client cannot know with a deterministic default.
    pub fn synthesize(id: ItemId, draft: &ItemDraft) -> Self {
        Item {
            id,
            title: draft.title.trim().to_string(),
            brand: draft.brand.trim().to_string(),
            sku: draft.sku.trim().to_string(),
            price: draft.price,
            stock: draft.stock,
            category: draft.category.trim().to_string(),
            rating: 0.0,
            minimum_order_quantity: default_minimum_order_quantity(),
            availability_status: AvailabilityStatus::from_stock(draft.stock),
        }
    }

    /// The empty record rendered in the new-row slot.
    pub fn blank(id: ItemId) -> Self {
        Item::synthesize(id, &ItemDraft::default())
    }

    /// The editable part of this record.
    pub fn draft(&self) -> ItemDraft {
        ItemDraft {
            title: self.title.clone(),
            brand: self.brand.clone(),
            sku: self.sku.clone(),
            price: self.price,
            stock: self.stock,
            category: self.category.clone(),
        }
    }

    /// Overwrite the editable fields with `draft`, keeping server-owned ones.
    pub fn apply_draft(&mut self, draft: &ItemDraft) {
        self.title = draft.title.clone();
        self.brand = draft.brand.clone();
        self.sku = draft.sku.clone();
        self.price = draft.price;
        self.stock = draft.stock;
        self.category = draft.category.clone();
    }
}

/// Response of a delete: the removed record flagged as deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedItem {
    #[serde(flatten)]
    pub item: Item,
    pub is_deleted: bool,
}
