use serde::{Deserialize, Serialize};

use super::draft::{check_price, Field, ItemDraft};
use super::error::ValidationError;
use super::item::{AvailabilityStatus, Item};

/// A partial update: only the fields that are `Some` are submitted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

fn changed<T: PartialEq + Clone>(new: &T, old: &T) -> Option<T> {
    if new != old {
        Some(new.clone())
    } else {
        None
    }
}

impl ItemPatch {
    /// Field-level difference between an edited row and its last confirmed
    /// values. Unchanged fields are left out.
    pub fn diff(new: &ItemDraft, old: &ItemDraft) -> Self {
        ItemPatch {
            title: changed(&new.title, &old.title),
            brand: changed(&new.brand, &old.brand),
            sku: changed(&new.sku, &old.sku),
            price: changed(&new.price, &old.price),
            stock: changed(&new.stock, &old.stock),
            category: changed(&new.category, &old.category),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// The fields this patch touches.
    pub fn fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        if self.title.is_some() {
            fields.push(Field::Title);
        }
        if self.brand.is_some() {
            fields.push(Field::Brand);
        }
        if self.sku.is_some() {
            fields.push(Field::Sku);
        }
        if self.price.is_some() {
            fields.push(Field::Price);
        }
        if self.stock.is_some() {
            fields.push(Field::Stock);
        }
        if self.category.is_some() {
            fields.push(Field::Category);
        }
        fields
    }

    /// Required fields may be changed but not cleared.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        if matches!(&self.title, Some(title) if title.trim().is_empty()) {
            missing.push(Field::Title);
        }
        if matches!(&self.sku, Some(sku) if sku.trim().is_empty()) {
            missing.push(Field::Sku);
        }
        if self.price == Some(0.0) {
            missing.push(Field::Price);
        }
        if !missing.is_empty() {
            return Err(ValidationError::MissingRequired(missing));
        }
        match self.price {
            Some(price) => check_price(price),
            None => Ok(()),
        }
    }

    /// Merge the patch into `item`.
    pub fn apply(&self, item: &mut Item) {
        if let Some(title) = &self.title {
            item.title = title.clone();
        }
        if let Some(brand) = &self.brand {
            item.brand = brand.clone();
        }
        if let Some(sku) = &self.sku {
            item.sku = sku.clone();
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        if let Some(stock) = self.stock {
            item.stock = stock;
            item.availability_status = AvailabilityStatus::from_stock(stock);
        }
        if let Some(category) = &self.category {
            item.category = category.clone();
        }
    }
}
