use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Editable columns of a catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Title,
    Brand,
    Sku,
    Price,
    Stock,
    Category,
}

impl Field {
    pub const REQUIRED: [Field; 3] = [Field::Title, Field::Sku, Field::Price];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Brand => "brand",
            Field::Sku => "sku",
            Field::Price => "price",
            Field::Stock => "stock",
            Field::Category => "category",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell edit.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Title(String),
    Brand(String),
    Sku(String),
    Price(f64),
    Stock(u32),
    Category(String),
}

impl FieldValue {
    pub fn field(&self) -> Field {
        match self {
            FieldValue::Title(_) => Field::Title,
            FieldValue::Brand(_) => Field::Brand,
            FieldValue::Sku(_) => Field::Sku,
            FieldValue::Price(_) => Field::Price,
            FieldValue::Stock(_) => Field::Stock,
            FieldValue::Category(_) => Field::Category,
        }
    }
}

/// The editable values of a row: the buffered state of a row being edited,
/// and the input of a create.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    pub title: String,
    #[serde(default)]
    pub brand: String,
    pub sku: String,
    pub price: f64,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub category: String,
}

impl ItemDraft {
    pub fn new(title: impl Into<String>, sku: impl Into<String>, price: f64) -> Self {
        ItemDraft {
            title: title.into(),
            sku: sku.into(),
            price,
            ..ItemDraft::default()
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn set(&mut self, value: FieldValue) {
        match value {
            FieldValue::Title(v) => self.title = v,
            FieldValue::Brand(v) => self.brand = v,
            FieldValue::Sku(v) => self.sku = v,
            FieldValue::Price(v) => self.price = v,
            FieldValue::Stock(v) => self.stock = v,
            FieldValue::Category(v) => self.category = v,
        }
    }

    /// Check the values a create must carry: non-blank title and sku,
    /// non-zero finite price.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push(Field::Title);
        }
        if self.sku.trim().is_empty() {
            missing.push(Field::Sku);
        }
        if self.price == 0.0 {
            missing.push(Field::Price);
        }
        if !missing.is_empty() {
            return Err(ValidationError::MissingRequired(missing));
        }
        check_price(self.price)
    }
}

pub(crate) fn check_price(price: f64) -> Result<(), ValidationError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ValidationError::OutOfRange {
            field: Field::Price,
            value: price.to_string(),
        });
    }
    Ok(())
}
