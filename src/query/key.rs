use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Sortable columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Id,
    Title,
    Brand,
    Sku,
    Price,
    Stock,
    Category,
    Rating,
    MinimumOrderQuantity,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Title => "title",
            SortField::Brand => "brand",
            SortField::Sku => "sku",
            SortField::Price => "price",
            SortField::Stock => "stock",
            SortField::Category => "category",
            SortField::Rating => "rating",
            SortField::MinimumOrderQuantity => "minimumOrderQuantity",
        }
    }

    /// Ascending comparison of two records on this column.
    pub fn compare(&self, a: &Item, b: &Item) -> Ordering {
        match self {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Title => a.title.cmp(&b.title),
            SortField::Brand => a.brand.cmp(&b.brand),
            SortField::Sku => a.sku.cmp(&b.sku),
            SortField::Price => a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal),
            SortField::Stock => a.stock.cmp(&b.stock),
            SortField::Category => a.category.cmp(&b.category),
            SortField::Rating => a.rating.partial_cmp(&b.rating).unwrap_or(Ordering::Equal),
            SortField::MinimumOrderQuantity => {
                a.minimum_order_quantity.cmp(&b.minimum_order_quantity)
            }
        }
    }
}

/// Normalized parameters of a list query; the address of a cache entry.
///
/// Fields are private so every key goes through the same normalization:
/// a blank search term is the same key as no search term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QueryKey {
    search: Option<String>,
    sort: Option<(SortField, SortOrder)>,
    limit: Option<u32>,
    skip: Option<u32>,
}

impl QueryKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, term: &str) -> Self {
        let term = term.trim();
        self.search = if term.is_empty() {
            None
        } else {
            Some(term.to_string())
        };
        self
    }

    pub fn with_sort(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort = Some((field, order));
        self
    }

    pub fn without_sort(mut self) -> Self {
        self.sort = None;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_skip(mut self, skip: u32) -> Self {
        self.skip = if skip == 0 { None } else { Some(skip) };
        self
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn sort(&self) -> Option<(SortField, SortOrder)> {
        self.sort
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn skip(&self) -> u32 {
        self.skip.unwrap_or(0)
    }

    /// Query-string pairs in the collection's parameter names.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(term) = &self.search {
            params.push(("q", term.clone()));
        }
        if let Some((field, order)) = self.sort {
            params.push(("sortBy", field.as_str().to_string()));
            params.push(("order", order.as_str().to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(skip) = self.skip {
            params.push(("skip", skip.to_string()));
        }
        params
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "list")?;
        for (i, (name, value)) in self.params().iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, name, value)?;
        }
        Ok(())
    }
}
