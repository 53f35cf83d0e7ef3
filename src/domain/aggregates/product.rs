//! Product catalog query
//!
//! Filtering and ordering for the customer product listing.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::{CategoryId, Product};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Keep input order.
    #[default]
    Default,
    PriceLow,
    PriceHigh,
    Name,
    Newest,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductQuery {
    /// Exact category match; subcategories are not included.
    pub category: Option<CategoryId>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
}

impl ProductQuery {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = self.category {
            if product.category_id != category { return false; }
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                product.name.to_lowercase().contains(&term) || product.description.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }

    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        let mut hits: Vec<&Product> = products.iter().filter(|p| self.matches(p)).collect();
        match self.sort {
            SortOrder::Default => {}
            SortOrder::PriceLow => hits.sort_by(|a, b| a.price.cmp(&b.price)),
            SortOrder::PriceHigh => hits.sort_by(|a, b| b.price.cmp(&a.price)),
            SortOrder::Name => hits.sort_by(|a, b| compare_names(&a.name, &b.name)),
            // `None` orders before any date, so undated products land last.
            SortOrder::Newest => hits.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
        hits
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}
