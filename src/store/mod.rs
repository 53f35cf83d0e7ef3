//! Persistence collaborators
//!
//! The tree code never touches storage; handlers load the flat lists through a
//! [`CatalogStore`], work on them in memory, and save the category list back.

mod json;
mod memory;
mod postgres;

pub use json::JsonFileStore;
pub use memory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::{CategoryRecord, Product, Result};

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn load_categories(&self) -> Result<Vec<CategoryRecord>>;
    /// Replaces the stored category list, keeping its order.
    async fn save_categories(&self, categories: &[CategoryRecord]) -> Result<()>;
    async fn load_products(&self) -> Result<Vec<Product>>;
}
