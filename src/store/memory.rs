use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CatalogStore;
use crate::{CategoryRecord, Product, Result};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    categories: RwLock<Vec<CategoryRecord>>,
    products: RwLock<Vec<Product>>,
}

impl InMemoryStore {
    pub fn new(categories: Vec<CategoryRecord>, products: Vec<Product>) -> Self {
        Self { categories: RwLock::new(categories), products: RwLock::new(products) }
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn load_categories(&self) -> Result<Vec<CategoryRecord>> {
        Ok(self.categories.read().await.clone())
    }

    async fn save_categories(&self, categories: &[CategoryRecord]) -> Result<()> {
        *self.categories.write().await = categories.to_vec();
        Ok(())
    }

    async fn load_products(&self) -> Result<Vec<Product>> {
        Ok(self.products.read().await.clone())
    }
}
