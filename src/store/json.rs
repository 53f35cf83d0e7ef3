//! JSON documents on disk, one file per collection. A missing file reads as
//! an empty list.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::CatalogStore;
use crate::{CategoryRecord, Product, Result};

const CATEGORIES_FILE: &str = "categories.json";
const PRODUCTS_FILE: &str = "products.json";

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    async fn read_list<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>> {
        match tokio::fs::read(self.dir.join(file)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CatalogStore for JsonFileStore {
    async fn load_categories(&self) -> Result<Vec<CategoryRecord>> {
        self.read_list(CATEGORIES_FILE).await
    }

    async fn save_categories(&self, categories: &[CategoryRecord]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let bytes = serde_json::to_vec_pretty(categories)?;
        let tmp = self.dir.join(format!("{CATEGORIES_FILE}.tmp"));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, self.dir.join(CATEGORIES_FILE)).await?;
        tracing::debug!(count = categories.len(), dir = %self.dir.display(), "categories saved");
        Ok(())
    }

    async fn load_products(&self) -> Result<Vec<Product>> {
        self.read_list(PRODUCTS_FILE).await
    }
}
