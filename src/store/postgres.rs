use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::CatalogStore;
use crate::{CategoryRecord, Product, Result};

#[derive(Clone, Debug)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    /// Connects and applies the embedded migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        let db = PgPoolOptions::new().max_connections(10).connect(url).await?;
        sqlx::migrate!("./migrations").run(&db).await?;
        Ok(Self { db })
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn load_categories(&self) -> Result<Vec<CategoryRecord>> {
        let rows = sqlx::query_as::<_, CategoryRecord>("SELECT id, name, slug, parent_id FROM categories ORDER BY position, id")
            .fetch_all(&self.db).await?;
        Ok(rows)
    }

    async fn save_categories(&self, categories: &[CategoryRecord]) -> Result<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM categories").execute(&mut *tx).await?;
        for (position, c) in categories.iter().enumerate() {
            sqlx::query("INSERT INTO categories (id, name, slug, parent_id, position) VALUES ($1, $2, $3, $4, $5)")
                .bind(c.id).bind(&c.name).bind(&c.slug).bind(c.parent_id).bind(position as i32)
                .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn load_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(
            "SELECT id, name, description, price, discount_percentage, category_id, image_url, featured, stock_quantity, created_at FROM products ORDER BY id",
        )
        .fetch_all(&self.db).await?;
        Ok(rows)
    }
}
