//! Storefront Catalog - category tree and product catalog service
//!
//! Backs the customer-facing category sidebar and the admin category manager.
//!
//! ## Features
//! - Hierarchical category trees built from a flat, parent-pointer list
//! - Breadcrumb resolution and per-category product counts
//! - Admin category management with a nesting-depth cap
//! - Product filtering and sorting for the catalog page
//! - Pluggable persistence (memory, JSON directory, PostgreSQL)

pub mod config;
pub mod domain;
pub mod http;
pub mod store;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::value_objects::{Slug, SlugError};

pub type CategoryId = i64;
pub type ProductId = i64;

// =============================================================================
// Core Types
// =============================================================================

/// A category as persisted: a flat record pointing at its parent, if any.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryRecord {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
}

impl CategoryRecord {
    /// Builds a record with its slug derived from `name`.
    pub fn new(id: CategoryId, name: impl Into<String>, parent_id: Option<CategoryId>) -> std::result::Result<Self, SlugError> {
        let name = name.into();
        let slug = Slug::from_name(&name)?.into_string();
        Ok(Self { id, name, slug, parent_id })
    }

    pub fn is_root(&self) -> bool { self.parent_id.is_none() }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub discount_percentage: Decimal,
    pub category_id: CategoryId,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(default, rename = "stock_quantity")]
    pub stock_quantity: i32,
    #[serde(default, rename = "created_at")]
    pub created_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed stored data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
