//! Aggregates module
pub mod category;
pub mod product;

pub use category::{CategoryError, CategoryManager};
pub use product::{ProductQuery, SortOrder};
