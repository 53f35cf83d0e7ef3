//! Catalog domain: category trees, the admin category aggregate, product queries

pub mod aggregates;
pub mod category_tree;
pub mod events;
pub mod value_objects;

pub use category_tree::{
    build_tree, count_products_by_category, resolve_breadcrumb_path, toggle_expanded, CategoryForest,
    CategoryNode, CategoryTreeBuilder, DataIntegrityWarning, OrphanPolicy, ProductCounts, TreeError,
};
