//! Category Aggregate
//!
//! Admin-side owner of the flat category list. Every mutation produces a new
//! list, rebuilds the whole forest from it, and only commits when the rebuild
//! succeeds.

use thiserror::Error;

use crate::domain::category_tree::{CategoryForest, CategoryTreeBuilder, ParentOption, TreeError};
use crate::domain::events::CategoryEvent;
use crate::domain::value_objects::{MaxLevels, SlugError};
use crate::{CategoryId, CategoryRecord};

#[derive(Clone, Debug)]
pub struct CategoryManager {
    records: Vec<CategoryRecord>,
    forest: CategoryForest,
    builder: CategoryTreeBuilder,
    max_levels: MaxLevels,
    events: Vec<CategoryEvent>,
}

impl CategoryManager {
    pub fn load(records: Vec<CategoryRecord>, builder: CategoryTreeBuilder, max_levels: MaxLevels) -> Result<Self, CategoryError> {
        let forest = builder.build(&records)?;
        Ok(Self { records, forest, builder, max_levels, events: vec![] })
    }

    pub fn records(&self) -> &[CategoryRecord] { &self.records }
    pub fn forest(&self) -> &CategoryForest { &self.forest }

    pub fn get(&self, id: CategoryId) -> Option<&CategoryRecord> { self.records.iter().find(|c| c.id == id) }

    pub fn parent_options(&self, exclude: Option<CategoryId>) -> Vec<ParentOption> {
        self.forest.parent_options(self.max_levels, exclude)
    }

    pub fn create(&mut self, name: &str, parent_id: Option<CategoryId>) -> Result<&CategoryRecord, CategoryError> {
        if let Some(parent_id) = parent_id { self.check_parent(parent_id)?; }
        let id = self.records.iter().map(|c| c.id).max().unwrap_or(0).checked_add(1).ok_or(CategoryError::IdSpaceExhausted)?;
        let record = CategoryRecord::new(id, name.trim(), parent_id)?;

        let mut next = self.records.clone();
        next.push(record);
        self.commit(next)?;
        tracing::info!(category_id = id, ?parent_id, "category created");
        self.raise_event(CategoryEvent::Created { category_id: id, parent_id });
        Ok(&self.records[self.records.len() - 1])
    }

    pub fn update(&mut self, id: CategoryId, name: &str, parent_id: Option<CategoryId>) -> Result<&CategoryRecord, CategoryError> {
        let pos = self.position(id)?;
        // Keeping the current parent skips the checks, so a promoted orphan can still be renamed.
        let reparented = self.records[pos].parent_id != parent_id;
        if let Some(parent_id) = parent_id.filter(|_| reparented) {
            if parent_id == id || self.forest.is_descendant(parent_id, id) {
                return Err(CategoryError::InvalidParent { category_id: id, parent_id });
            }
            self.check_parent(parent_id)?;
        }
        let record = CategoryRecord::new(id, name.trim(), parent_id)?;

        let mut next = self.records.clone();
        next[pos] = record;
        self.commit(next)?;
        tracing::info!(category_id = id, ?parent_id, "category updated");
        self.raise_event(CategoryEvent::Updated { category_id: id, parent_id });
        Ok(&self.records[pos])
    }

    pub fn delete(&mut self, id: CategoryId) -> Result<CategoryRecord, CategoryError> {
        let pos = self.position(id)?;
        if self.records.iter().any(|c| c.parent_id == Some(id)) {
            return Err(CategoryError::HasChildren(id));
        }
        let mut next = self.records.clone();
        let removed = next.remove(pos);
        self.commit(next)?;
        tracing::info!(category_id = id, "category deleted");
        self.raise_event(CategoryEvent::Deleted { category_id: id });
        Ok(removed)
    }

    pub fn take_events(&mut self) -> Vec<CategoryEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: CategoryEvent) { self.events.push(e); }

    fn position(&self, id: CategoryId) -> Result<usize, CategoryError> {
        self.records.iter().position(|c| c.id == id).ok_or(CategoryError::NotFound(id))
    }

    fn check_parent(&self, parent_id: CategoryId) -> Result<(), CategoryError> {
        let level = self.forest.level_of(parent_id).ok_or(CategoryError::ParentNotFound(parent_id))?;
        if !self.max_levels.can_parent(level) {
            return Err(CategoryError::DepthExceeded { parent_id, max_levels: self.max_levels.value() });
        }
        Ok(())
    }

    fn commit(&mut self, next: Vec<CategoryRecord>) -> Result<(), CategoryError> {
        self.forest = self.builder.build(&next)?;
        self.records = next;
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CategoryError {
    #[error("category {0} not found")]
    NotFound(CategoryId),

    #[error("parent category {0} not found")]
    ParentNotFound(CategoryId),

    #[error("category {0} has subcategories; delete them first")]
    HasChildren(CategoryId),

    #[error("category {parent_id} cannot be the parent of {category_id}")]
    InvalidParent { category_id: CategoryId, parent_id: CategoryId },

    #[error("category {parent_id} is too deep to take children (max {max_levels} levels)")]
    DepthExceeded { parent_id: CategoryId, max_levels: u32 },

    #[error("no category ids left to assign")]
    IdSpaceExhausted,

    #[error("invalid category name: {0}")]
    InvalidName(#[from] SlugError),

    #[error(transparent)]
    Tree(#[from] TreeError),
}
