//! Category tree construction and queries
//!
//! The flat, parent-pointer list is the source of truth. A [`CategoryForest`]
//! is a disposable projection of it: rebuilt in full whenever the list
//! changes, never persisted.
//!
//! Building runs in two phases. Parent/child edges are collected first,
//! ignoring depth; levels are then assigned top-down from the roots, so the
//! result does not depend on whether a child appears before its parent in
//! the input.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::domain::value_objects::MaxLevels;
use crate::{CategoryId, CategoryRecord, Product};

// =============================================================================
// Types
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<CategoryId>,
    pub level: u32,
    pub children: Vec<CategoryNode>,
    /// Set only by [`CategoryForest::annotate_product_counts`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_count: Option<usize>,
}

impl CategoryNode {
    fn from_record(record: &CategoryRecord, level: u32) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            slug: record.slug.clone(),
            parent_id: record.parent_id,
            level,
            children: Vec::new(),
            product_count: None,
        }
    }

    pub fn has_children(&self) -> bool { !self.children.is_empty() }

    /// Pre-order walk of this node and its descendants.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    fn find(&self, id: CategoryId) -> Option<&CategoryNode> {
        self.iter().find(|n| n.id == id)
    }
}

// Dropping a deep chain through the derived glue would recurse once per level.
impl Drop for CategoryNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// What happens to a category whose `parent_id` names no existing category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Treat the orphan as a root.
    #[default]
    Promote,
    /// Leave the orphan and its subtree out of the forest.
    Drop,
    /// Fail the build.
    Reject,
}

impl std::str::FromStr for OrphanPolicy {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "promote" => Ok(Self::Promote),
            "drop" => Ok(Self::Drop),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown orphan policy `{other}`")),
        }
    }
}

/// A data problem the builder recovered from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataIntegrityWarning {
    DanglingParent { category_id: CategoryId, parent_id: CategoryId, policy: OrphanPolicy },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("duplicate category id {0}")]
    DuplicateCategoryId(CategoryId),

    #[error("category {category_id} is part of a parent_id cycle")]
    CyclicCategoryGraph { category_id: CategoryId },

    #[error("category {category_id} references missing parent {parent_id}")]
    DanglingParent { category_id: CategoryId, parent_id: CategoryId },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryForest {
    roots: Vec<CategoryNode>,
    /// Records left out under [`OrphanPolicy::Drop`], in input order.
    dropped: Vec<CategoryRecord>,
    warnings: Vec<DataIntegrityWarning>,
}

// =============================================================================
// Builder
// =============================================================================

#[derive(Clone, Copy, Debug, Default)]
pub struct CategoryTreeBuilder {
    orphan_policy: OrphanPolicy,
}

impl CategoryTreeBuilder {
    pub fn new(orphan_policy: OrphanPolicy) -> Self { Self { orphan_policy } }

    pub fn orphan_policy(&self) -> OrphanPolicy { self.orphan_policy }

    pub fn build(&self, flat: &[CategoryRecord]) -> Result<CategoryForest, TreeError> {
        let mut index: HashMap<CategoryId, usize> = HashMap::with_capacity(flat.len());
        for (i, record) in flat.iter().enumerate() {
            if index.insert(record.id, i).is_some() {
                return Err(TreeError::DuplicateCategoryId(record.id));
            }
        }

        let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); flat.len()];
        let mut roots: Vec<usize> = Vec::new();
        let mut orphans: HashSet<usize> = HashSet::new();
        let mut warnings = Vec::new();

        for (i, record) in flat.iter().enumerate() {
            let Some(parent_id) = record.parent_id else {
                roots.push(i);
                continue;
            };
            if let Some(&p) = index.get(&parent_id) {
                children_of[p].push(i);
                continue;
            }
            match self.orphan_policy {
                OrphanPolicy::Reject => {
                    return Err(TreeError::DanglingParent { category_id: record.id, parent_id });
                }
                OrphanPolicy::Promote => {
                    tracing::warn!(category_id = record.id, parent_id, "dangling parent reference, promoting category to root");
                    roots.push(i);
                }
                OrphanPolicy::Drop => {
                    tracing::warn!(category_id = record.id, parent_id, "dangling parent reference, dropping category subtree");
                    orphans.insert(i);
                }
            }
            warnings.push(DataIntegrityWarning::DanglingParent { category_id: record.id, parent_id, policy: self.orphan_policy });
        }

        let mut reached = vec![false; flat.len()];
        let mut queue: Vec<usize> = roots.clone();
        while let Some(i) = queue.pop() {
            reached[i] = true;
            queue.extend(children_of[i].iter().copied());
        }
        for &o in &orphans {
            mark_subtree(o, &children_of, &mut reached);
        }
        if let Some(i) = reached.iter().position(|r| !r) {
            return Err(TreeError::CyclicCategoryGraph { category_id: flat[i].id });
        }

        let dropped: Vec<CategoryRecord> = if orphans.is_empty() {
            Vec::new()
        } else {
            let mut in_dropped = vec![false; flat.len()];
            for &o in &orphans {
                mark_subtree(o, &children_of, &mut in_dropped);
            }
            flat.iter().zip(in_dropped).filter(|(_, d)| *d).map(|(r, _)| r.clone()).collect()
        };

        let roots = assemble(&roots, flat, &children_of);
        Ok(CategoryForest { roots, dropped, warnings })
    }
}

/// Marks `start` and everything below it. Only called once cycles are ruled
/// out for the subtree, or on subtrees hanging off an orphan.
fn mark_subtree(start: usize, children_of: &[Vec<usize>], marks: &mut [bool]) {
    let mut stack = vec![start];
    while let Some(i) = stack.pop() {
        if marks[i] { continue; }
        marks[i] = true;
        stack.extend(children_of[i].iter().copied());
    }
}

/// Levels are handed out top-down in pre-order; nodes are then built in
/// reverse pre-order so every child exists before its parent takes it.
fn assemble(roots: &[usize], flat: &[CategoryRecord], children_of: &[Vec<usize>]) -> Vec<CategoryNode> {
    let mut order: Vec<(usize, u32)> = Vec::with_capacity(flat.len());
    let mut stack: Vec<(usize, u32)> = roots.iter().rev().map(|&i| (i, 0)).collect();
    while let Some((i, level)) = stack.pop() {
        order.push((i, level));
        stack.extend(children_of[i].iter().rev().map(|&c| (c, level + 1)));
    }

    let mut built: Vec<Option<CategoryNode>> = std::iter::repeat_with(|| None).take(flat.len()).collect();
    for &(i, level) in order.iter().rev() {
        let mut node = CategoryNode::from_record(&flat[i], level);
        node.children = children_of[i].iter().filter_map(|&c| built[c].take()).collect();
        built[i] = Some(node);
    }
    roots.iter().filter_map(|&i| built[i].take()).collect()
}

/// Builds a forest with the default orphan policy.
pub fn build_tree(flat: &[CategoryRecord]) -> Result<CategoryForest, TreeError> {
    CategoryTreeBuilder::default().build(flat)
}

// =============================================================================
// Forest queries
// =============================================================================

pub struct PreOrder<'a> {
    stack: Vec<&'a CategoryNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a CategoryNode;
    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// An entry for the "choose parent" selector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentOption {
    pub id: CategoryId,
    pub name: String,
    pub level: u32,
    pub label: String,
}

impl CategoryForest {
    pub fn roots(&self) -> &[CategoryNode] { &self.roots }
    pub fn into_roots(self) -> Vec<CategoryNode> { self.roots }
    pub fn dropped(&self) -> &[CategoryRecord] { &self.dropped }
    pub fn warnings(&self) -> &[DataIntegrityWarning] { &self.warnings }
    pub fn is_empty(&self) -> bool { self.roots.is_empty() }

    /// Pre-order walk over every node, roots in order.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: self.roots.iter().rev().collect() }
    }

    pub fn node_count(&self) -> usize { self.iter().count() }

    pub fn find(&self, id: CategoryId) -> Option<&CategoryNode> {
        self.iter().find(|n| n.id == id)
    }

    pub fn level_of(&self, id: CategoryId) -> Option<u32> {
        self.find(id).map(|n| n.level)
    }

    /// True when `candidate` sits somewhere below `ancestor`.
    pub fn is_descendant(&self, candidate: CategoryId, ancestor: CategoryId) -> bool {
        self.find(ancestor)
            .map(|a| a.children.iter().any(|c| c.find(candidate).is_some()))
            .unwrap_or(false)
    }

    /// Rows of the admin table: roots always, children only under expanded parents.
    pub fn visible_rows(&self, expanded: &HashSet<CategoryId>) -> Vec<&CategoryNode> {
        let mut rows = Vec::new();
        let mut stack: Vec<&CategoryNode> = self.roots.iter().rev().collect();
        while let Some(node) = stack.pop() {
            rows.push(node);
            if expanded.contains(&node.id) {
                stack.extend(node.children.iter().rev());
            }
        }
        rows
    }

    /// Categories that may take a new child, in tree order. `exclude` removes
    /// a category and its whole subtree, which keeps an edit from creating a cycle.
    pub fn parent_options(&self, max_levels: MaxLevels, exclude: Option<CategoryId>) -> Vec<ParentOption> {
        let excluded: HashSet<CategoryId> = exclude
            .and_then(|id| self.find(id))
            .map(|n| n.iter().map(|d| d.id).collect())
            .unwrap_or_default();
        self.iter()
            .filter(|n| max_levels.can_parent(n.level) && !excluded.contains(&n.id))
            .map(|n| ParentOption {
                id: n.id,
                name: n.name.clone(),
                level: n.level,
                label: format!("{} {}", "─".repeat(n.level as usize), n.name),
            })
            .collect()
    }

    /// Fills `product_count` on every node from a precomputed count map.
    pub fn annotate_product_counts(&mut self, counts: &ProductCounts) {
        let mut stack: Vec<&mut CategoryNode> = self.roots.iter_mut().collect();
        while let Some(node) = stack.pop() {
            node.product_count = Some(counts.get(node.id));
            stack.extend(node.children.iter_mut());
        }
    }
}

// =============================================================================
// Product counts
// =============================================================================

/// Products whose `category_id` is exactly `category_id`; descendants are not included.
pub fn count_products_by_category(products: &[Product], category_id: CategoryId) -> usize {
    products.iter().filter(|p| p.category_id == category_id).count()
}

/// Per-category product counts, computed once for a render pass.
#[derive(Clone, Debug, Default)]
pub struct ProductCounts(HashMap<CategoryId, usize>);

impl ProductCounts {
    pub fn from_products(products: &[Product]) -> Self {
        let mut counts = HashMap::new();
        for p in products { *counts.entry(p.category_id).or_insert(0) += 1; }
        Self(counts)
    }
    pub fn get(&self, category_id: CategoryId) -> usize { self.0.get(&category_id).copied().unwrap_or(0) }
}

// =============================================================================
// Breadcrumbs and UI state
// =============================================================================

/// Root-to-leaf path ending at `leaf_id`. An unknown leaf yields an empty path.
///
/// The walk stops at a root or at a parent id that resolves to nothing. It is
/// bounded to `flat.len()` hops; a longer chain can only come from a cycle.
/// With duplicate ids the last record wins.
pub fn resolve_breadcrumb_path(flat: &[CategoryRecord], leaf_id: CategoryId) -> Result<Vec<CategoryRecord>, TreeError> {
    let by_id: HashMap<CategoryId, &CategoryRecord> = flat.iter().map(|c| (c.id, c)).collect();
    let Some(mut current) = by_id.get(&leaf_id).copied() else {
        return Ok(Vec::new());
    };
    let mut path = vec![current.clone()];
    while let Some(parent) = current.parent_id.and_then(|p| by_id.get(&p).copied()) {
        if path.len() >= flat.len() {
            return Err(TreeError::CyclicCategoryGraph { category_id: leaf_id });
        }
        path.push(parent.clone());
        current = parent;
    }
    path.reverse();
    Ok(path)
}

/// Returns a copy of `expanded` with `node_id` flipped.
pub fn toggle_expanded(node_id: CategoryId, expanded: &HashSet<CategoryId>) -> HashSet<CategoryId> {
    let mut next = expanded.clone();
    if !next.remove(&node_id) { next.insert(node_id); }
    next
}
