//! Value Objects for the catalog

use serde::{Deserialize, Serialize};
use std::fmt;

/// URL-safe category handle derived from a display name
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Lowercases `name` and collapses every run of characters outside
    /// `[a-z0-9]` into a single hyphen, trimming hyphens at both ends.
    pub fn from_name(name: &str) -> Result<Self, SlugError> {
        let mut slug = String::with_capacity(name.len());
        let mut pending_hyphen = false;
        for c in name.to_lowercase().chars() {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                if pending_hyphen && !slug.is_empty() { slug.push('-'); }
                pending_hyphen = false;
                slug.push(c);
            } else {
                pending_hyphen = true;
            }
        }
        if slug.is_empty() { return Err(SlugError::Empty); }
        Ok(Self(slug))
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_string(self) -> String { self.0 }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum SlugError { Empty }
impl std::error::Error for SlugError {}
impl fmt::Display for SlugError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "name has no characters usable in a slug") }
}

/// Maximum number of category levels offered when choosing a parent
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxLevels(u32);

impl MaxLevels {
    pub const DEFAULT: MaxLevels = MaxLevels(3);
    pub fn new(value: u32) -> Option<Self> { if value == 0 { None } else { Some(Self(value)) } }
    pub fn value(&self) -> u32 { self.0 }
    /// A category may parent new children only while its level is below this.
    pub fn can_parent(&self, level: u32) -> bool { level + 1 < self.0 }
}

impl Default for MaxLevels { fn default() -> Self { Self::DEFAULT } }
