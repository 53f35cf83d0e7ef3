//! Domain events
use serde::Serialize;
use crate::CategoryId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CategoryEvent {
    Created { category_id: CategoryId, parent_id: Option<CategoryId> },
    Updated { category_id: CategoryId, parent_id: Option<CategoryId> },
    Deleted { category_id: CategoryId },
}

impl CategoryEvent {
    pub fn category_id(&self) -> CategoryId {
        match self {
            Self::Created { category_id, .. } | Self::Updated { category_id, .. } | Self::Deleted { category_id } => *category_id,
        }
    }

    /// NATS subject the event is published on.
    pub fn subject(&self) -> String {
        let verb = match self { Self::Created { .. } => "created", Self::Updated { .. } => "updated", Self::Deleted { .. } => "deleted" };
        format!("catalog.category.{verb}")
    }
}
