use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::TypeId;

/// Repository a run operates on, with its pre-aggregated content counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Number of associated units per type id.
    #[serde(default)]
    pub content_unit_counts: BTreeMap<TypeId, u64>,
}

impl Repository {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            content_unit_counts: BTreeMap::new(),
        }
    }

    pub fn with_count(mut self, type_id: impl Into<TypeId>, count: u64) -> Self {
        self.content_unit_counts.insert(type_id.into(), count);
        self
    }

    /// Associated units of `type_id`; zero for unknown types.
    pub fn unit_count(&self, type_id: &str) -> u64 {
        self.content_unit_counts.get(type_id).copied().unwrap_or(0)
    }
}
