use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::TypeId;

/// A single piece of repository content (a package, an erratum, a metadata file, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub type_id: TypeId,
    /// Fields that uniquely identify the unit within its type.
    pub unit_key: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Unit {
    pub fn new(type_id: impl Into<TypeId>, unit_key: Map<String, Value>) -> Self {
        Self {
            type_id: type_id.into(),
            unit_key,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Copy of the unit with metadata reduced to `fields`. The unit key is always kept.
    pub fn projected(&self, fields: &[String]) -> Unit {
        let metadata = self
            .metadata
            .iter()
            .filter(|(k, _)| fields.iter().any(|f| f == *k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Unit {
            type_id: self.type_id.clone(),
            unit_key: self.unit_key.clone(),
            metadata,
        }
    }
}

/// What a unit-processing step asks the conduit for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitCriteria {
    /// Unit types to return; already stripped of skipped types.
    pub type_ids: Vec<TypeId>,
    /// Field/value predicates narrowing which units of a type are included.
    pub association_filters: Option<Map<String, Value>>,
    /// Metadata fields to return; `None` returns everything.
    pub unit_fields: Option<Vec<String>>,
}

impl UnitCriteria {
    pub fn new(type_ids: Vec<TypeId>) -> Self {
        Self {
            type_ids,
            association_filters: None,
            unit_fields: None,
        }
    }

    pub fn with_association_filters(mut self, filters: Map<String, Value>) -> Self {
        self.association_filters = Some(filters);
        self
    }

    pub fn with_unit_fields(mut self, fields: Vec<String>) -> Self {
        self.unit_fields = Some(fields);
        self
    }

    /// Returns `true` if at least one association filter is set.
    pub fn has_association_filters(&self) -> bool {
        self.association_filters
            .as_ref()
            .is_some_and(|f| !f.is_empty())
    }
}
