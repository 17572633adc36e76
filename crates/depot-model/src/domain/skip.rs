use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::TypeId;

/// Skip configuration as it arrives from the user.
///
/// Either a plain list of type ids, or a map of type id to a flag telling whether that type is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SkipDirective {
    List(Vec<TypeId>),
    Map(BTreeMap<TypeId, bool>),
}

/// Normalized set of unit types excluded from a run.
///
/// Both [`SkipDirective`] shapes collapse into this type on read; nothing downstream looks at the original shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkipList(BTreeSet<TypeId>);

impl SkipList {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.0.contains(type_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeId> {
        self.0.iter()
    }

    /// Returns `true` if every type in `types` is skipped.
    ///
    /// Subset test, so an empty `types` slice is always covered.
    pub fn covers<S: AsRef<str>>(&self, types: &[S]) -> bool {
        types.iter().all(|t| self.contains(t.as_ref()))
    }

    /// Types from `types` that are not skipped, deduplicated and in sorted order.
    pub fn retain_unskipped<S: AsRef<str>>(&self, types: &[S]) -> Vec<TypeId> {
        let wanted: BTreeSet<&str> = types
            .iter()
            .map(|t| t.as_ref())
            .filter(|t| !self.contains(t))
            .collect();
        wanted.into_iter().map(str::to_string).collect()
    }
}

impl From<SkipDirective> for SkipList {
    fn from(directive: SkipDirective) -> Self {
        match directive {
            SkipDirective::List(types) => Self(types.into_iter().collect()),
            SkipDirective::Map(flags) => Self(
                flags
                    .into_iter()
                    .filter_map(|(t, skipped)| skipped.then_some(t))
                    .collect(),
            ),
        }
    }
}

impl<S: Into<TypeId>> FromIterator<S> for SkipList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
