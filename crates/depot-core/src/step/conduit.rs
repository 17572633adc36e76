use depot_model::{Unit, UnitCriteria};
use serde_json::{Map, Value};

use crate::error::StepError;

/// Lazy sequence of units produced by a [`Conduit`].
pub type UnitStream<'a> = Box<dyn Iterator<Item = Result<Unit, StepError>> + Send + 'a>;

/// Data-access handle through which unit-processing steps read repository content.
pub trait Conduit: Send + Sync {
    /// Units matching `criteria`. The stream is consumed once per run.
    fn get_units(&self, criteria: &UnitCriteria) -> Result<UnitStream<'_>, StepError>;
}

/// Conduit over a fixed list of units.
///
/// Association filters match when every filter key is present in the unit metadata with an equal value.
#[derive(Debug, Clone, Default)]
pub struct MemoryConduit {
    units: Vec<Unit>,
}

impl MemoryConduit {
    pub fn new(units: Vec<Unit>) -> Self {
        Self { units }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

fn matches_filters(unit: &Unit, filters: Option<&Map<String, Value>>) -> bool {
    filters.is_none_or(|f| f.iter().all(|(k, v)| unit.metadata.get(k) == Some(v)))
}

impl Conduit for MemoryConduit {
    fn get_units(&self, criteria: &UnitCriteria) -> Result<UnitStream<'_>, StepError> {
        let criteria = criteria.clone();
        let iter = self.units.iter().filter_map(move |unit| {
            if !criteria.type_ids.iter().any(|t| *t == unit.type_id) {
                return None;
            }
            if !matches_filters(unit, criteria.association_filters.as_ref()) {
                return None;
            }
            Some(Ok(match &criteria.unit_fields {
                Some(fields) => unit.projected(fields),
                None => unit.clone(),
            }))
        });
        Ok(Box::new(iter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unit(type_id: &str, name: &str, arch: &str) -> Unit {
        let mut key = Map::new();
        key.insert("name".into(), json!(name));
        Unit::new(type_id, key)
            .with_metadata("arch", arch)
            .with_metadata("size", 1)
    }

    fn conduit() -> MemoryConduit {
        MemoryConduit::new(vec![
            unit("rpm", "bash", "x86_64"),
            unit("rpm", "zsh", "noarch"),
            unit("drpm", "bash-delta", "x86_64"),
            unit("erratum", "RHSA-1", "noarch"),
        ])
    }

    #[test]
    fn filters_by_type() {
        let c = conduit();
        let units: Vec<_> = c
            .get_units(&UnitCriteria::new(vec!["rpm".into(), "erratum".into()]))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(units.len(), 3);
        assert!(units.iter().all(|u| u.type_id != "drpm"));
    }

    #[test]
    fn applies_association_filters() {
        let mut f = Map::new();
        f.insert("arch".into(), json!("noarch"));
        let c = conduit();
        let units: Vec<Unit> = c
            .get_units(&UnitCriteria::new(vec!["rpm".into()]).with_association_filters(f))
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].unit_key.get("name"), Some(&json!("zsh")));
    }

    #[test]
    fn applies_field_projection() {
        let c = conduit();
        let units: Vec<Unit> = c
            .get_units(&UnitCriteria::new(vec!["drpm".into()]).with_unit_fields(vec!["arch".into()]))
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(units.len(), 1);
        assert!(units[0].metadata.contains_key("arch"));
        assert!(!units[0].metadata.contains_key("size"));
    }
}
