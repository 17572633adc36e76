use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ModelError, SkipDirective, SkipList};

/// Key under which the skip directive is stored.
const SKIP_KEY: &str = "skip";

/// Key-value configuration handed to a sync or publish run.
///
/// Apart from `skip`, keys are specific to the importer/distributor and opaque to the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginConfig(Map<String, Value>);

impl PluginConfig {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build from an arbitrary JSON value; only objects are accepted.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Layer `other` on top of `self`; keys from `other` win.
    pub fn merged(&self, other: &PluginConfig) -> PluginConfig {
        let mut out = self.0.clone();
        out.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        PluginConfig(out)
    }

    /// Read and normalize the skip directive.
    ///
    /// A missing or `null` entry means nothing is skipped.
    pub fn skip(&self) -> Result<SkipList, ModelError> {
        match self.0.get(SKIP_KEY) {
            None | Some(Value::Null) => Ok(SkipList::new()),
            Some(raw) => serde_json::from_value::<SkipDirective>(raw.clone())
                .map(SkipList::from)
                .map_err(|e| ModelError::InvalidSkip(format!("{raw}: {e}"))),
        }
    }
}

impl From<Map<String, Value>> for PluginConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
