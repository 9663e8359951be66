//! Sample documents returned by the search backend

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One matching record attached to an alert for context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleDocument {
    // collection the hit came from (concrete index, not the pattern)
    pub index: String,

    pub id: String,

    #[serde(default)]
    pub source: Map<String, Value>,
}

impl SampleDocument {
    pub fn new(index: impl Into<String>, id: impl Into<String>, source: Map<String, Value>) -> Self {
        Self {
            index: index.into(),
            id: id.into(),
            source,
        }
    }

    /// Look up a field by exact key first, then as a dotted path into
    /// nested objects (`"host.name"`).
    pub fn field(&self, key: &str) -> Option<&Value> {
        if let Some(v) = self.source.get(key) {
            return Some(v);
        }
        let mut parts = key.split('.');
        let mut current = self.source.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// String value of a field; blank strings count as absent.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        match self.field(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// First present string among several candidate keys.
    pub fn first_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.field_str(k))
    }
}
