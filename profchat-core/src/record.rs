use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Value;

/// One nearest-neighbor match returned by a [`crate::VectorIndex`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RetrievedRecord {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl RetrievedRecord {
    pub fn new(id: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Renders a metadata attribute as plain text. Strings come back without
    /// JSON quotes; `None` when the key is absent or null.
    pub fn metadata_text(&self, key: &str) -> Option<String> {
        match self.metadata.get(key)? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}
