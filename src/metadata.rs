//! Conversion-scoped metadata channel.
//!
//! Stages record facts they accumulate during a conversion (pinged names,
//! heading records) under keys they own. The engine clears the whole map
//! before each conversion and every owning stage re-initialises its key, so
//! a key is present and empty even when nothing was recorded. Callers read
//! the final map after conversion through
//! [`crate::Engine::metadata`] or [`crate::ConversionOutput::metadata`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Insertion-ordered map from stage-defined keys to accumulator values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    entries: Map<String, Value>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every key.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Set `key` to its initial (empty) accumulator value.
    pub fn reset_key(&mut self, key: &str, initial: Value) {
        self.entries.insert(key.to_string(), initial);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    /// Add `item` to the set stored under `key`, keeping first-seen order.
    ///
    /// Sets are stored as JSON arrays without duplicates. A missing or
    /// non-array value is replaced by a fresh set.
    pub fn add_to_set(&mut self, key: &str, item: &str) {
        if let Some(items) = self.array_mut(key) {
            if !items.iter().any(|v| v.as_str() == Some(item)) {
                items.push(Value::String(item.to_string()));
            }
        }
    }

    /// Append `record` to the list stored under `key`.
    pub fn push(&mut self, key: &str, record: Value) {
        if let Some(items) = self.array_mut(key) {
            items.push(record);
        }
    }

    /// String members of the set or list under `key`.
    pub fn strings(&self, key: &str) -> Vec<&str> {
        self.entries
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn array_mut(&mut self, key: &str) -> Option<&mut Vec<Value>> {
        let slot = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        slot.as_array_mut()
    }
}
