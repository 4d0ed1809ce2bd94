//! Side table of opaque tags attached to types and members.

use std::collections::BTreeMap;

use serde_json::Value;

/// Marks the field acting as a persistent identifier.
pub const IDENTIFIER_FIELD: &str = "IDENTIFIER_FIELD";
/// Marks the accessor that returns the persistent identifier.
pub const IDENTIFIER_ACCESSOR: &str = "IDENTIFIER_ACCESSOR";
/// Marks a type as persistent; payload is the table name.
pub const PERSISTENT_TYPE: &str = "PERSISTENT_TYPE";
/// Plural form of the type's simple name.
pub const PLURAL: &str = "PLURAL";
/// Marks the field used for optimistic locking.
pub const VERSION_FIELD: &str = "VERSION_FIELD";

/// Tag keys mapped to arbitrary JSON payloads. Ordered by key so equal
/// tables compare and render identically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomData(BTreeMap<String, Value>);

impl CustomData {
    /// An empty table.
    pub const fn new() -> Self {
        return Self(BTreeMap::new());
    }

    /// Payload stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        return self.0.get(key);
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        return self.0.contains_key(key);
    }

    /// Store a payload, replacing any previous one.
    pub fn put(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    /// Store a `null` payload; used for pure markers.
    pub fn tag(&mut self, key: &str) {
        self.0.insert(key.to_string(), Value::Null);
    }

    /// Copy every entry of `other` into this table.
    pub fn extend(&mut self, other: &Self) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        return self.0.is_empty();
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        return self.0.iter();
    }
}
