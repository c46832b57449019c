//! Rows returned by the storage contract.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One storage row: a column-name to value mapping.
///
/// Drivers build rows with whatever raw `Value` forms their wire protocol
/// yields (e.g. UUIDs as text); the session layer runs each column through
/// the `ValueCodec` before the value reaches an entity field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    columns: HashMap<String, Value>,
}

impl Row {
    /// Create an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value, replacing any previous one.
    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.columns.insert(column.into(), value);
    }

    /// Builder-style variant of [`set`](Row::set).
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: Value) -> Self {
        self.set(column, value);
        self
    }

    /// Get a column value; absent columns read as NULL.
    #[must_use]
    pub fn get(&self, column: &str) -> Value {
        self.columns.get(column).cloned().unwrap_or(Value::Null)
    }

    /// Check whether the row carries the given column at all.
    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// Iterate over (column, value) pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of columns in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
