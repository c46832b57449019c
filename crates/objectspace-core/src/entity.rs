//! Dynamic entity instances.
//!
//! An [`EntityInstance`] is the runtime shape of one storage row: an entity
//! kind plus a field map. There is no compile-time struct per kind — the
//! registry's descriptors are the only source of shape information, and the
//! session layer routes every tracked mutation through them.

use crate::descriptor::ClassDescriptor;
use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Reserved field: primary key.
pub const ID_FIELD: &str = "id";
/// Reserved field: creation timestamp.
pub const CREATED_AT_FIELD: &str = "created_at";
/// Reserved field: last-modified timestamp.
pub const UPDATED_AT_FIELD: &str = "updated_at";
/// Reserved field: soft-delete flag.
pub const DELETED_FIELD: &str = "deleted";

/// The reserved fields every entity kind carries.
pub const RESERVED_FIELDS: [&str; 4] = [ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD, DELETED_FIELD];

/// One in-memory entity.
///
/// Assignments made directly through [`set`](EntityInstance::set) bypass
/// change tracking; sessions use it for materialization and rollback, and
/// route user edits through their tracked mutation path instead.
#[derive(Debug, Clone, Serialize)]
pub struct EntityInstance {
    kind: &'static str,
    values: HashMap<&'static str, Value>,
}

impl EntityInstance {
    /// Create an instance of the described kind with every property NULL.
    #[must_use]
    pub fn new(class: &ClassDescriptor) -> Self {
        let values = class
            .properties()
            .iter()
            .map(|p| (p.name(), Value::Null))
            .collect();
        Self {
            kind: class.kind(),
            values,
        }
    }

    /// The entity kind key.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    /// Read a field; unknown fields read as NULL.
    #[must_use]
    pub fn get(&self, field: &str) -> Value {
        self.values.get(field).cloned().unwrap_or(Value::Null)
    }

    /// Raw, untracked field assignment.
    pub fn set(&mut self, field: &'static str, value: Value) {
        self.values.insert(field, value);
    }

    /// The primary key, once assigned.
    #[must_use]
    pub fn id(&self) -> Option<Uuid> {
        self.get(ID_FIELD).as_uuid()
    }

    /// Creation timestamp, once assigned.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.get(CREATED_AT_FIELD).as_timestamp()
    }

    /// Last-modified timestamp, once assigned.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.get(UPDATED_AT_FIELD).as_timestamp()
    }

    /// Whether the entity is soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.get(DELETED_FIELD).as_bool().unwrap_or(false)
    }

    /// Iterate over (field, value) pairs in unspecified order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }
}
