//! Field-level change tracking with rollback.
//!
//! A [`ChangeRecord`] exists for an entity exactly while at least one of its
//! fields was mutated since the last commit or rollback. Each tracked field
//! keeps two values: the latest assignment and the value it had when it was
//! first touched in this transaction — the rollback target. Mutating the same
//! field repeatedly updates only the latest value.
//!
//! The session layer owns the gating: it skips recording while bulk-loading
//! and when an assignment does not actually change the field.

use crate::{EntityKey, EntityRef};
use objectspace_core::{ChangeSet, MetadataRegistry, Result, Value};
use std::collections::HashMap;

/// The two sides of one tracked field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    /// Latest assigned value.
    pub new_value: Value,
    /// Value at the time of the first change in this transaction.
    pub original: Value,
}

/// One entity's accumulated diffs.
pub struct ChangeRecord {
    entity: EntityRef,
    fields: HashMap<&'static str, FieldChange>,
}

impl ChangeRecord {
    fn new(entity: EntityRef) -> Self {
        Self {
            entity,
            fields: HashMap::new(),
        }
    }

    /// The tracked entity.
    #[must_use]
    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    /// The diff for one field, if tracked.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldChange> {
        self.fields.get(name)
    }

    /// Iterate over (field, diff) pairs in unspecified order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &FieldChange)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    /// Number of tracked fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Per-session map from entity to its accumulated field diffs.
#[derive(Default)]
pub struct ChangeTracker {
    records: HashMap<EntityKey, ChangeRecord>,
}

impl ChangeTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one field assignment.
    ///
    /// `current` is the entity's value before the assignment; it becomes the
    /// rollback target only if this is the first change of the field in this
    /// transaction.
    #[tracing::instrument(level = "trace", skip(self, entity, new_value, current), fields(kind = key.kind(), field))]
    pub fn record(
        &mut self,
        key: EntityKey,
        entity: &EntityRef,
        field: &'static str,
        new_value: Value,
        current: Value,
    ) {
        let record = self
            .records
            .entry(key)
            .or_insert_with(|| ChangeRecord::new(EntityRef::clone(entity)));

        match record.fields.get_mut(field) {
            Some(change) => change.new_value = new_value,
            None => {
                record.fields.insert(
                    field,
                    FieldChange {
                        new_value,
                        original: current,
                    },
                );
            }
        }
    }

    /// The record for an entity, if any field was mutated.
    #[must_use]
    pub fn record_for(&self, key: &EntityKey) -> Option<&ChangeRecord> {
        self.records.get(key)
    }

    /// Whether the given field of the given entity is already tracked.
    #[must_use]
    pub fn is_tracked(&self, key: &EntityKey, field: &str) -> bool {
        self.records
            .get(key)
            .is_some_and(|r| r.fields.contains_key(field))
    }

    /// Whether any entity has tracked changes.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.records.is_empty()
    }

    /// Number of entities with tracked changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no entity has tracked changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write every recorded original value back onto its entity, bypassing
    /// tracking, and clear all records.
    ///
    /// Pure in-memory field reassignment: always succeeds, and a second call
    /// is a no-op.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn rollback(&mut self) {
        for (key, record) in self.records.drain() {
            let mut entity = record.entity.write().expect("entity lock poisoned");
            for (field, change) in &record.fields {
                entity.set(field, change.original.clone());
            }
            tracing::trace!(
                kind = key.kind(),
                fields = record.fields.len(),
                "rolled back entity"
            );
        }
    }

    /// Project every record into a [`ChangeSet`] for the storage contract,
    /// mapping logical field names to storage column names.
    pub fn change_sets(&self, registry: &MetadataRegistry) -> Result<Vec<ChangeSet>> {
        let mut sets = Vec::with_capacity(self.records.len());
        for (key, record) in &self.records {
            let class = registry.require_descriptor(key.kind())?;
            let mut changes = Vec::with_capacity(record.fields.len());
            for (field, change) in &record.fields {
                if let Some(property) = class.property(field) {
                    changes.push((property.storage_name(), change.new_value.clone()));
                }
            }
            sets.push(ChangeSet {
                kind: key.kind(),
                storage_name: class.storage_name(),
                id: key.id(),
                changes,
            });
        }
        Ok(sets)
    }

    /// Drop all records without touching the entities. Called after a
    /// successful commit.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
