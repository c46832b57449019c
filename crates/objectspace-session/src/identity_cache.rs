//! The two-tier per-session identity cache.
//!
//! The **committed** tier holds entities the session considers loaded; the
//! **loading** tier collects entities materialized during the current load
//! pass. Keeping the tiers apart lets cross-references between rows of one
//! pass find each other (A references B before B is committed) without extra
//! storage round-trips, while [`lookup`](IdentityCache::lookup) — the lookup
//! every ordinary read goes through — only ever sees completed loads.
//! [`promote`](IdentityCache::promote) runs once per bulk load, not per row.

use crate::EntityRef;
use std::collections::HashMap;
use uuid::Uuid;

/// Per-session store of live entity instances, deduplicated by primary key.
#[derive(Default)]
pub struct IdentityCache {
    committed: HashMap<&'static str, Vec<EntityRef>>,
    loading: HashMap<&'static str, Vec<EntityRef>>,
}

fn find(tier: &HashMap<&'static str, Vec<EntityRef>>, kind: &str, id: Uuid) -> Option<EntityRef> {
    tier.get(kind)?
        .iter()
        .find(|e| e.read().expect("entity lock poisoned").id() == Some(id))
        .cloned()
}

impl IdentityCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entity in the committed tier.
    #[must_use]
    pub fn lookup(&self, kind: &str, id: Uuid) -> Option<EntityRef> {
        find(&self.committed, kind, id)
    }

    /// Look up an entity in the loading tier.
    #[must_use]
    pub fn lookup_loading(&self, kind: &str, id: Uuid) -> Option<EntityRef> {
        find(&self.loading, kind, id)
    }

    /// Whether the committed tier holds the key.
    #[must_use]
    pub fn contains(&self, kind: &str, id: Uuid) -> bool {
        self.lookup(kind, id).is_some()
    }

    /// Add an entity directly to the committed tier (pending creations).
    ///
    /// Returns `false` without inserting when the entity has no primary key
    /// yet or the key is already present — there is never a second live
    /// instance per key.
    pub fn add(&mut self, entity: EntityRef) -> bool {
        let (kind, id) = {
            let guard = entity.read().expect("entity lock poisoned");
            match guard.id() {
                Some(id) => (guard.kind(), id),
                None => return false,
            }
        };
        if self.contains(kind, id) {
            return false;
        }
        self.committed.entry(kind).or_default().push(entity);
        true
    }

    /// Add an entity to the loading tier.
    pub fn add_loading(&mut self, entity: EntityRef) -> bool {
        let (kind, id) = {
            let guard = entity.read().expect("entity lock poisoned");
            match guard.id() {
                Some(id) => (guard.kind(), id),
                None => return false,
            }
        };
        if self.lookup_loading(kind, id).is_some() {
            return false;
        }
        self.loading.entry(kind).or_default().push(entity);
        true
    }

    /// Merge the loading tier into the committed tier and clear it.
    ///
    /// Entities whose key is already committed are dropped rather than
    /// duplicated.
    pub fn promote(&mut self) {
        let loading = std::mem::take(&mut self.loading);
        let mut promoted = 0usize;
        for (_, entities) in loading {
            for entity in entities {
                if self.add(entity) {
                    promoted += 1;
                }
            }
        }
        tracing::trace!(promoted, "promoted loading tier");
    }

    /// Empty the loading tier without promoting anything.
    pub fn discard_loading(&mut self) {
        self.loading.clear();
    }

    /// All committed entities of a kind, in insertion order.
    #[must_use]
    pub fn all(&self, kind: &str) -> Vec<EntityRef> {
        self.committed.get(kind).cloned().unwrap_or_default()
    }

    /// Remove an entity from the committed tier by key.
    pub fn remove(&mut self, kind: &str, id: Uuid) -> bool {
        let Some(entities) = self.committed.get_mut(kind) else {
            return false;
        };
        let before = entities.len();
        entities.retain(|e| e.read().expect("entity lock poisoned").id() != Some(id));
        entities.len() < before
    }

    /// Number of committed entities of a kind.
    #[must_use]
    pub fn count(&self, kind: &str) -> usize {
        self.committed.get(kind).map_or(0, Vec::len)
    }

    /// Number of entities currently in the loading tier.
    #[must_use]
    pub fn loading_count(&self) -> usize {
        self.loading.values().map(Vec::len).sum()
    }
}
