//! The session orchestrator.
//!
//! `ObjectSpace` is the façade applications talk to: object creation, lookup
//! (cache-first, then storage), refresh, tracked mutation, and transactional
//! commit/rollback. It owns one storage connection, one identity cache, and
//! one change tracker; the metadata registry is shared, resolved, and
//! read-only by the time a session exists.

use crate::change_tracker::ChangeTracker;
use crate::identity_cache::IdentityCache;
use crate::relation_list::RelationList;
use crate::{EntityKey, EntityRef, SessionState};
use chrono::Utc;
use objectspace_core::{
    CREATED_AT_FIELD, ClassDescriptor, ConfigurationError, ConfigurationErrorKind,
    ConsistencyError, ConsistencyErrorKind, DELETED_FIELD, EntityInstance, ID_FIELD,
    MetadataRegistry, PropertyDescriptor, Result, Row, StorageConnection, StorageError,
    StorageErrorKind, UPDATED_AT_FIELD, Value, WhereClause,
};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// One unit-of-work session over a storage connection.
pub struct ObjectSpace<C: StorageConnection> {
    connection: C,
    registry: Arc<MetadataRegistry>,
    cache: IdentityCache,
    tracker: ChangeTracker,
    created: Vec<EntityRef>,
    created_keys: HashSet<EntityKey>,
    load_depth: usize,
    in_transaction: bool,
}

impl<C: StorageConnection> ObjectSpace<C> {
    /// Create a session.
    ///
    /// Fails with a `ConfigurationError` when association resolution has not
    /// run — materialization needs the primary-key descriptors of referenced
    /// kinds.
    pub fn new(connection: C, registry: Arc<MetadataRegistry>) -> Result<Self> {
        if !registry.is_resolved() {
            return Err(ConfigurationError::new(
                ConfigurationErrorKind::Unresolved,
                "resolve_associations() must run before a session is created",
            )
            .into());
        }
        Ok(Self {
            connection,
            registry,
            cache: IdentityCache::new(),
            tracker: ChangeTracker::new(),
            created: Vec::new(),
            created_keys: HashSet::new(),
            load_depth: 0,
            in_transaction: false,
        })
    }

    /// Create a session and immediately load the full extent of every
    /// registered kind.
    pub fn refreshed(connection: C, registry: Arc<MetadataRegistry>) -> Result<Self> {
        let mut space = Self::new(connection, registry)?;
        space.refresh()?;
        Ok(space)
    }

    /// What the session is currently doing.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        if self.in_transaction {
            SessionState::InTransaction
        } else if self.load_depth > 0 {
            SessionState::BulkLoading
        } else {
            SessionState::Idle
        }
    }

    /// The shared metadata registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<MetadataRegistry> {
        &self.registry
    }

    /// The change tracker, for inspection.
    #[must_use]
    pub fn changes(&self) -> &ChangeTracker {
        &self.tracker
    }

    /// Number of entities pending creation.
    #[must_use]
    pub fn pending_creation_count(&self) -> usize {
        self.created.len()
    }

    /// Whether a commit would issue any storage writes.
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        !self.created.is_empty() || self.tracker.has_changes()
    }

    /// Allocate a new entity of the given kind.
    ///
    /// The instance gets a fresh primary key and timestamps, joins the
    /// identity cache, and is registered as pending creation; it reaches
    /// storage on the next `commit_changes`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn create_object(&mut self, kind: &str) -> Result<EntityRef> {
        let class = self.registry.require_descriptor(kind)?;

        let mut entity = EntityInstance::new(&class);
        let id = Uuid::new_v4();
        let now = Utc::now();
        entity.set(ID_FIELD, Value::Uuid(id));
        entity.set(CREATED_AT_FIELD, Value::Timestamp(now));
        entity.set(UPDATED_AT_FIELD, Value::Timestamp(now));
        entity.set(DELETED_FIELD, Value::Bool(false));

        let entity_ref: EntityRef = Arc::new(RwLock::new(entity));
        self.created.push(EntityRef::clone(&entity_ref));
        self.created_keys.insert(EntityKey::new(class.kind(), id));
        self.cache.add(EntityRef::clone(&entity_ref));

        tracing::debug!(kind = class.kind(), %id, "created pending entity");
        Ok(entity_ref)
    }

    /// Get one entity by primary key.
    ///
    /// The committed cache tier is consulted first; on a miss, and only when
    /// `allow_storage_fetch` is set, a single-row query is issued and the row
    /// materialized.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn get_object(
        &mut self,
        kind: &str,
        id: Uuid,
        allow_storage_fetch: bool,
    ) -> Result<Option<EntityRef>> {
        let class = self.registry.require_descriptor(kind)?;

        if let Some(existing) = self.cache.lookup(class.kind(), id) {
            return Ok(Some(existing));
        }
        if !allow_storage_fetch {
            return Ok(None);
        }

        let Some(row) = self.connection.fetch_row(&class, id)? else {
            return Ok(None);
        };
        let outcome = self.materialize(&class, &row).map(Some);
        self.complete_load(outcome)
    }

    /// Get all cached entities of a kind, optionally re-synchronizing the
    /// kind's full extent from storage first.
    ///
    /// Refresh only adds rows not already present by key; rows deleted or
    /// changed upstream are not detected.
    pub fn get_objects(&mut self, kind: &str, refresh: bool) -> Result<Vec<EntityRef>> {
        let class = self.registry.require_descriptor(kind)?;
        if refresh {
            let outcome = self.refresh_kind(&class);
            self.complete_load(outcome)?;
        }
        Ok(self.cache.all(class.kind()))
    }

    /// Re-synchronize every registered kind from storage, then promote the
    /// load once.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn refresh(&mut self) -> Result<()> {
        let mut outcome = Ok(());
        for class in self.registry.descriptors() {
            outcome = self.refresh_kind(&class);
            if outcome.is_err() {
                break;
            }
        }
        self.complete_load(outcome)
    }

    /// Query storage for all rows of a kind matching the criteria.
    ///
    /// Every row is materialized; rows whose key is already live in either
    /// cache tier reuse the existing instance instead of creating a second
    /// one.
    #[tracing::instrument(level = "debug", skip(self, clause))]
    pub fn query(&mut self, kind: &str, clause: Option<&WhereClause>) -> Result<Vec<EntityRef>> {
        let class = self.registry.require_descriptor(kind)?;
        let rows = self.connection.fetch_table(&class, clause)?;
        let outcome = self.load_rows(&class, &rows);
        self.complete_load(outcome)
    }

    /// Tracked field assignment.
    ///
    /// No-op when the value equals the field's current value. Fails with a
    /// `ConsistencyError` when NULL is assigned to a NOT NULL field, and with
    /// a `ConfigurationError` for fields the descriptor does not know.
    /// During bulk loads the assignment happens without a change record.
    pub fn set_value(&mut self, entity: &EntityRef, field: &str, value: Value) -> Result<()> {
        let kind = entity.read().expect("entity lock poisoned").kind();
        let class = self.registry.require_descriptor(kind)?;
        let property = Arc::clone(class.property(field).ok_or_else(|| {
            ConfigurationError::new(
                ConfigurationErrorKind::UnknownProperty,
                format!("kind '{kind}' has no property '{field}'"),
            )
        })?);

        let current = entity
            .read()
            .expect("entity lock poisoned")
            .get(property.name());
        if value == current {
            return Ok(());
        }
        if value.is_null() && property.is_not_null() {
            return Err(ConsistencyError::not_null(kind, property.name()).into());
        }

        if self.load_depth == 0 && property.is_persistent() {
            let key = {
                let guard = entity.read().expect("entity lock poisoned");
                EntityKey::of(&guard)
            };
            if let Some(key) = key {
                self.tracker
                    .record(key, entity, property.name(), value.clone(), current);
            }
        }

        entity
            .write()
            .expect("entity lock poisoned")
            .set(property.name(), value);
        Ok(())
    }

    /// Tracked to-one relation assignment.
    ///
    /// Sets the foreign-key field to the target's primary key and, for
    /// bidirectional pairs with a single-valued inverse, points the inverse
    /// back at this entity.
    pub fn set_relation(&mut self, entity: &EntityRef, field: &str, target: &EntityRef) -> Result<()> {
        let kind = entity.read().expect("entity lock poisoned").kind();
        let class = self.registry.require_descriptor(kind)?;
        let property = class.property(field).ok_or_else(|| {
            ConfigurationError::new(
                ConfigurationErrorKind::UnknownProperty,
                format!("kind '{kind}' has no property '{field}'"),
            )
        })?;
        if !property.is_reference() {
            return Err(ConfigurationError::new(
                ConfigurationErrorKind::InvalidDeclaration,
                format!("property '{field}' on '{kind}' is not a to-one relation"),
            )
            .into());
        }
        let association = property.require_association()?;

        let (target_kind, target_id) = {
            let guard = target.read().expect("entity lock poisoned");
            (guard.kind(), guard.id())
        };
        if target_kind != association.target_kind() {
            return Err(ConsistencyError::new(
                ConsistencyErrorKind::KindMismatch,
                format!(
                    "relation '{kind}.{field}' expects '{}', got '{target_kind}'",
                    association.target_kind()
                ),
            )
            .into());
        }
        let target_id = target_id.expect("session entities always carry a primary key");
        let inverse = association.single_valued_inverse().cloned();

        self.set_value(entity, field, Value::Uuid(target_id))?;

        if let Some(inverse) = inverse {
            let entity_id = entity
                .read()
                .expect("entity lock poisoned")
                .id()
                .expect("session entities always carry a primary key");
            target
                .write()
                .expect("entity lock poisoned")
                .set(inverse.name(), Value::Uuid(entity_id));
        }
        Ok(())
    }

    /// Resolve a to-one relation handle to the live instance, if the session
    /// holds one. Purely cache-scoped; use [`get_object`](Self::get_object)
    /// with storage fetch allowed to pull a missing target in.
    pub fn get_relation(&mut self, entity: &EntityRef, field: &str) -> Result<Option<EntityRef>> {
        let kind = entity.read().expect("entity lock poisoned").kind();
        let class = self.registry.require_descriptor(kind)?;
        let property = class.property(field).ok_or_else(|| {
            ConfigurationError::new(
                ConfigurationErrorKind::UnknownProperty,
                format!("kind '{kind}' has no property '{field}'"),
            )
        })?;
        if !property.is_reference() {
            return Err(ConfigurationError::new(
                ConfigurationErrorKind::InvalidDeclaration,
                format!("property '{field}' on '{kind}' is not a to-one relation"),
            )
            .into());
        }
        let association = property.require_association()?;

        let target_id = entity
            .read()
            .expect("entity lock poisoned")
            .get(property.name());
        let Some(target_id) = target_id.as_uuid() else {
            return Ok(None);
        };
        let target_kind = association.target_kind();
        Ok(self
            .cache
            .lookup(target_kind, target_id)
            .or_else(|| self.cache.lookup_loading(target_kind, target_id)))
    }

    /// Build the lazy member list of a named to-many association.
    ///
    /// Issues one query for all target-kind entities whose foreign key
    /// equals the owner's primary key.
    pub fn relation_list(&mut self, owner: &EntityRef, association_name: &str) -> Result<RelationList> {
        let kind = owner.read().expect("entity lock poisoned").kind();
        let class = self.registry.require_descriptor(kind)?;
        let list_property = class
            .association_property(association_name)
            .filter(|p| p.is_list())
            .ok_or_else(|| {
                ConfigurationError::new(
                    ConfigurationErrorKind::UnknownProperty,
                    format!("kind '{kind}' has no to-many association '{association_name}'"),
                )
            })?;
        let association = list_property.require_association()?;
        let inverse = association.inverse().ok_or_else(|| {
            ConfigurationError::new(
                ConfigurationErrorKind::InvalidDeclaration,
                format!(
                    "association '{association_name}' has no inverse on '{}'; \
                     to-many loading needs a named pair",
                    association.target_kind()
                ),
            )
        })?;

        let owner_id = owner
            .read()
            .expect("entity lock poisoned")
            .id()
            .expect("session entities always carry a primary key");
        let clause = WhereClause::equals(inverse.storage_name(), Value::Uuid(owner_id));
        let target_kind = association.target_kind();
        let foreign_key_field = inverse.name();

        let items = self.query(target_kind, Some(&clause))?;
        Ok(RelationList::new(
            EntityRef::clone(owner),
            target_kind,
            foreign_key_field,
            items,
        ))
    }

    /// Soft-delete: a tracked assignment of the deleted flag.
    pub fn delete(&mut self, entity: &EntityRef) -> Result<()> {
        self.set_value(entity, DELETED_FIELD, Value::Bool(true))
    }

    /// Persist all pending creations and tracked changes in one storage
    /// transaction.
    ///
    /// On failure the storage transaction is rolled back and the pending
    /// in-memory state is left untouched, so the caller can inspect, retry,
    /// or roll back explicitly. On success both pending sets are cleared.
    #[tracing::instrument(level = "debug", skip(self), fields(
        pending = self.created.len(),
        changed = self.tracker.len(),
    ))]
    pub fn commit_changes(&mut self) -> Result<()> {
        self.connection.begin_transaction()?;
        self.in_transaction = true;

        let applied = self.apply_pending();
        let outcome = match applied {
            Ok(()) => match self.connection.commit_transaction() {
                Ok(()) => {
                    self.created.clear();
                    self.created_keys.clear();
                    self.tracker.clear();
                    Ok(())
                }
                Err(error) => {
                    let _ = self.connection.rollback_transaction();
                    Err(error)
                }
            },
            Err(error) => {
                let _ = self.connection.rollback_transaction();
                Err(error)
            }
        };

        self.in_transaction = false;
        outcome
    }

    /// Undo all tracked changes in memory and drop pending creations.
    ///
    /// Never-persisted instances are evicted from the identity cache; the
    /// tracker's rollback itself always succeeds.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn rollback_changes(&mut self) {
        self.tracker.rollback();
        for entity in self.created.drain(..) {
            let (kind, id) = {
                let guard = entity.read().expect("entity lock poisoned");
                (guard.kind(), guard.id())
            };
            if let Some(id) = id {
                self.cache.remove(kind, id);
            }
        }
        self.created_keys.clear();
    }

    // ------------------------------------------------------------------
    // internals
    // ------------------------------------------------------------------

    /// Finish a top-level bulk load: promote on success, drop the partial
    /// loading tier on failure.
    fn complete_load<T>(&mut self, outcome: Result<T>) -> Result<T> {
        if self.load_depth == 0 {
            match &outcome {
                Ok(_) => self.cache.promote(),
                Err(_) => self.cache.discard_loading(),
            }
        }
        outcome
    }

    /// Materialize a batch of rows, reusing any instance already live in
    /// either cache tier.
    fn load_rows(&mut self, class: &Arc<ClassDescriptor>, rows: &[Row]) -> Result<Vec<EntityRef>> {
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let id = self.row_id(class, row)?;
            let existing = self
                .cache
                .lookup_loading(class.kind(), id)
                .or_else(|| self.cache.lookup(class.kind(), id));
            let entity = match existing {
                Some(entity) => entity,
                None => self.materialize(class, row)?,
            };
            results.push(entity);
        }
        Ok(results)
    }

    /// Issue the inserts and updates of a commit, in that order.
    fn apply_pending(&mut self) -> Result<()> {
        let pending: Vec<EntityRef> = self.created.clone();

        // A newly created entity's to-one relations may have been assigned
        // outside the tracked path; promote them into tracked changes so the
        // follow-up updates persist them. Inserts carry scalar columns only,
        // which keeps creation order independent of reference order.
        for entity in &pending {
            let (kind, key) = {
                let guard = entity.read().expect("entity lock poisoned");
                (guard.kind(), EntityKey::of(&guard))
            };
            let Some(key) = key else { continue };
            let class = self.registry.require_descriptor(kind)?;

            let relation_values: Vec<(&'static str, Value)> = {
                let guard = entity.read().expect("entity lock poisoned");
                class
                    .properties()
                    .iter()
                    .filter(|p| p.is_reference())
                    .filter_map(|p| {
                        guard.get(p.name()).as_uuid().map(|id| (p.name(), Value::Uuid(id)))
                    })
                    .collect()
            };
            for (field, value) in relation_values {
                if !self.tracker.is_tracked(&key, field) {
                    self.tracker.record(key, entity, field, value, Value::Null);
                }
            }
        }

        for entity in &pending {
            let kind = entity.read().expect("entity lock poisoned").kind();
            let class = self.registry.require_descriptor(kind)?;
            let guard = entity.read().expect("entity lock poisoned");
            self.connection.insert(&class, &guard)?;
        }

        let change_sets = self.tracker.change_sets(&self.registry)?;
        for change_set in &change_sets {
            self.connection.update(change_set)?;
        }
        Ok(())
    }

    /// Load the kind's full extent, materializing only rows whose key is not
    /// already live in either tier.
    fn refresh_kind(&mut self, class: &Arc<ClassDescriptor>) -> Result<()> {
        let rows = self.connection.fetch_table(class, None)?;
        for row in &rows {
            let id = self.row_id(class, row)?;
            if self.cache.lookup_loading(class.kind(), id).is_some()
                || self.cache.lookup(class.kind(), id).is_some()
            {
                continue;
            }
            self.materialize(class, row)?;
        }
        Ok(())
    }

    /// Decode a row's primary key.
    fn row_id(&self, class: &ClassDescriptor, row: &Row) -> Result<Uuid> {
        let pk = class.primary_key();
        let raw = row.get(pk.storage_name());
        let decoded = self.registry.codec().decode(&pk.field_type(), &raw)?;
        decoded.as_uuid().ok_or_else(|| {
            StorageError::new(
                StorageErrorKind::Decode,
                format!("row for '{}' has no usable primary key", class.kind()),
            )
            .into()
        })
    }

    /// Materialize one row into the loading tier, resolving to-one
    /// references. Change tracking is suppressed for the whole pass.
    fn materialize(&mut self, class: &Arc<ClassDescriptor>, row: &Row) -> Result<EntityRef> {
        self.load_depth += 1;
        let result = self.materialize_inner(class, row);
        self.load_depth -= 1;
        result
    }

    fn materialize_inner(&mut self, class: &Arc<ClassDescriptor>, row: &Row) -> Result<EntityRef> {
        let entity_id = self.row_id(class, row)?;
        let codec = Arc::clone(self.registry.codec());

        let mut entity = EntityInstance::new(class);
        for property in class.value_properties() {
            let raw = row.get(property.storage_name());
            let decoded = codec.decode(&property.field_type(), &raw)?;
            entity.set(property.name(), decoded);
        }

        let entity_ref: EntityRef = Arc::new(RwLock::new(entity));
        self.cache.add_loading(EntityRef::clone(&entity_ref));

        let references: Vec<Arc<PropertyDescriptor>> = class
            .properties()
            .iter()
            .filter(|p| p.is_reference())
            .map(Arc::clone)
            .collect();

        for property in references {
            let raw = row.get(property.storage_name());
            let decoded = codec.decode(&property.field_type(), &raw)?;
            let Some(target_id) = decoded.as_uuid() else {
                continue;
            };
            let association = property.require_association()?;
            let target_kind = association.target_kind();

            // reuse an instance from the current load pass or a prior one
            // before going back to storage
            let referenced = self
                .cache
                .lookup_loading(target_kind, target_id)
                .or_else(|| self.cache.lookup(target_kind, target_id));
            let referenced = match referenced {
                Some(found) => Some(found),
                None => self.get_object(target_kind, target_id, true)?,
            };

            entity_ref
                .write()
                .expect("entity lock poisoned")
                .set(property.name(), Value::Uuid(target_id));

            if let (Some(referenced), Some(inverse)) =
                (referenced, association.single_valued_inverse())
            {
                referenced
                    .write()
                    .expect("entity lock poisoned")
                    .set(inverse.name(), Value::Uuid(entity_id));
            }
        }

        Ok(entity_ref)
    }
}
