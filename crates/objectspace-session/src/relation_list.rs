//! Lazily-loaded to-many association lists.
//!
//! A [`RelationList`] is bound to one owner entity and one association name.
//! Construction (via `ObjectSpace::relation_list`) issues a single query for
//! all target-kind entities whose inverse foreign key equals the owner's
//! primary key. Mutations keep the member foreign-key fields and the list
//! contents in agreement: a removal that cannot clear the foreign key is
//! undone locally and reported as failure instead of leaving the two out of
//! sync.

use crate::object_space::ObjectSpace;
use crate::EntityRef;
use objectspace_core::{
    ConsistencyError, ConsistencyErrorKind, Result, StorageConnection, Value,
};
use std::sync::Arc;

/// The members of one to-many association, bound to their owner.
pub struct RelationList {
    owner: EntityRef,
    target_kind: &'static str,
    /// Property on the target kind holding the foreign key back to the owner.
    foreign_key_field: &'static str,
    items: Vec<EntityRef>,
}

impl RelationList {
    pub(crate) fn new(
        owner: EntityRef,
        target_kind: &'static str,
        foreign_key_field: &'static str,
        items: Vec<EntityRef>,
    ) -> Self {
        Self {
            owner,
            target_kind,
            foreign_key_field,
            items,
        }
    }

    /// The owning entity.
    #[must_use]
    pub fn owner(&self) -> &EntityRef {
        &self.owner
    }

    /// The entity kind of the members.
    #[must_use]
    pub const fn target_kind(&self) -> &'static str {
        self.target_kind
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the given instance is a member.
    #[must_use]
    pub fn contains(&self, item: &EntityRef) -> bool {
        self.items.iter().any(|e| Arc::ptr_eq(e, item))
    }

    /// The member at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&EntityRef> {
        self.items.get(index)
    }

    /// Iterate over the members in list order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityRef> {
        self.items.iter()
    }

    /// Add a member: point its foreign key at the owner (through the
    /// session's change tracker), then append it.
    pub fn add<C: StorageConnection>(
        &mut self,
        os: &mut ObjectSpace<C>,
        item: &EntityRef,
    ) -> Result<()> {
        let item_kind = item.read().expect("entity lock poisoned").kind();
        if item_kind != self.target_kind {
            return Err(ConsistencyError::new(
                ConsistencyErrorKind::KindMismatch,
                format!(
                    "cannot add '{item_kind}' to a list of '{}'",
                    self.target_kind
                ),
            )
            .into());
        }

        let owner_id = self
            .owner
            .read()
            .expect("entity lock poisoned")
            .id()
            .expect("session entities always carry a primary key");
        os.set_value(item, self.foreign_key_field, Value::Uuid(owner_id))?;
        self.items.push(EntityRef::clone(item));
        Ok(())
    }

    /// Remove a member: drop it from the list, then clear its foreign key.
    ///
    /// When clearing the foreign key fails (e.g. the field is NOT NULL), the
    /// member is put back where it was and `false` is returned; list and
    /// backing field never disagree.
    pub fn remove<C: StorageConnection>(
        &mut self,
        os: &mut ObjectSpace<C>,
        item: &EntityRef,
    ) -> bool {
        let Some(position) = self.items.iter().position(|e| Arc::ptr_eq(e, item)) else {
            return false;
        };
        self.items.remove(position);

        match os.set_value(item, self.foreign_key_field, Value::Null) {
            Ok(()) => true,
            Err(error) => {
                tracing::debug!(%error, "reverting list removal");
                self.items.insert(position, EntityRef::clone(item));
                false
            }
        }
    }

    /// Remove each given member individually; `true` only when every removal
    /// succeeded. Partial failure leaves the successfully removed members
    /// removed.
    pub fn remove_all<C: StorageConnection>(
        &mut self,
        os: &mut ObjectSpace<C>,
        items: &[EntityRef],
    ) -> bool {
        let mut all_removed = true;
        for item in items {
            all_removed = self.remove(os, item) && all_removed;
        }
        all_removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objectspace_core::{EntityInfo, EntityInstance, FieldType, MetadataRegistry, ValueCodec};
    use std::sync::RwLock;
    use uuid::Uuid;

    struct PassCodec;

    impl ValueCodec for PassCodec {
        fn storage_type(&self, _field_type: &FieldType, _size: Option<u32>) -> String {
            "TEXT".to_string()
        }

        fn decode(&self, _field_type: &FieldType, raw: &Value) -> Result<Value> {
            Ok(raw.clone())
        }

        fn encode(&self, value: &Value) -> String {
            value.to_string()
        }
    }

    fn entity(kind: &'static str) -> EntityRef {
        let mut registry = MetadataRegistry::new(Arc::new(PassCodec));
        let class = registry.register(EntityInfo::new(kind)).unwrap();
        let mut instance = EntityInstance::new(&class);
        instance.set("id", Value::Uuid(Uuid::new_v4()));
        Arc::new(RwLock::new(instance))
    }

    #[test]
    fn membership_is_instance_identity() {
        let owner = entity("project");
        let member = entity("task");
        let list = RelationList::new(
            owner,
            "task",
            "project",
            vec![EntityRef::clone(&member)],
        );

        assert_eq!(list.len(), 1);
        assert!(list.contains(&member));
        assert!(Arc::ptr_eq(list.get(0).unwrap(), &member));
        assert!(!list.contains(&entity("task")));
    }

    #[test]
    fn iteration_preserves_order() {
        let owner = entity("project");
        let first = entity("task");
        let second = entity("task");
        let list = RelationList::new(
            owner,
            "task",
            "project",
            vec![EntityRef::clone(&first), EntityRef::clone(&second)],
        );

        let order: Vec<bool> = list.iter().map(|e| Arc::ptr_eq(e, &first)).collect();
        assert_eq!(order, vec![true, false]);
    }
}
