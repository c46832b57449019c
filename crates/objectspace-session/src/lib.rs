//! Session layer for ObjectSpace: the unit-of-work façade.
//!
//! One [`ObjectSpace`] serves one logical unit of work. It coordinates:
//!
//! - **Identity**: the two-tier [`IdentityCache`] guarantees at most one live
//!   instance per (kind, primary key) within the session.
//! - **Change tracking**: the [`ChangeTracker`] records field-level diffs and
//!   supports in-memory rollback.
//! - **Associations**: [`RelationList`] loads to-many members lazily and
//!   keeps member foreign keys in sync with list mutations.
//! - **Persistence**: `commit_changes` turns pending creations and tracked
//!   diffs into storage calls inside a single storage transaction.
//!
//! Sessions are isolated: two sessions loading the same row hold two
//! independent instances, and no state is shared between them.
//!
//! # Example
//!
//! ```ignore
//! let mut os = ObjectSpace::new(connection, registry)?;
//!
//! let project = os.create_object("project")?;
//! os.set_value(&project, "name", Value::Text("atlas".into()))?;
//!
//! let task = os.create_object("task")?;
//! os.set_relation(&task, "project", &project)?;
//!
//! os.commit_changes()?;
//! ```

pub mod change_tracker;
pub mod identity_cache;
pub mod object_space;
pub mod relation_list;

pub use change_tracker::{ChangeRecord, ChangeTracker, FieldChange};
pub use identity_cache::IdentityCache;
pub use object_space::ObjectSpace;
pub use relation_list::RelationList;

use objectspace_core::EntityInstance;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// A shared handle to one in-memory entity.
///
/// Handing out clones of the same `Arc` is what makes identity observable:
/// two lookups of the same (kind, key) compare equal with `Arc::ptr_eq`.
pub type EntityRef = Arc<RwLock<EntityInstance>>;

/// Unique key of an entity within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKey {
    kind: &'static str,
    id: Uuid,
}

impl EntityKey {
    /// Create a key from its parts.
    #[must_use]
    pub const fn new(kind: &'static str, id: Uuid) -> Self {
        Self { kind, id }
    }

    /// The key of an instance, once its primary key is assigned.
    #[must_use]
    pub fn of(entity: &EntityInstance) -> Option<Self> {
        entity.id().map(|id| Self::new(entity.kind(), id))
    }

    /// The entity kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    /// The primary key.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }
}

/// What a session is currently doing.
///
/// Bulk loading suppresses change tracking — materialization writes are not
/// user edits. The in-transaction state covers the storage calls issued by
/// `commit_changes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    BulkLoading,
    InTransaction,
}
