//! ObjectSpace: a metadata-driven object-relational mapping runtime.
//!
//! The runtime materializes rows from a relational store into dynamic
//! in-memory entities, tracks mutations at field granularity, and regenerates
//! storage calls to persist changes back — all driven by metadata registered
//! at startup, with no compile-time knowledge of concrete entity shapes.
//!
//! # Architecture
//!
//! - [`objectspace_core`] — values, rows, errors, criteria, descriptors, the
//!   metadata registry, and the collaborator contracts.
//! - [`objectspace_query`] — the statement-building contract drivers
//!   implement per dialect.
//! - [`objectspace_schema`] — expected-schema computation and the additive
//!   sync planner behind `create_schema`/`update_schema`.
//! - [`objectspace_session`] — the identity cache, change tracker, lazy
//!   relation lists, and the `ObjectSpace` session façade.
//!
//! # Getting started
//!
//! ```ignore
//! use objectspace::prelude::*;
//!
//! // 1. Describe the domain (once, at startup).
//! let mut registry = MetadataRegistry::new(Arc::new(MyCodec));
//! registry.register(
//!     EntityInfo::new("project")
//!         .property(PropertyInfo::new("name", FieldType::Text))
//!         .property(PropertyInfo::new("tasks", FieldType::List("task")).association("project_tasks")),
//! )?;
//! registry.register(
//!     EntityInfo::new("task")
//!         .property(PropertyInfo::new("title", FieldType::Text))
//!         .property(PropertyInfo::new("project", FieldType::Reference("project")).association("project_tasks")),
//! )?;
//! registry.resolve_associations()?;
//! let registry = Arc::new(registry);
//!
//! // 2. Work in sessions.
//! let mut os = ObjectSpace::new(connection, Arc::clone(&registry))?;
//! let project = os.create_object("project")?;
//! os.set_value(&project, "name", Value::Text("atlas".into()))?;
//! os.commit_changes()?;
//! ```

pub use objectspace_core::{
    AssociationDescriptor, CREATED_AT_FIELD, ChangeSet, ClassDescriptor, ComparisonOperator,
    ConfigurationError, ConfigurationErrorKind, ConnectionInfo, ConsistencyError,
    ConsistencyErrorKind, DELETED_FIELD,
    EntityInfo, EntityInstance, Error, FieldType, ID_FIELD, LogicOperator, MetadataRegistry,
    PropertyDescriptor, PropertyInfo, RESERVED_FIELDS, Result, Row, StorageConnection,
    StorageError, StorageErrorKind, UPDATED_AT_FIELD, Value, ValueCodec, WhereClause,
};
pub use objectspace_query::StatementBuilder;
pub use objectspace_schema::{
    ExpectedColumn, ExpectedTable, SchemaAddition, expected_schema, expected_table, plan_additions,
};
pub use objectspace_session::{
    ChangeRecord, ChangeTracker, EntityKey, EntityRef, FieldChange, IdentityCache, ObjectSpace,
    RelationList, SessionState,
};

/// Everything an application needs to register a domain and run sessions.
pub mod prelude {
    pub use crate::{
        ComparisonOperator, ConnectionInfo, EntityInfo, EntityRef, FieldType, MetadataRegistry,
        ObjectSpace, PropertyInfo, Value, WhereClause,
    };
    pub use std::sync::Arc;
}
