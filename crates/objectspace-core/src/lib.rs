//! Core types and contracts for ObjectSpace.
//!
//! This crate provides the foundation the session layer is built on:
//!
//! - `Value` and `Row` as the storage-facing data model
//! - the error taxonomy (`ConfigurationError`, `StorageError`, `ConsistencyError`)
//! - the criteria AST (`WhereClause`) for dialect-independent row filters
//! - declarative entity metadata (`EntityInfo` / `PropertyInfo`) and the
//!   derived descriptors (`ClassDescriptor` / `PropertyDescriptor` /
//!   `AssociationDescriptor`) produced by the `MetadataRegistry`
//! - `EntityInstance`, the dynamic record all sessions operate on
//! - the collaborator contracts: `StorageConnection` and `ValueCodec`

pub mod criteria;
pub mod descriptor;
pub mod entity;
pub mod error;
pub mod field;
pub mod registry;
pub mod row;
pub mod storage;
pub mod value;

pub use criteria::{ComparisonOperator, LogicOperator, WhereClause};
pub use descriptor::{AssociationDescriptor, ClassDescriptor, PropertyDescriptor};
pub use entity::{
    CREATED_AT_FIELD, DELETED_FIELD, ID_FIELD, RESERVED_FIELDS, UPDATED_AT_FIELD, EntityInstance,
};
pub use error::{
    ConfigurationError, ConfigurationErrorKind, ConsistencyError, ConsistencyErrorKind, Error,
    Result, StorageError, StorageErrorKind,
};
pub use field::{EntityInfo, FieldType, PropertyInfo};
pub use registry::MetadataRegistry;
pub use row::Row;
pub use storage::{ChangeSet, ConnectionInfo, StorageConnection, ValueCodec};
pub use value::Value;
