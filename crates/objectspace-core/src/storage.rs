//! Collaborator contracts: storage driver and value codec.
//!
//! The session layer never speaks SQL and never touches a wire protocol. It
//! drives a [`StorageConnection`] with descriptors, criteria, entities, and
//! change sets; a concrete driver (together with a statement builder and a
//! [`ValueCodec`]) turns those into dialect statements.

use crate::criteria::WhereClause;
use crate::descriptor::ClassDescriptor;
use crate::entity::EntityInstance;
use crate::error::Result;
use crate::field::FieldType;
use crate::row::Row;
use crate::value::Value;
use uuid::Uuid;

/// Storage connection configuration.
///
/// Deliberately opaque to the core: the connection string's shape is a
/// driver concern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub connection_string: String,
}

impl ConnectionInfo {
    /// Create connection info from a driver-specific connection string.
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
        }
    }
}

/// The changed columns of one entity, as handed to [`StorageConnection::update`].
///
/// Column names are storage names; values are the typed new values. This is
/// the plain-data projection of a session change record.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    /// Entity kind the change belongs to.
    pub kind: &'static str,
    /// Storage table name.
    pub storage_name: &'static str,
    /// Primary key of the changed row.
    pub id: Uuid,
    /// (storage column, new value) pairs.
    pub changes: Vec<(&'static str, Value)>,
}

/// Translates between declared field types and the dialect's value space.
///
/// Implementations must round-trip: decoding the raw storage form of an
/// encoded value yields the original value for every supported field type.
pub trait ValueCodec: Send + Sync {
    /// The dialect type tag for a declared field type (used in DDL).
    fn storage_type(&self, field_type: &FieldType, size: Option<u32>) -> String;

    /// Convert a raw driver value into the typed value for a field.
    fn decode(&self, field_type: &FieldType, raw: &Value) -> Result<Value>;

    /// Render a typed value as dialect literal text for statement embedding.
    fn encode(&self, value: &Value) -> String;
}

/// A synchronous connection to one backing store.
///
/// Calls block until the store answers; failures propagate as
/// `Error::Storage` and abort any enclosing transaction. One connection
/// serves one session at a time.
pub trait StorageConnection {
    /// Open the connection.
    fn connect(&mut self, info: &ConnectionInfo) -> Result<()>;

    /// Fetch the single row with the given primary key, if present.
    ///
    /// Soft-deleted rows are not returned, like
    /// [`fetch_table`](StorageConnection::fetch_table).
    fn fetch_row(&mut self, class: &ClassDescriptor, id: Uuid) -> Result<Option<Row>>;

    /// Fetch all rows of the kind's table matching the criteria.
    ///
    /// Soft-deleted rows are excluded, matching the default select the
    /// statement-building contract produces.
    fn fetch_table(
        &mut self,
        class: &ClassDescriptor,
        clause: Option<&WhereClause>,
    ) -> Result<Vec<Row>>;

    /// Begin a storage-level transaction.
    fn begin_transaction(&mut self) -> Result<()>;

    /// Commit the current transaction.
    fn commit_transaction(&mut self) -> Result<()>;

    /// Roll back the current transaction.
    fn rollback_transaction(&mut self) -> Result<()>;

    /// Insert a new entity row. Scalar columns only; foreign-key columns are
    /// applied by follow-up [`update`](StorageConnection::update) calls so
    /// freshly created object graphs never depend on insert order.
    fn insert(&mut self, class: &ClassDescriptor, entity: &EntityInstance) -> Result<()>;

    /// Apply one entity's changed columns.
    fn update(&mut self, change: &ChangeSet) -> Result<()>;

    /// Execute a raw statement (DDL, maintenance).
    fn execute(&mut self, statement: &str) -> Result<()>;

    /// Emit table creation for every registered kind.
    fn create_schema(&mut self) -> Result<()>;

    /// Diff existing columns against the registered descriptors and add the
    /// missing ones. Never drops or alters existing columns.
    fn update_schema(&mut self) -> Result<()>;
}
