//! Error types for ObjectSpace operations.
//!
//! Three families cover the whole runtime:
//!
//! - [`ConfigurationError`] — metadata misuse (unregistered kinds, unresolved
//!   associations, malformed entity declarations). Fatal; never retried.
//! - [`StorageError`] — a storage collaborator call failed. Aborts the
//!   enclosing transaction; the in-memory session state is left intact so the
//!   caller can inspect or retry.
//! - [`ConsistencyError`] — a mutation would break an invariant the session
//!   enforces (e.g. nulling a NOT NULL foreign key). Surfaced at the boundary
//!   that can partially fail, never via panics.

use std::fmt;

/// The primary error type for all ObjectSpace operations.
#[derive(Debug)]
pub enum Error {
    /// Metadata/registration errors
    Configuration(ConfigurationError),
    /// Storage collaborator errors (connection, query, transaction)
    Storage(StorageError),
    /// In-memory invariant violations
    Consistency(ConsistencyError),
}

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct ConfigurationError {
    pub kind: ConfigurationErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationErrorKind {
    /// A kind was referenced that was never registered
    UnknownKind,
    /// An entity declaration is malformed (duplicate/invalid properties)
    InvalidDeclaration,
    /// Association metadata was requested before `resolve_associations` ran
    Unresolved,
    /// A registered entity ended up without a usable primary key
    MissingPrimaryKey,
    /// A field name does not exist on the entity's descriptor
    UnknownProperty,
}

#[derive(Debug)]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// Failed to establish or use the connection
    Connect,
    /// A read (single-row or table fetch) failed
    Query,
    /// A write (insert/update/raw execute) failed
    Execute,
    /// Begin/commit/rollback failed
    Transaction,
    /// A raw value could not be decoded into the declared field type
    Decode,
}

#[derive(Debug)]
pub struct ConsistencyError {
    pub kind: ConsistencyErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyErrorKind {
    /// A NOT NULL field would be assigned NULL
    NotNullViolation,
    /// A relation field would be assigned a value of the wrong entity kind
    KindMismatch,
}

impl ConfigurationError {
    pub fn new(kind: ConfigurationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Convenience for the most common case: a kind nobody registered.
    pub fn unknown_kind(kind_name: &str) -> Self {
        Self::new(
            ConfigurationErrorKind::UnknownKind,
            format!("entity kind '{kind_name}' is not registered"),
        )
    }
}

impl StorageError {
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: Box<dyn std::error::Error + Send + Sync>) -> Self {
        self.source = Some(source);
        self
    }
}

impl ConsistencyError {
    pub fn new(kind: ConsistencyErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_null(kind_name: &str, field: &str) -> Self {
        Self::new(
            ConsistencyErrorKind::NotNullViolation,
            format!("field '{field}' on '{kind_name}' is NOT NULL and cannot be cleared"),
        )
    }
}

impl Error {
    /// Whether retrying the failed operation can possibly succeed.
    ///
    /// Configuration and consistency errors are deterministic; only storage
    /// failures may be transient.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Error::Storage(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration(e) => write!(f, "Configuration error: {}", e.message),
            Error::Storage(e) => write!(f, "Storage error: {}", e.message),
            Error::Consistency(e) => write!(f, "Consistency error: {}", e.message),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ConsistencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Storage(e) => e
                .source
                .as_deref()
                .map(|s| s as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigurationError {}
impl std::error::Error for StorageError {}
impl std::error::Error for ConsistencyError {}

impl From<ConfigurationError> for Error {
    fn from(e: ConfigurationError) -> Self {
        Error::Configuration(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::Storage(e)
    }
}

impl From<ConsistencyError> for Error {
    fn from(e: ConsistencyError) -> Self {
        Error::Consistency(e)
    }
}
