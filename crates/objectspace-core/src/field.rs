//! Declarative entity metadata.
//!
//! Entity kinds register themselves with plain data: an [`EntityInfo`]
//! carrying one [`PropertyInfo`] per declared property. No reflection is
//! involved; a codegen step or a hand-written registration function provides
//! these at startup, and the `MetadataRegistry` derives immutable descriptors
//! from them.

/// The declared type of a property.
///
/// Scalar variants map to one storage column of the corresponding kind.
/// `Reference` is a to-one relation (stored as the target's primary key);
/// `List` is a to-many relation (no column of its own — backed by the
/// target-side foreign key).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Uuid,
    Text,
    Integer,
    Double,
    Boolean,
    Timestamp,
    /// To-one relation to the named entity kind.
    Reference(&'static str),
    /// To-many relation to the named entity kind.
    List(&'static str),
}

impl FieldType {
    /// Check whether this is a relation type (to-one or to-many).
    #[must_use]
    pub const fn is_relation(&self) -> bool {
        matches!(self, FieldType::Reference(_) | FieldType::List(_))
    }

    /// The related entity kind, if this is a relation type.
    #[must_use]
    pub const fn related_kind(&self) -> Option<&'static str> {
        match self {
            FieldType::Reference(kind) | FieldType::List(kind) => Some(kind),
            _ => None,
        }
    }
}

/// Declarative metadata for one property.
///
/// Built with the const builder methods, mirroring how a declaration site
/// reads:
///
/// ```
/// use objectspace_core::{FieldType, PropertyInfo};
///
/// let p = PropertyInfo::new("project", FieldType::Reference("project"))
///     .association("project_tasks")
///     .not_null(true);
/// ```
#[derive(Debug, Clone)]
pub struct PropertyInfo {
    /// Logical property name
    pub name: &'static str,
    /// Declared type
    pub field_type: FieldType,
    /// Storage column name override (defaults to `name`)
    pub storage_name: Option<&'static str>,
    /// Size hint passed to the codec's storage-type computation
    pub size: Option<u32>,
    /// Whether this property is the primary key
    pub primary_key: bool,
    /// Whether NULL assignments are rejected
    pub not_null: bool,
    /// Whether the storage layer assigns values on insert
    pub auto_increment: bool,
    /// Property-level persistent marker
    pub persistent: bool,
    /// Explicit exclusion from persistence
    pub transient: bool,
    /// Association name pairing this relation with its inverse
    pub association: Option<&'static str>,
}

impl PropertyInfo {
    /// Create a property with the given name and declared type.
    pub const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            storage_name: None,
            size: None,
            primary_key: false,
            not_null: false,
            auto_increment: false,
            persistent: false,
            transient: false,
            association: None,
        }
    }

    /// Override the storage column name.
    pub const fn storage_name(mut self, name: &'static str) -> Self {
        self.storage_name = Some(name);
        self
    }

    /// Set the size hint (e.g. VARCHAR length).
    pub const fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Mark as the primary key.
    pub const fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Mark as NOT NULL.
    pub const fn not_null(mut self, value: bool) -> Self {
        self.not_null = value;
        self
    }

    /// Mark as auto-incrementing.
    pub const fn auto_increment(mut self, value: bool) -> Self {
        self.auto_increment = value;
        self
    }

    /// Mark as persistent regardless of the entity-level marker.
    pub const fn persistent(mut self, value: bool) -> Self {
        self.persistent = value;
        self
    }

    /// Exclude from persistence regardless of other markers.
    pub const fn transient(mut self, value: bool) -> Self {
        self.transient = value;
        self
    }

    /// Name the association this relation participates in.
    pub const fn association(mut self, name: &'static str) -> Self {
        self.association = Some(name);
        self
    }
}

/// Declarative metadata for one entity kind.
#[derive(Debug, Clone)]
pub struct EntityInfo {
    /// Unique kind key
    pub kind: &'static str,
    /// Storage table name override (defaults to `kind`)
    pub storage_name: Option<&'static str>,
    /// Entity-level persistent marker: all non-transient properties persist
    pub persistent: bool,
    /// Declared properties (reserved properties are injected at registration)
    pub properties: Vec<PropertyInfo>,
}

impl EntityInfo {
    /// Create an entity declaration with the entity-level persistent marker
    /// set, which is the common case.
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            storage_name: None,
            persistent: true,
            properties: Vec::new(),
        }
    }

    /// Override the storage table name.
    #[must_use]
    pub fn storage_name(mut self, name: &'static str) -> Self {
        self.storage_name = Some(name);
        self
    }

    /// Clear the entity-level persistent marker; only properties carrying
    /// their own marker will persist.
    #[must_use]
    pub fn persistent(mut self, value: bool) -> Self {
        self.persistent = value;
        self
    }

    /// Add a property declaration.
    #[must_use]
    pub fn property(mut self, property: PropertyInfo) -> Self {
        self.properties.push(property);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_classification() {
        assert!(FieldType::Reference("project").is_relation());
        assert!(FieldType::List("task").is_relation());
        assert!(!FieldType::Text.is_relation());
        assert_eq!(FieldType::Reference("project").related_kind(), Some("project"));
        assert_eq!(FieldType::Integer.related_kind(), None);
    }

    #[test]
    fn builder_defaults() {
        let p = PropertyInfo::new("title", FieldType::Text);
        assert_eq!(p.name, "title");
        assert!(p.storage_name.is_none());
        assert!(!p.primary_key);
        assert!(!p.transient);

        let p = p.storage_name("TITLE").size(64).not_null(true);
        assert_eq!(p.storage_name, Some("TITLE"));
        assert_eq!(p.size, Some(64));
        assert!(p.not_null);
    }

    #[test]
    fn entity_builder_collects_properties() {
        let info = EntityInfo::new("task")
            .property(PropertyInfo::new("title", FieldType::Text))
            .property(PropertyInfo::new("project", FieldType::Reference("project")));
        assert_eq!(info.kind, "task");
        assert!(info.persistent);
        assert_eq!(info.properties.len(), 2);
    }
}
