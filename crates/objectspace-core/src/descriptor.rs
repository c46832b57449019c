//! Derived, immutable persistence metadata.
//!
//! Descriptors are computed once per entity kind by the `MetadataRegistry`
//! and shared read-only for the process lifetime. Association descriptors are
//! published in a second phase (`resolve_associations`), after every
//! participating kind is registered.

use crate::error::{ConfigurationError, ConfigurationErrorKind, Result};
use crate::field::FieldType;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Metadata for one persistable property.
#[derive(Debug)]
pub struct PropertyDescriptor {
    name: &'static str,
    storage_name: &'static str,
    field_type: FieldType,
    storage_type: String,
    size: Option<u32>,
    primary_key: bool,
    not_null: bool,
    auto_increment: bool,
    persistent: bool,
    association_name: Option<&'static str>,
    association: OnceLock<Arc<AssociationDescriptor>>,
}

impl PropertyDescriptor {
    #[allow(clippy::fn_params_excessive_bools, clippy::too_many_arguments)]
    pub(crate) fn new(
        name: &'static str,
        storage_name: &'static str,
        field_type: FieldType,
        storage_type: String,
        size: Option<u32>,
        primary_key: bool,
        not_null: bool,
        auto_increment: bool,
        persistent: bool,
        association_name: Option<&'static str>,
    ) -> Self {
        Self {
            name,
            storage_name,
            field_type,
            storage_type,
            size,
            primary_key,
            not_null,
            auto_increment,
            persistent,
            association_name,
            association: OnceLock::new(),
        }
    }

    /// Logical property name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Storage column name.
    #[must_use]
    pub const fn storage_name(&self) -> &'static str {
        self.storage_name
    }

    /// Declared field type.
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Dialect storage type tag computed by the codec at registration.
    #[must_use]
    pub fn storage_type(&self) -> &str {
        &self.storage_type
    }

    /// Declared size hint, if any.
    #[must_use]
    pub const fn size(&self) -> Option<u32> {
        self.size
    }

    /// Whether this property is the primary key.
    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// Whether NULL assignments are rejected.
    #[must_use]
    pub const fn is_not_null(&self) -> bool {
        self.not_null
    }

    /// Whether the storage layer assigns values on insert.
    #[must_use]
    pub const fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    /// Whether this property maps to a storage column.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Whether this is a persistent to-one relation (foreign-key column).
    #[must_use]
    pub const fn is_reference(&self) -> bool {
        matches!(self.field_type, FieldType::Reference(_)) && self.persistent
    }

    /// Whether this is a to-many relation.
    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self.field_type, FieldType::List(_))
    }

    /// Whether this property participates in association resolution.
    ///
    /// Persistent to-one references always do; to-many lists only when they
    /// declare an association name pairing them with the owning side.
    #[must_use]
    pub const fn is_relation(&self) -> bool {
        self.is_reference() || (self.is_list() && self.association_name.is_some())
    }

    /// The association name declared on this property, if any.
    #[must_use]
    pub const fn association_name(&self) -> Option<&'static str> {
        self.association_name
    }

    /// The resolved association, if resolution has run.
    #[must_use]
    pub fn association(&self) -> Option<&Arc<AssociationDescriptor>> {
        self.association.get()
    }

    /// The resolved association, or a `ConfigurationError` when resolution
    /// has not run (or this is not a relation property).
    pub fn require_association(&self) -> Result<&Arc<AssociationDescriptor>> {
        self.association.get().ok_or_else(|| {
            ConfigurationError::new(
                ConfigurationErrorKind::Unresolved,
                format!(
                    "association on property '{}' is not resolved; \
                     call resolve_associations() after registering all kinds",
                    self.name
                ),
            )
            .into()
        })
    }

    /// Publish the association descriptor. Later calls are no-ops, which is
    /// what makes re-running resolution idempotent.
    pub(crate) fn publish_association(&self, association: Arc<AssociationDescriptor>) {
        let _ = self.association.set(association);
    }
}

/// One directed relation edge between two entity kinds.
#[derive(Debug)]
pub struct AssociationDescriptor {
    name: Option<&'static str>,
    target_kind: &'static str,
    target_storage_name: &'static str,
    target_primary_key: Arc<PropertyDescriptor>,
    inverse: Option<Arc<PropertyDescriptor>>,
}

impl AssociationDescriptor {
    pub(crate) fn new(
        name: Option<&'static str>,
        target_kind: &'static str,
        target_storage_name: &'static str,
        target_primary_key: Arc<PropertyDescriptor>,
        inverse: Option<Arc<PropertyDescriptor>>,
    ) -> Self {
        Self {
            name,
            target_kind,
            target_storage_name,
            target_primary_key,
            inverse,
        }
    }

    /// The association name, if the relation declared one.
    #[must_use]
    pub const fn name(&self) -> Option<&'static str> {
        self.name
    }

    /// The entity kind on the far side of the edge.
    #[must_use]
    pub const fn target_kind(&self) -> &'static str {
        self.target_kind
    }

    /// Storage table name of the target kind.
    #[must_use]
    pub const fn target_storage_name(&self) -> &'static str {
        self.target_storage_name
    }

    /// Primary-key descriptor of the target kind.
    #[must_use]
    pub fn target_primary_key(&self) -> &Arc<PropertyDescriptor> {
        &self.target_primary_key
    }

    /// The paired property on the target side, for bidirectional pairs.
    #[must_use]
    pub fn inverse(&self) -> Option<&Arc<PropertyDescriptor>> {
        self.inverse.as_ref()
    }

    /// Whether this edge is one-directional (no inverse to keep in sync).
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.inverse.is_none()
    }

    /// The inverse property when it is single-valued (a back-reference, not
    /// a list); these are the inverses the session writes through on
    /// forward-reference assignment.
    #[must_use]
    pub fn single_valued_inverse(&self) -> Option<&Arc<PropertyDescriptor>> {
        self.inverse.as_ref().filter(|p| !p.is_list())
    }
}

/// Metadata for one entity kind.
#[derive(Debug)]
pub struct ClassDescriptor {
    kind: &'static str,
    storage_name: &'static str,
    properties: Vec<Arc<PropertyDescriptor>>,
    by_name: HashMap<&'static str, usize>,
    by_association: HashMap<&'static str, usize>,
    primary_key: usize,
}

impl ClassDescriptor {
    pub(crate) fn new(
        kind: &'static str,
        storage_name: &'static str,
        properties: Vec<Arc<PropertyDescriptor>>,
    ) -> Result<Self> {
        let mut by_name = HashMap::new();
        let mut by_association = HashMap::new();
        let mut primary_key = None;

        for (index, property) in properties.iter().enumerate() {
            if by_name.insert(property.name(), index).is_some() {
                return Err(ConfigurationError::new(
                    ConfigurationErrorKind::InvalidDeclaration,
                    format!("duplicate property '{}' on kind '{kind}'", property.name()),
                )
                .into());
            }
            if let Some(association) = property.association_name() {
                by_association.insert(association, index);
            }
            if property.is_primary_key() && property.is_persistent() {
                primary_key = Some(index);
            }
        }

        let primary_key = primary_key.ok_or_else(|| {
            ConfigurationError::new(
                ConfigurationErrorKind::MissingPrimaryKey,
                format!("kind '{kind}' has no persistent primary key"),
            )
        })?;

        Ok(Self {
            kind,
            storage_name,
            properties,
            by_name,
            by_association,
            primary_key,
        })
    }

    /// The entity kind key.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    /// The storage table name.
    #[must_use]
    pub const fn storage_name(&self) -> &'static str {
        self.storage_name
    }

    /// Every declared property, persistent or not.
    #[must_use]
    pub fn properties(&self) -> &[Arc<PropertyDescriptor>] {
        &self.properties
    }

    /// Properties that map to storage columns.
    pub fn persistent_properties(&self) -> impl Iterator<Item = &Arc<PropertyDescriptor>> {
        self.properties.iter().filter(|p| p.is_persistent())
    }

    /// Relation properties (to-one references and named to-many lists).
    pub fn relation_properties(&self) -> impl Iterator<Item = &Arc<PropertyDescriptor>> {
        self.properties.iter().filter(|p| p.is_relation())
    }

    /// Persistent scalar properties (columns that are not foreign keys).
    pub fn value_properties(&self) -> impl Iterator<Item = &Arc<PropertyDescriptor>> {
        self.properties
            .iter()
            .filter(|p| p.is_persistent() && !p.is_reference())
    }

    /// Look up a property by logical name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Arc<PropertyDescriptor>> {
        self.by_name.get(name).map(|&i| &self.properties[i])
    }

    /// Look up the property participating in the named association.
    #[must_use]
    pub fn association_property(&self, association: &str) -> Option<&Arc<PropertyDescriptor>> {
        self.by_association.get(association).map(|&i| &self.properties[i])
    }

    /// The primary-key property.
    #[must_use]
    pub fn primary_key(&self) -> &Arc<PropertyDescriptor> {
        &self.properties[self.primary_key]
    }
}
