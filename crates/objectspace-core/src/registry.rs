//! The metadata registry and association resolver.
//!
//! Registration is a two-phase process. Phase one, [`MetadataRegistry::register`],
//! turns each declarative [`EntityInfo`] into an immutable [`ClassDescriptor`]:
//! it injects the reserved properties, classifies every declared property as
//! persistent or transient and as scalar or relation, and computes storage
//! names and storage type tags. Phase two, [`MetadataRegistry::resolve_associations`],
//! runs after all kinds are registered and wires every relation property to
//! its target descriptor (and named inverse, forming bidirectional pairs).
//!
//! Descriptors are shared `Arc`s and read-only after resolution; the registry
//! itself is built once at startup, before any session exists.

use crate::descriptor::{AssociationDescriptor, ClassDescriptor, PropertyDescriptor};
use crate::entity::{CREATED_AT_FIELD, DELETED_FIELD, ID_FIELD, RESERVED_FIELDS, UPDATED_AT_FIELD};
use crate::error::{ConfigurationError, ConfigurationErrorKind, Result};
use crate::field::{EntityInfo, FieldType, PropertyInfo};
use crate::storage::ValueCodec;
use std::collections::HashMap;
use std::sync::Arc;

/// Process-wide registry of entity kinds.
pub struct MetadataRegistry {
    codec: Arc<dyn ValueCodec>,
    classes: HashMap<&'static str, Arc<ClassDescriptor>>,
    order: Vec<&'static str>,
    resolved: bool,
}

impl MetadataRegistry {
    /// Create an empty registry using the given codec for storage-type
    /// computation.
    #[must_use]
    pub fn new(codec: Arc<dyn ValueCodec>) -> Self {
        Self {
            codec,
            classes: HashMap::new(),
            order: Vec::new(),
            resolved: false,
        }
    }

    /// The codec this registry was built with.
    #[must_use]
    pub fn codec(&self) -> &Arc<dyn ValueCodec> {
        &self.codec
    }

    /// Register an entity kind. Idempotent: re-registering a kind returns the
    /// descriptor computed the first time.
    #[tracing::instrument(level = "debug", skip(self, info), fields(kind = info.kind))]
    pub fn register(&mut self, info: EntityInfo) -> Result<Arc<ClassDescriptor>> {
        if let Some(existing) = self.classes.get(info.kind) {
            return Ok(Arc::clone(existing));
        }

        if info.kind.is_empty() {
            return Err(ConfigurationError::new(
                ConfigurationErrorKind::InvalidDeclaration,
                "entity kind key must not be empty",
            )
            .into());
        }

        let mut properties = Vec::with_capacity(info.properties.len() + RESERVED_FIELDS.len());
        for reserved in reserved_properties() {
            properties.push(Arc::new(self.build_descriptor(&reserved, true)?));
        }
        for declared in &info.properties {
            if RESERVED_FIELDS.contains(&declared.name) {
                return Err(ConfigurationError::new(
                    ConfigurationErrorKind::InvalidDeclaration,
                    format!(
                        "property '{}' on kind '{}' collides with a reserved field",
                        declared.name, info.kind
                    ),
                )
                .into());
            }
            properties.push(Arc::new(self.build_descriptor(declared, info.persistent)?));
        }

        let storage_name = info.storage_name.unwrap_or(info.kind);
        let class = Arc::new(ClassDescriptor::new(info.kind, storage_name, properties)?);

        tracing::debug!(
            kind = info.kind,
            storage_name,
            properties = class.properties().len(),
            relations = class.relation_properties().count(),
            "registered entity kind"
        );

        self.classes.insert(info.kind, Arc::clone(&class));
        self.order.push(info.kind);
        self.resolved = false;
        Ok(class)
    }

    /// Compute one property descriptor from its declaration.
    fn build_descriptor(
        &self,
        property: &PropertyInfo,
        class_persistent: bool,
    ) -> Result<PropertyDescriptor> {
        let is_list = matches!(property.field_type, FieldType::List(_));

        // A property persists when the declaring kind or the property itself
        // is marked persistent (an association marker counts), unless it is
        // explicitly transient. Lists never map to a column of their own.
        let persistent = (class_persistent || property.persistent || property.association.is_some())
            && !property.transient
            && !is_list;

        let storage_type = if persistent {
            self.codec.storage_type(&property.field_type, property.size)
        } else {
            String::new()
        };

        Ok(PropertyDescriptor::new(
            property.name,
            property.storage_name.unwrap_or(property.name),
            property.field_type,
            storage_type,
            property.size,
            property.primary_key,
            property.not_null,
            property.auto_increment,
            persistent,
            property.association,
        ))
    }

    /// Look up the descriptor for a kind.
    #[must_use]
    pub fn descriptor(&self, kind: &str) -> Option<Arc<ClassDescriptor>> {
        self.classes.get(kind).cloned()
    }

    /// Look up the descriptor for a kind, failing with a
    /// `ConfigurationError` when it was never registered.
    pub fn require_descriptor(&self, kind: &str) -> Result<Arc<ClassDescriptor>> {
        self.descriptor(kind)
            .ok_or_else(|| ConfigurationError::unknown_kind(kind).into())
    }

    /// All registered descriptors, in registration order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<Arc<ClassDescriptor>> {
        self.order
            .iter()
            .map(|kind| Arc::clone(&self.classes[kind]))
            .collect()
    }

    /// All registered kind keys, in registration order.
    #[must_use]
    pub fn kinds(&self) -> &[&'static str] {
        &self.order
    }

    /// Whether association resolution has run for the current registrations.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Wire every relation property to its target descriptor.
    ///
    /// Must run after all participating kinds are registered and before any
    /// load or create operation — materialization and schema generation need
    /// the target primary-key descriptors. Re-invocation is a no-op for
    /// already-resolved properties.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn resolve_associations(&mut self) -> Result<()> {
        for kind in &self.order {
            let class = &self.classes[kind];
            for property in class.relation_properties() {
                if property.association().is_some() {
                    continue;
                }

                let target_kind = property
                    .field_type()
                    .related_kind()
                    .expect("relation property always names a related kind");
                let target = self.classes.get(target_kind).ok_or_else(|| {
                    ConfigurationError::new(
                        ConfigurationErrorKind::UnknownKind,
                        format!(
                            "relation '{}.{}' references unregistered kind '{target_kind}'",
                            class.kind(),
                            property.name()
                        ),
                    )
                })?;

                let inverse = property
                    .association_name()
                    .and_then(|name| target.association_property(name))
                    .cloned();

                property.publish_association(Arc::new(AssociationDescriptor::new(
                    property.association_name(),
                    target.kind(),
                    target.storage_name(),
                    Arc::clone(target.primary_key()),
                    inverse,
                )));

                tracing::debug!(
                    kind = class.kind(),
                    property = property.name(),
                    target = target_kind,
                    anonymous = property.association().is_some_and(|a| a.is_anonymous()),
                    "resolved association"
                );
            }
        }

        self.resolved = true;
        Ok(())
    }
}

/// The reserved properties injected into every entity kind.
fn reserved_properties() -> [PropertyInfo; 4] {
    [
        PropertyInfo::new(ID_FIELD, FieldType::Uuid)
            .primary_key(true)
            .not_null(true),
        PropertyInfo::new(CREATED_AT_FIELD, FieldType::Timestamp),
        PropertyInfo::new(UPDATED_AT_FIELD, FieldType::Timestamp),
        PropertyInfo::new(DELETED_FIELD, FieldType::Boolean),
    ]
}
