//! Additive schema synchronization planning.

use objectspace_core::{ClassDescriptor, MetadataRegistry, PropertyDescriptor, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// One planned schema addition.
///
/// Drivers map `Table` to their `build_create_table` and `Column` to
/// `build_add_column`. Nothing is ever dropped or altered in place.
#[derive(Debug, Clone)]
pub enum SchemaAddition {
    /// The kind's table does not exist yet.
    Table(Arc<ClassDescriptor>),
    /// The table exists but lacks a column for this property.
    Column {
        class: Arc<ClassDescriptor>,
        property: Arc<PropertyDescriptor>,
    },
}

/// Plan the additions that bring the store in line with the registry.
///
/// `existing` maps each present table's storage name to its present column
/// names (the result of driver-side introspection, e.g. `PRAGMA table_info`).
/// Tables absent from the map are planned as full creations; for present
/// tables, each persistent property without a matching column becomes a
/// column addition.
#[tracing::instrument(level = "debug", skip_all)]
pub fn plan_additions(
    registry: &MetadataRegistry,
    existing: &HashMap<String, Vec<String>>,
) -> Result<Vec<SchemaAddition>> {
    let mut additions = Vec::new();

    for class in registry.descriptors() {
        match existing.get(class.storage_name()) {
            None => {
                tracing::debug!(table = class.storage_name(), "planning table creation");
                additions.push(SchemaAddition::Table(class));
            }
            Some(columns) => {
                for property in class.persistent_properties() {
                    if !columns.iter().any(|c| c == property.storage_name()) {
                        tracing::debug!(
                            table = class.storage_name(),
                            column = property.storage_name(),
                            "planning column addition"
                        );
                        additions.push(SchemaAddition::Column {
                            class: Arc::clone(&class),
                            property: Arc::clone(property),
                        });
                    }
                }
            }
        }
    }

    Ok(additions)
}
