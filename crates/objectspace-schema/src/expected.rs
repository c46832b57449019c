//! The storage layout the registry's descriptors require.

use objectspace_core::{ClassDescriptor, MetadataRegistry, Result};

/// One required column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedColumn {
    /// Storage column name.
    pub name: String,
    /// Dialect storage type tag.
    pub storage_type: String,
    /// NOT NULL constraint.
    pub not_null: bool,
    /// Primary key constraint.
    pub primary_key: bool,
    /// Auto-increment marker.
    pub auto_increment: bool,
    /// Referenced table and column for foreign-key columns.
    pub references: Option<(String, String)>,
}

/// One required table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedTable {
    /// Storage table name.
    pub name: String,
    /// Required columns, primary key first.
    pub columns: Vec<ExpectedColumn>,
}

impl ExpectedTable {
    /// Look up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ExpectedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Compute the table one entity kind requires.
///
/// Foreign-key columns take their storage type from the referenced kind's
/// primary key, so this fails with a `ConfigurationError` when association
/// resolution has not run.
pub fn expected_table(class: &ClassDescriptor) -> Result<ExpectedTable> {
    let mut columns = Vec::new();

    for property in class.persistent_properties() {
        let (storage_type, references) = if property.is_reference() {
            let association = property.require_association()?;
            (
                association.target_primary_key().storage_type().to_string(),
                Some((
                    association.target_storage_name().to_string(),
                    association.target_primary_key().storage_name().to_string(),
                )),
            )
        } else {
            (property.storage_type().to_string(), None)
        };

        columns.push(ExpectedColumn {
            name: property.storage_name().to_string(),
            storage_type,
            not_null: property.is_not_null(),
            primary_key: property.is_primary_key(),
            auto_increment: property.is_auto_increment(),
            references,
        });
    }

    Ok(ExpectedTable {
        name: class.storage_name().to_string(),
        columns,
    })
}

/// Compute the full layout for every registered kind, in registration order.
pub fn expected_schema(registry: &MetadataRegistry) -> Result<Vec<ExpectedTable>> {
    registry
        .descriptors()
        .iter()
        .map(|class| expected_table(class))
        .collect()
}
