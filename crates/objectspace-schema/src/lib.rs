//! Schema expectation and synchronization planning.
//!
//! Storage drivers implement `create_schema`/`update_schema` by comparing
//! what the store currently has against what the registry's descriptors
//! require. This crate computes the "required" side ([`expected`]) and plans
//! the additive delta ([`sync`]): new tables and missing columns only — the
//! mapping layer never drops or rewrites existing storage.

pub mod expected;
pub mod sync;

pub use expected::{ExpectedColumn, ExpectedTable, expected_schema, expected_table};
pub use sync::{SchemaAddition, plan_additions};
