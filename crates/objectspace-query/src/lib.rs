//! Statement-building contract for ObjectSpace.
//!
//! Storage drivers pair a [`StatementBuilder`] implementation with their
//! connection type. The builder is a set of pure functions from metadata and
//! criteria to dialect statement text — deterministic, side-effect-free, and
//! never inspected by the session layer.

pub mod builder;

pub use builder::StatementBuilder;
