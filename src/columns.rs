//! Flat column projection for tabular export.
//!
//! Picks the scalar fields of an entity that are usable as CSV columns,
//! in declared order. Everything reference-shaped, structured, virtual,
//! or technical is excluded; composition edges are not fields and never
//! appear here.

use crate::catalog::{EntityDescriptor, FieldKind};

/// Audit fields maintained by the store, excluded from tabular export.
const TECHNICAL_FIELDS: [&str; 4] = ["_createdAt", "_createdBy", "_modifiedAt", "_modifiedBy"];

/// Ordered scalar column names for `descriptor`.
///
/// Returns an empty list when no field qualifies; the CSV export
/// surface treats that as a request error.
pub fn flat_columns(descriptor: &EntityDescriptor) -> Vec<&str> {
    descriptor
        .fields
        .iter()
        .filter(|f| f.kind == FieldKind::Scalar)
        .filter(|f| !f.virtual_field)
        .filter(|f| !TECHNICAL_FIELDS.contains(&f.name.as_str()))
        .map(|f| f.name.as_str())
        .collect()
}
