//! Deep export pipeline - serialize selected root records lazily
//!
//! Two output modes over the same key-filtered store read:
//!
//! - **JSON**: a hierarchical read shaped by a [`ProjectionPlan`],
//!   serialized as one JSON array, one record in memory at a time.
//! - **CSV**: a flat read over the entity's eligible scalar columns,
//!   one escaped `;`-delimited line per record.
//!
//! Both exports are pull-driven iterators: nothing is read from the
//! store until the consumer asks for the next chunk, so a slow consumer
//! throttles the store read instead of filling a buffer.

pub mod csv;
pub mod json;

pub use csv::{escape_csv, export_csv, CsvExport};
pub use json::{export_json, JsonExport};

use std::str::FromStr;

use crate::catalog::short_name;
use crate::error::TransferError;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(TransferError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json; charset=utf-8",
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }

    /// Suggested download filename for an export of `entity_set`.
    /// JSON keeps the full entity-set name, CSV uses the short name.
    pub fn download_filename(&self, entity_set: &str) -> String {
        match self {
            ExportFormat::Json => format!("{entity_set}.json"),
            ExportFormat::Csv => format!("{}.csv", short_name(entity_set)),
        }
    }
}
