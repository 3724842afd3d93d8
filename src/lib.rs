//! # Ferry - hierarchical record transfer engine
//!
//! Bulk data migration for hierarchical record stores: export selected
//! root records (and everything composed beneath them) as one JSON
//! document or a flat CSV, and import a JSON array of root-with-children
//! records back via a streamed upload.
//!
//! ## Modules
//!
//! - **catalog**: the read-only entity registry (descriptors, fields,
//!   composition edges)
//! - **plan**: the composition graph resolver and its depth-bounded
//!   projection plan
//! - **columns**: flat column projection for tabular export
//! - **export**: lazy JSON and CSV export pipelines
//! - **import**: the streaming, one-element-in-flight import pipeline
//! - **store**: the store collaborator contract plus an in-memory
//!   implementation
//!
//! ## Quick Start
//!
//! ```rust
//! use ferry::{Catalog, EntityDescriptor, FieldDef, MemoryStore, RecordStore, Resolver};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let catalog = Catalog::new(vec![
//!     EntityDescriptor::new("my.shop.Books")
//!         .with_field(FieldDef::key("ID"))
//!         .with_field(FieldDef::scalar("title"))
//!         .with_composition("texts", "Books.texts"),
//!     EntityDescriptor::new("my.shop.Books.texts")
//!         .with_field(FieldDef::key("ID"))
//!         .with_field(FieldDef::scalar("locale")),
//! ])?;
//!
//! let mut store = MemoryStore::new(catalog.clone());
//! store.insert(
//!     "my.shop.Books",
//!     json!({"ID": 1, "title": "Dune", "texts": [{"ID": 10, "locale": "de"}]}),
//! )?;
//!
//! // Deep JSON export: resolve a plan once, then stream lazily.
//! let plan = Resolver::new(&catalog).resolve_default("Books")?;
//! let export = ferry::export::export_json(&store, &catalog, "Books", &[json!(1)], &plan)?;
//! let body: String = export.collect::<Result<String, _>>()?;
//! assert!(body.contains("Dune"));
//!
//! // Streaming import back into an empty store.
//! let mut target = MemoryStore::new(catalog.clone());
//! let summary = ferry::Importer::new(&catalog)
//!     .run("Books", body.as_bytes(), &mut target)?;
//! assert_eq!(summary.persisted, 1);
//! # Ok(())
//! # }
//! ```

use serde_json::Value;
use std::io::Write;

pub mod catalog;
pub mod columns;
pub mod error;
pub mod export;
pub mod import;
pub mod plan;
pub mod store;

// Re-export commonly used types for convenience
pub use catalog::{short_name, Catalog, CompositionEdge, EntityDescriptor, FieldDef, FieldKind};
pub use columns::flat_columns;
pub use error::{ImportError, StoreError, TransferError};
pub use export::{export_csv, export_json, CsvExport, ExportFormat, JsonExport};
pub use import::{ArrayFramer, ImportSummary, Importer};
pub use plan::{ProjectionPlan, Resolver, DEFAULT_MAX_DEPTH};
pub use store::{MemoryStore, RecordIter, RecordStore};

/// What a transport layer needs to serve a finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReceipt {
    pub filename: String,
    pub content_type: &'static str,
}

/// Main entry point: export `entity` records selected by `keys` into
/// `sink`, in the requested format.
///
/// JSON mode resolves a projection plan bounded at `max_depth` and
/// streams the hierarchical records; CSV mode streams the flat scalar
/// columns. Either way the sink is fed one record at a time.
pub fn export_to_writer<S: RecordStore, W: Write>(
    store: &S,
    catalog: &Catalog,
    entity: &str,
    keys: &[Value],
    format: ExportFormat,
    max_depth: usize,
    sink: &mut W,
) -> Result<ExportReceipt, TransferError> {
    match format {
        ExportFormat::Json => {
            let plan = Resolver::new(catalog).resolve(entity, max_depth)?;
            export_json(store, catalog, entity, keys, &plan)?.write_to(sink)?;
        }
        ExportFormat::Csv => {
            export_csv(store, catalog, entity, keys)?.write_to(sink)?;
        }
    }
    Ok(ExportReceipt {
        filename: format.download_filename(entity),
        content_type: format.content_type(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn books_catalog() -> Catalog {
        Catalog::new(vec![
            EntityDescriptor::new("my.shop.Books")
                .with_field(FieldDef::key("ID"))
                .with_field(FieldDef::scalar("title"))
                .with_composition("texts", "Books.texts"),
            EntityDescriptor::new("my.shop.Books.texts")
                .with_field(FieldDef::key("ID"))
                .with_field(FieldDef::scalar("locale")),
        ])
        .unwrap()
    }

    fn seeded_store(catalog: &Catalog, count: usize) -> MemoryStore {
        let mut store = MemoryStore::new(catalog.clone());
        for i in 1..=count {
            store
                .insert(
                    "my.shop.Books",
                    json!({
                        "ID": i,
                        "title": format!("Book {i}"),
                        "texts": [{"ID": i * 10, "locale": "de"}]
                    }),
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn json_round_trip_preserves_roots_and_children() {
        let catalog = books_catalog();
        let source = seeded_store(&catalog, 7);
        let keys: Vec<Value> = (1..=7).map(|i| json!(i)).collect();

        let mut body = Vec::new();
        let receipt = export_to_writer(
            &source,
            &catalog,
            "my.shop.Books",
            &keys,
            ExportFormat::Json,
            DEFAULT_MAX_DEPTH,
            &mut body,
        )
        .unwrap();
        assert_eq!(receipt.filename, "my.shop.Books.json");
        assert_eq!(receipt.content_type, "application/json; charset=utf-8");

        let mut target = MemoryStore::new(catalog.clone());
        let summary = Importer::new(&catalog)
            .run("Books", body.as_slice(), &mut target)
            .unwrap();

        assert_eq!(summary.persisted, 7);
        let records = target.records("my.shop.Books");
        assert_eq!(records.len(), 7);
        assert_eq!(records[0]["texts"][0]["locale"], "de");
    }

    #[test]
    fn empty_key_set_fails_instead_of_exporting_empty_array() {
        let catalog = books_catalog();
        let store = seeded_store(&catalog, 1);
        let mut sink = Vec::new();
        let err = export_to_writer(
            &store,
            &catalog,
            "my.shop.Books",
            &[],
            ExportFormat::Json,
            DEFAULT_MAX_DEPTH,
            &mut sink,
        )
        .unwrap_err();
        assert!(matches!(err, TransferError::NoKeysProvided));
        assert!(sink.is_empty());
    }

    #[test]
    fn csv_export_receipt_uses_short_filename() {
        let catalog = books_catalog();
        let store = seeded_store(&catalog, 2);
        let mut sink = Vec::new();
        let receipt = export_to_writer(
            &store,
            &catalog,
            "my.shop.Books",
            &[json!(1), json!(2)],
            ExportFormat::Csv,
            DEFAULT_MAX_DEPTH,
            &mut sink,
        )
        .unwrap();

        assert_eq!(receipt.filename, "Books.csv");
        let body = String::from_utf8(sink).unwrap();
        assert_eq!(body.lines().next().unwrap(), "ID;title");
        assert_eq!(body.lines().count(), 3);
    }
}
