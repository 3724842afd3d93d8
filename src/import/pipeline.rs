//! The import pipeline: frame, parse, persist, count.
//!
//! Decoding and persisting are sequential and strictly interleaved:
//! one element is parsed and inserted before the next is read. That
//! trades throughput for strict ordering, a precise failure position,
//! and memory bounded at one element in flight.
//!
//! Unlike export, import enforces no depth bound: whatever nesting the
//! payload carries is handed to the store as-is.

use serde_json::Value;
use std::io::BufRead;
use tracing::debug;

use crate::catalog::Catalog;
use crate::error::{ImportError, TransferError};
use crate::import::framer::ArrayFramer;
use crate::store::RecordStore;

/// Outcome of a completed import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    /// Resolved entity-set name records were inserted into.
    pub entity: String,
    /// Root records persisted.
    pub persisted: u64,
}

/// Streaming importer for one entity set.
///
/// Every array element becomes one insert; there is no deduplication,
/// no upsert, and no skip-and-continue; the first unrecoverable
/// failure aborts with the count persisted so far.
pub struct Importer<'a> {
    catalog: &'a Catalog,
    progress: Option<Box<dyn FnMut(u64) + 'a>>,
}

impl<'a> Importer<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Importer {
            catalog,
            progress: None,
        }
    }

    /// Register an incremental progress signal, invoked with the
    /// running count after each successful persist.
    pub fn with_progress(mut self, callback: impl FnMut(u64) + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Drain `reader` into `store`.
    pub fn run<R: BufRead, S: RecordStore>(
        &mut self,
        entity: &str,
        reader: R,
        store: &mut S,
    ) -> Result<ImportSummary, ImportError> {
        let entity_set = match self.catalog.resolve_root(entity) {
            Some(descriptor) => descriptor.name.clone(),
            None => {
                return Err(ImportError {
                    persisted: 0,
                    kind: TransferError::UnknownEntity {
                        name: entity.to_string(),
                    },
                })
            }
        };

        let mut framer = ArrayFramer::new(reader);
        let mut persisted: u64 = 0;

        loop {
            match framer.next_element() {
                Ok(None) => break,
                Ok(Some(bytes)) => {
                    // Everything before this element persisted, so its
                    // 1-based ordinal is persisted + 1.
                    let position = persisted + 1;
                    let record: Value = match simd_json::from_slice(bytes) {
                        Ok(value) => value,
                        Err(err) => {
                            return Err(ImportError {
                                persisted,
                                kind: TransferError::MalformedPayload {
                                    position,
                                    detail: err.to_string(),
                                },
                            })
                        }
                    };

                    if let Err(source) = store.insert(&entity_set, record) {
                        return Err(ImportError {
                            persisted,
                            kind: TransferError::PersistFailure { position, source },
                        });
                    }

                    persisted += 1;
                    debug!(entity = %entity_set, persisted, "record persisted");
                    if let Some(callback) = self.progress.as_mut() {
                        callback(persisted);
                    }
                }
                Err(kind) => return Err(ImportError { persisted, kind }),
            }
        }

        Ok(ImportSummary {
            entity: entity_set,
            persisted,
        })
    }
}
