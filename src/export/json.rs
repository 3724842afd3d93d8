//! Hierarchical JSON export.
//!
//! Serializes a plan-shaped store read as one JSON array, emitted as a
//! lazy sequence of chunks (one chunk per record) so arbitrarily large
//! exports never require full in-memory buffering.

use serde_json::Value;
use std::io::Write;

use crate::catalog::Catalog;
use crate::error::TransferError;
use crate::plan::ProjectionPlan;
use crate::store::{RecordIter, RecordStore};

/// Start a deep JSON export of `entity` filtered to `keys`.
///
/// Fails up front with [`TransferError::NoKeysProvided`] on an empty
/// key set and [`TransferError::UnknownEntity`] when the entity cannot
/// be resolved. Store failures during iteration surface as `Err` chunks
/// and end the stream non-cleanly.
pub fn export_json<'a, S: RecordStore>(
    store: &'a S,
    catalog: &Catalog,
    entity: &str,
    keys: &[Value],
    plan: &'a ProjectionPlan,
) -> Result<JsonExport<'a>, TransferError> {
    if keys.is_empty() {
        return Err(TransferError::NoKeysProvided);
    }
    let descriptor =
        catalog
            .resolve_root(entity)
            .ok_or_else(|| TransferError::UnknownEntity {
                name: entity.to_string(),
            })?;

    let records = store.read_deep(&descriptor.name, plan, keys)?;
    Ok(JsonExport {
        records,
        opened: false,
        emitted: 0,
        done: false,
    })
}

/// Lazy JSON-array chunk stream. Yields `[`, then one serialized record
/// per pull (with a separating `,`), then `]`.
pub struct JsonExport<'a> {
    records: RecordIter<'a>,
    opened: bool,
    emitted: u64,
    done: bool,
}

impl std::fmt::Debug for JsonExport<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonExport")
            .field("opened", &self.opened)
            .field("emitted", &self.emitted)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl JsonExport<'_> {
    /// Drain the whole export into `sink`.
    pub fn write_to<W: Write>(self, sink: &mut W) -> Result<(), TransferError> {
        for chunk in self {
            sink.write_all(chunk?.as_bytes())
                .map_err(crate::error::StoreError::Io)?;
        }
        Ok(())
    }
}

impl Iterator for JsonExport<'_> {
    type Item = Result<String, TransferError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.opened {
            self.opened = true;
            return Some(Ok("[".to_string()));
        }

        match self.records.next() {
            Some(Ok(record)) => {
                let serialized = match serde_json::to_string(&record) {
                    Ok(s) => s,
                    Err(err) => {
                        self.done = true;
                        return Some(Err(crate::error::StoreError::from(err).into()));
                    }
                };
                let chunk = if self.emitted == 0 {
                    serialized
                } else {
                    format!(",{serialized}")
                };
                self.emitted += 1;
                Some(Ok(chunk))
            }
            Some(Err(err)) => {
                self.done = true;
                Some(Err(err.into()))
            }
            None => {
                self.done = true;
                Some(Ok("]".to_string()))
            }
        }
    }
}
