//! Flat CSV export.
//!
//! Emits a header line followed by one line per record, `;`-delimited
//! and `\n`-terminated. Values are escaped with a minimal dialect:
//! double-quotes are doubled, and a value is wrapped in quotes only
//! when it contains the delimiter, a newline, or a carriage return,
//! never unconditionally, to keep output terse and diff-stable.

use serde_json::Value;
use std::io::Write;

use crate::catalog::Catalog;
use crate::columns::flat_columns;
use crate::error::TransferError;
use crate::store::{RecordIter, RecordStore};

/// Field delimiter. `;` avoids ambiguity with values containing `,`.
const DELIMITER: char = ';';

/// Escape one scalar value for a CSV cell.
///
/// Null/missing stringifies to empty; strings pass through verbatim,
/// numbers and booleans via their display form, and anything
/// record-shaped (only reachable through wildcard store rows) as
/// compact JSON.
pub fn escape_csv(value: Option<&Value>) -> String {
    let mut s = match value {
        None | Some(Value::Null) => return String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => serde_json::to_string(other).unwrap_or_default(),
    };
    if s.contains('"') {
        s = s.replace('"', "\"\"");
    }
    if s.contains(DELIMITER) || s.contains('\n') || s.contains('\r') {
        s = format!("\"{s}\"");
    }
    s
}

/// Start a flat CSV export of `entity` filtered to `keys`.
///
/// Fails up front with [`TransferError::NoKeysProvided`] on an empty
/// key set, [`TransferError::UnknownEntity`] when the entity cannot be
/// resolved, and [`TransferError::NoScalarColumns`] when nothing is
/// eligible for tabular output.
pub fn export_csv<'a, S: RecordStore>(
    store: &'a S,
    catalog: &Catalog,
    entity: &str,
    keys: &[Value],
) -> Result<CsvExport<'a>, TransferError> {
    if keys.is_empty() {
        return Err(TransferError::NoKeysProvided);
    }
    let descriptor =
        catalog
            .resolve_root(entity)
            .ok_or_else(|| TransferError::UnknownEntity {
                name: entity.to_string(),
            })?;

    let columns: Vec<String> = flat_columns(descriptor)
        .into_iter()
        .map(str::to_string)
        .collect();
    if columns.is_empty() {
        return Err(TransferError::NoScalarColumns {
            entity: descriptor.name.clone(),
        });
    }

    let records = store.read_flat(&descriptor.name, &columns, keys)?;
    Ok(CsvExport {
        columns,
        records,
        header_emitted: false,
        done: false,
    })
}

/// Lazy CSV line stream: header first, then one line per record in
/// store order. Every yielded line includes its `\n` terminator.
pub struct CsvExport<'a> {
    columns: Vec<String>,
    records: RecordIter<'a>,
    header_emitted: bool,
    done: bool,
}

impl std::fmt::Debug for CsvExport<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvExport")
            .field("columns", &self.columns)
            .field("header_emitted", &self.header_emitted)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl CsvExport<'_> {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Drain the whole export into `sink`.
    pub fn write_to<W: Write>(self, sink: &mut W) -> Result<(), TransferError> {
        for line in self {
            sink.write_all(line?.as_bytes())
                .map_err(crate::error::StoreError::Io)?;
        }
        Ok(())
    }
}

impl Iterator for CsvExport<'_> {
    type Item = Result<String, TransferError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.header_emitted {
            self.header_emitted = true;
            let mut header = self.columns.join(&DELIMITER.to_string());
            header.push('\n');
            return Some(Ok(header));
        }

        match self.records.next() {
            Some(Ok(record)) => {
                let mut line = self
                    .columns
                    .iter()
                    .map(|column| escape_csv(record.get(column)))
                    .collect::<Vec<_>>()
                    .join(&DELIMITER.to_string());
                line.push('\n');
                Some(Ok(line))
            }
            Some(Err(err)) => {
                self.done = true;
                Some(Err(err.into()))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}
