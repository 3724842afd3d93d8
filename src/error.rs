//! Error types for the transfer engine.
//!
//! Library errors are strongly typed so callers can pattern-match on the
//! failure kind; every variant also carries a human-readable message.
//! Retry policy belongs to the caller; nothing here is retried.

use thiserror::Error;

/// Errors raised by a [`RecordStore`](crate::store::RecordStore)
/// implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unknown entity set: {name}")]
    UnknownEntity { name: String },

    #[error("Duplicate key {key} in entity set {entity}")]
    DuplicateKey { entity: String, key: String },

    #[error("Invalid record for entity set {entity}: {reason}")]
    InvalidRecord { entity: String, reason: String },

    #[error("Entity set {entity} declares no key field, cannot filter by key")]
    NoKeyField { entity: String },

    #[error("Record (de)serialization failed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Store I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure kinds of the transfer engine.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The requested or referenced entity type is not in the catalog,
    /// even after fallback resolution. Fatal for a root request;
    /// recovered locally (wildcard edge) during plan resolution.
    #[error("Unknown entity: {name}")]
    UnknownEntity { name: String },

    /// Export was requested with an empty key set.
    #[error("No keys provided")]
    NoKeysProvided,

    /// Export format other than `json` or `csv`.
    #[error("Unsupported export format: {format}")]
    UnsupportedFormat { format: String },

    /// CSV export of an entity with zero eligible scalar columns.
    #[error("No scalar columns to export for {entity}")]
    NoScalarColumns { entity: String },

    /// The import stream is not a well-formed JSON array of records.
    /// `position` is the 1-based ordinal of the element being framed or
    /// parsed when the payload turned out to be malformed.
    #[error("Malformed import payload at element {position}: {detail}")]
    MalformedPayload { position: u64, detail: String },

    /// The store rejected one import element. `position` is the 1-based
    /// ordinal of the failing element within the array.
    #[error("Store rejected element {position}: {source}")]
    PersistFailure {
        position: u64,
        #[source]
        source: StoreError,
    },

    /// The input byte stream was closed or errored mid-import.
    #[error("Import input closed: {source}")]
    InputClosed {
        #[source]
        source: std::io::Error,
    },

    /// A store read failed during export.
    #[error("Store read failed: {0}")]
    Store(#[from] StoreError),
}

/// An aborted import. Carries the exact number of records persisted
/// before the failure so callers can reason about partial application.
#[derive(Debug, Error)]
#[error("Import aborted after {persisted} persisted records: {kind}")]
pub struct ImportError {
    pub persisted: u64,
    #[source]
    pub kind: TransferError,
}
