//! Streaming import pipeline - persist a JSON array one element at a time
//!
//! The input is an unbounded byte stream carrying a JSON array of
//! hierarchical records. The [`ArrayFramer`] slices one complete array
//! element out of the stream at a time; the [`Importer`] parses it,
//! persists it, bumps the running count, and only then pulls the next
//! element. Memory stays bounded at one element in flight regardless of
//! payload size, and a failure reports the exact 1-based position of
//! the offending element plus the count persisted before it.

pub mod framer;
pub mod pipeline;

pub use framer::ArrayFramer;
pub use pipeline::{ImportSummary, Importer};
