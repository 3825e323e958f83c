//! Extract, sanitize, and load pipeline
//!
//! The `Engine` owns a `Dialect` connection and the introspected catalog,
//! and dispatches the three verbs:
//!
//! - extract: graph-walk from a seed query, closing the row set over foreign
//!   keys and configured reference keys, then sanitize and write one JSON
//!   payload per table
//! - load: decode payload files back into transactional bulk upserts
//! - describe: print a catalog entry

mod engine;
mod extractor;
mod faker;
mod loader;
mod media;
mod payload;
mod sanitizer;
mod template;

#[cfg(test)]
pub(crate) mod test_utils;

pub use engine::{Engine, TableSchema, DOWNLOAD_CHUNK_SIZE};
pub use extractor::Extractor;
pub use loader::Loader;
pub use payload::{Payload, PAYLOAD_EXTENSION};
pub use sanitizer::Sanitizer;
