//! Mover Core - shared types and traits for the mover workspace
//!
//! This crate provides the fundamental pieces every other mover crate
//! depends on:
//!
//! - `Value` / `Row` - loosely-typed result-set values with a natural JSON
//!   representation
//! - `Table`, `Column`, `ForeignKey`, `ReferenceKey` - the introspected
//!   table catalog
//! - `Dialect` - the trait a database backend implements
//! - `MoverError` / `Result` - the workspace error type

mod dialect;
mod error;
mod schema;
mod types;

pub use dialect::*;
pub use error::*;
pub use schema::*;
pub use types::*;
