//! PostgreSQL dialect implementation

mod connection;
mod schema;
mod value;

pub use connection::PostgresDialect;
