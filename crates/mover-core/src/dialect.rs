//! Dialect trait - the only coupling between the engine and a concrete DBMS

use async_trait::async_trait;
use std::sync::Arc;

use crate::{Result, Row, Table, Value};

/// Handle for cancelling in-flight database work from any thread.
///
/// Safe to call multiple times; cancelling when nothing is running is a
/// no-op.
pub trait QueryCancelHandle: Send + Sync {
    fn cancel(&self);
}

/// A relational backend as the engine consumes it: catalog introspection,
/// parameterized reads, and the transactional bulk-insert used by the load
/// path.
#[async_trait]
pub trait Dialect: Send + Sync {
    /// Return every base table in the default namespace, fully populated
    /// with position-sorted columns, primary keys, foreign keys, and
    /// reference keys.
    async fn tables(&self) -> Result<Vec<Table>>;

    /// Execute a read query and decode each row with database-type-aware
    /// conversions.
    async fn result_set(&self, query: &str, args: &[Value]) -> Result<Vec<Row>>;

    /// Upsert `rows` into `table` inside one transaction, with the table's
    /// triggers disabled for the duration and the identity sequence repaired
    /// after commit. Any row failure rolls the whole bulk back.
    async fn bulk_insert(&self, table: &Table, rows: &[Row]) -> Result<()>;

    /// Close the connection.
    async fn close(&self) -> Result<()>;

    /// Handle that aborts the in-flight query, when the backend supports it.
    fn cancel_handle(&self) -> Option<Arc<dyn QueryCancelHandle>> {
        None
    }
}
