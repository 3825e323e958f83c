//! PostgreSQL catalog introspection

use mover_core::{
    resolve_references, Column, ForeignKey, MoverError, PrimaryKey, ReferenceKey, Result, Row,
    Table, Value,
};

use crate::PostgresDialect;

fn text(row: &Row, name: &str) -> String {
    row.get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

impl PostgresDialect {
    /// Fetch every base table in the `public` schema, fully populated.
    #[tracing::instrument(skip(self))]
    pub(crate) async fn introspect_tables(&self) -> Result<Vec<Table>> {
        let rows = self
            .query_rows(
                "SELECT c.relname AS table_name
                 FROM pg_catalog.pg_class c
                 JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
                 WHERE c.relkind = 'r' AND n.nspname = 'public'
                 ORDER BY c.relname",
                &[],
            )
            .await
            .map_err(|e| MoverError::Schema(format!("unable to list tables: {}", e)))?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            let name = text(row, "table_name");
            tables.push(Table {
                columns: self.columns(&name).await?,
                primary_keys: self.primary_keys(&name).await?,
                foreign_keys: self.foreign_keys(&name).await?,
                reference_keys: self.reference_keys(&name).await?,
                name,
            });
        }

        resolve_references(&tables)?;

        tracing::debug!(table_count = tables.len(), "catalog introspected");
        Ok(tables)
    }

    /// Columns of one table, sorted by ordinal position.
    async fn columns(&self, table_name: &str) -> Result<Vec<Column>> {
        let rows = self
            .query_rows(
                "SELECT
                    a.attname AS column_name,
                    pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type,
                    NOT a.attnotnull AS is_nullable,
                    a.attnum AS ordinal_position,
                    c.relname AS table_name
                 FROM pg_catalog.pg_attribute a
                 JOIN pg_catalog.pg_class c ON a.attrelid = c.oid
                 JOIN pg_catalog.pg_namespace n ON c.relnamespace = n.oid
                 WHERE n.nspname = 'public'
                   AND c.relname = $1
                   AND a.attnum > 0
                   AND NOT a.attisdropped
                 ORDER BY a.attnum",
                &[Value::String(table_name.to_string())],
            )
            .await
            .map_err(|e| {
                MoverError::Schema(format!(
                    "unable to introspect columns of {}: {}",
                    table_name, e
                ))
            })?;

        Ok(rows
            .iter()
            .map(|row| Column {
                name: text(row, "column_name"),
                data_type: text(row, "data_type"),
                nullable: row
                    .get("is_nullable")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                position: row
                    .get("ordinal_position")
                    .and_then(Value::as_i64)
                    .unwrap_or(0),
                table_name: text(row, "table_name"),
            })
            .collect())
    }

    /// Primary key columns in index order.
    async fn primary_keys(&self, table_name: &str) -> Result<Vec<PrimaryKey>> {
        let rows = self
            .query_rows(
                "SELECT
                    a.attname AS name,
                    pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type
                 FROM pg_catalog.pg_index i
                 JOIN pg_catalog.pg_class c ON c.oid = i.indrelid
                 JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
                 JOIN pg_catalog.pg_attribute a
                   ON a.attrelid = c.oid AND a.attnum = ANY(i.indkey)
                 WHERE n.nspname = 'public'
                   AND c.relname = $1
                   AND i.indisprimary
                 ORDER BY array_position(i.indkey, a.attnum)",
                &[Value::String(table_name.to_string())],
            )
            .await
            .map_err(|e| {
                MoverError::Schema(format!(
                    "unable to introspect primary keys of {}: {}",
                    table_name, e
                ))
            })?;

        Ok(rows
            .iter()
            .map(|row| PrimaryKey {
                name: text(row, "name"),
                data_type: text(row, "data_type"),
                table_name: table_name.to_string(),
            })
            .collect())
    }

    /// Outbound edges: foreign keys declared on this table.
    async fn foreign_keys(&self, table_name: &str) -> Result<Vec<ForeignKey>> {
        let rows = self
            .query_rows(
                "SELECT
                    tc.constraint_name,
                    kcu.column_name,
                    ccu.table_name AS referenced_table,
                    ccu.column_name AS referenced_column_name
                 FROM information_schema.table_constraints AS tc
                 JOIN information_schema.key_column_usage AS kcu
                   ON tc.constraint_name = kcu.constraint_name
                   AND tc.table_schema = kcu.table_schema
                 JOIN information_schema.constraint_column_usage AS ccu
                   ON ccu.constraint_name = tc.constraint_name
                   AND ccu.table_schema = tc.table_schema
                 WHERE tc.constraint_type = 'FOREIGN KEY'
                   AND tc.table_schema = 'public'
                   AND tc.table_name = $1
                 ORDER BY tc.constraint_name",
                &[Value::String(table_name.to_string())],
            )
            .await
            .map_err(|e| {
                MoverError::Schema(format!(
                    "unable to introspect foreign keys of {}: {}",
                    table_name, e
                ))
            })?;

        Ok(rows
            .iter()
            .map(|row| ForeignKey {
                name: text(row, "constraint_name"),
                column_name: text(row, "column_name"),
                referenced_table: text(row, "referenced_table"),
                referenced_column_name: text(row, "referenced_column_name"),
            })
            .collect())
    }

    /// Inbound edges: foreign keys on other tables that reference this one.
    async fn reference_keys(&self, table_name: &str) -> Result<Vec<ReferenceKey>> {
        let rows = self
            .query_rows(
                "SELECT
                    r.conname AS name,
                    c2.relname AS table_name,
                    (SELECT attname FROM pg_catalog.pg_attribute
                      WHERE attrelid = r.conrelid AND ARRAY[attnum] <@ r.conkey) AS column_name
                 FROM pg_catalog.pg_constraint r
                 JOIN pg_catalog.pg_class c ON c.oid = r.confrelid
                 JOIN pg_catalog.pg_class c2 ON c2.oid = r.conrelid
                 JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
                 WHERE r.contype = 'f'
                   AND n.nspname = 'public'
                   AND c.relname = $1
                 ORDER BY r.conname",
                &[Value::String(table_name.to_string())],
            )
            .await
            .map_err(|e| {
                MoverError::Schema(format!(
                    "unable to introspect reference keys of {}: {}",
                    table_name, e
                ))
            })?;

        Ok(rows
            .iter()
            .map(|row| ReferenceKey {
                name: text(row, "name"),
                table: text(row, "table_name"),
                column_name: text(row, "column_name"),
            })
            .collect())
    }
}
