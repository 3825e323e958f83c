//! Recursive graph-walk extractor
//!
//! Starting from the seed result set, every row fans out along its outbound
//! foreign keys (at any depth), its inbound reference keys (all of them at
//! depth 0, configured ones anywhere), and the override's templated queries.
//! Two dedup layers keep the walk finite: a per-table cache keyed by the
//! generating query, and a processed-relations set keyed by row identity.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use mover_core::{Dialect, MoverError, ReferenceKey, Result, Row, Value};

use crate::engine::TableSchema;
use crate::template;

/// Cache key: query text joined with its argument values, so identical SQL
/// with different parameters is distinct work.
fn cache_key(query: &str, args: &[Value]) -> String {
    if args.is_empty() {
        return query.to_string();
    }
    let parts: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
    format!("{}.{}", query, parts.join("."))
}

#[derive(Debug, Default)]
struct TableEntry {
    seen: HashSet<String>,
    sets: Vec<Vec<Row>>,
}

/// One extract invocation's walk state. Created per verb, discarded after.
pub struct Extractor<'a> {
    dialect: &'a dyn Dialect,
    schema: &'a HashMap<String, TableSchema>,
    cache: HashMap<String, TableEntry>,
    processed: HashSet<(String, String)>,
}

impl<'a> Extractor<'a> {
    pub fn new(dialect: &'a dyn Dialect, schema: &'a HashMap<String, TableSchema>) -> Self {
        Self {
            dialect,
            schema,
            cache: HashMap::new(),
            processed: HashSet::new(),
        }
    }

    /// Walk from a seed query at depth 0.
    pub async fn handle(&mut self, table_name: &str, query: &str, args: &[Value]) -> Result<()> {
        self.handle_at(0, table_name.to_string(), query.to_string(), args.to_vec())
            .await
    }

    /// Consume the extractor, returning each table's accumulated result sets
    /// in insertion order.
    pub fn into_table_sets(self) -> HashMap<String, Vec<Vec<Row>>> {
        self.cache
            .into_iter()
            .map(|(table, entry)| (table, entry.sets))
            .collect()
    }

    fn handle_at<'b>(
        &'b mut self,
        depth: usize,
        table_name: String,
        query: String,
        args: Vec<Value>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'b>> {
        Box::pin(async move {
            let key = cache_key(&query, &args);
            let entry = self.cache.entry(table_name.clone()).or_default();
            if entry.seen.contains(&key) {
                tracing::debug!(depth, table = %table_name, "already cached");
                return Ok(());
            }

            let rows = self
                .dialect
                .result_set(&query, &args)
                .await
                .map_err(|e| {
                    MoverError::Query(format!("unable to extract {}: {}", table_name, e))
                })?;

            tracing::debug!(depth, table = %table_name, rows = rows.len(), query = %query, "fetched");

            let entry = self.cache.entry(table_name.clone()).or_default();
            entry.seen.insert(key);
            entry.sets.push(rows.clone());

            for row in &rows {
                self.handle_row(depth, &table_name, row).await?;
            }

            Ok(())
        })
    }

    /// The graph step for one row: identity dedup, then outbound edges,
    /// inbound edges, and templated queries.
    async fn handle_row(&mut self, depth: usize, table_name: &str, row: &Row) -> Result<()> {
        let schema_map = self.schema;
        let schema = schema_map.get(table_name).ok_or_else(|| {
            MoverError::Schema(format!("table {} does not exist", table_name))
        })?;
        let table = &schema.table;
        let primary_key = table.primary_key()?;
        let pk_value = row.get(&primary_key.name).cloned().unwrap_or(Value::Null);

        let relation_id = (
            format!("{}.{}", table.name, primary_key.name),
            pk_value.to_string(),
        );
        if !self.processed.insert(relation_id) {
            return Ok(());
        }

        tracing::debug!(depth, relation = %primary_key, id = %pk_value, "retrieve");

        // Outbound: follow every non-null foreign key, at any depth.
        for fk in &table.foreign_keys {
            let Some(value) = row.get(&fk.column_name) else {
                continue;
            };
            if value.is_null() {
                continue;
            }

            tracing::debug!(depth, column = %fk.column_name, target = %fk, "fetch foreign key");
            let query = format!(
                "SELECT * FROM {} WHERE {} = $1",
                fk.referenced_table, fk.referenced_column_name
            );
            self.handle_at(
                depth + 2,
                fk.referenced_table.clone(),
                query,
                vec![value.clone()],
            )
            .await?;
        }

        // Inbound: every reference key at the seed, configured ones anywhere.
        // Following all reverse edges from every intermediate node would
        // explode the closure.
        let mut reference_keys: Vec<&ReferenceKey> = Vec::new();
        if depth == 0 && !schema.config.omit_reference_keys {
            reference_keys.extend(table.reference_keys.iter());
        }
        for name in &schema.config.reference_keys {
            let Some(rk) = table.reference_keys.iter().find(|rk| &rk.name == name) else {
                continue;
            };
            if !reference_keys.iter().any(|existing| existing.name == rk.name) {
                reference_keys.push(rk);
            }
        }

        for rk in reference_keys {
            tracing::debug!(depth, target = %rk, "fetch reference key");
            let query = format!("SELECT * FROM {} WHERE {} = $1", rk.table, rk.column_name);
            self.handle_at(depth + 2, rk.table.clone(), query, vec![pk_value.clone()])
                .await?;
        }

        // Templated queries from configuration, expanded against this row.
        for configured in &schema.config.queries {
            let expanded = template::expand(&configured.query, row);
            tracing::debug!(depth, query = %expanded, "execute configured query");
            self.handle_at(depth + 1, configured.table_name.clone(), expanded, Vec::new())
                .await?;
        }

        Ok(())
    }
}
