//! Shared fixtures: an in-memory dialect and small catalogs

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use mover_config::Config;
use mover_core::{
    Dialect, ForeignKey, MoverError, PrimaryKey, ReferenceKey, Result, Row, Table, Value,
};

use crate::engine::{copy_schema_tables, TableSchema};

fn response_key(query: &str, args: &[Value]) -> String {
    let parts: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
    format!("{}|{}", query, parts.join("|"))
}

/// A dialect serving canned result sets, recording every query it executes.
/// No database involved; tests exercise the walk and load logic alone.
pub(crate) struct StubDialect {
    tables: Vec<Table>,
    responses: Mutex<HashMap<String, Vec<Row>>>,
    failures: Mutex<Vec<String>>,
    queries: Mutex<Vec<String>>,
    inserted: Mutex<Vec<(String, Vec<Row>)>>,
}

impl StubDialect {
    pub(crate) fn new(tables: Vec<Table>) -> Self {
        Self {
            tables,
            responses: Mutex::new(HashMap::new()),
            failures: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            inserted: Mutex::new(Vec::new()),
        }
    }

    /// Register the rows returned for a `(query, args)` pair.
    pub(crate) fn respond(&self, query: &str, args: &[Value], rows: Vec<Row>) {
        self.responses
            .lock()
            .unwrap()
            .insert(response_key(query, args), rows);
    }

    /// Make one query fail with a canned error.
    pub(crate) fn fail_on(&self, query: &str) {
        self.failures.lock().unwrap().push(query.to_string());
    }

    /// Every `(query, args)` executed so far, in order.
    pub(crate) fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    /// Every bulk insert received: table name and rows.
    pub(crate) fn inserted(&self) -> Vec<(String, Vec<Row>)> {
        self.inserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dialect for StubDialect {
    async fn tables(&self) -> Result<Vec<Table>> {
        Ok(self.tables.clone())
    }

    async fn result_set(&self, query: &str, args: &[Value]) -> Result<Vec<Row>> {
        if self.failures.lock().unwrap().iter().any(|q| q == query) {
            return Err(MoverError::Query(format!("stub failure (query: {})", query)));
        }
        let key = response_key(query, args);
        self.queries.lock().unwrap().push(key.clone());
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }

    async fn bulk_insert(&self, table: &Table, rows: &[Row]) -> Result<()> {
        self.inserted
            .lock()
            .unwrap()
            .push((table.name.clone(), rows.to_vec()));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Build the engine-shaped schema map from a config and a catalog.
pub(crate) fn schema_map(
    config: &Config,
    tables: Vec<Table>,
) -> HashMap<String, TableSchema> {
    copy_schema_tables(config, tables)
}

fn integer_pk(table_name: &str) -> Vec<PrimaryKey> {
    vec![PrimaryKey {
        name: "id".into(),
        data_type: "integer".into(),
        table_name: table_name.into(),
    }]
}

/// `author(id, name)` referenced by `book(id, title, author_id)`.
pub(crate) fn author_book_catalog() -> Vec<Table> {
    vec![
        Table {
            name: "author".into(),
            primary_keys: integer_pk("author"),
            reference_keys: vec![ReferenceKey {
                name: "book_author_id_fkey".into(),
                table: "book".into(),
                column_name: "author_id".into(),
            }],
            ..Default::default()
        },
        Table {
            name: "book".into(),
            primary_keys: integer_pk("book"),
            foreign_keys: vec![ForeignKey {
                name: "book_author_id_fkey".into(),
                column_name: "author_id".into(),
                referenced_table: "author".into(),
                referenced_column_name: "id".into(),
            }],
            ..Default::default()
        },
    ]
}

/// `user(id, manager_id -> user.id)`: a self-referencing cycle.
pub(crate) fn cyclic_user_catalog() -> Vec<Table> {
    vec![Table {
        name: "user".into(),
        primary_keys: integer_pk("user"),
        foreign_keys: vec![ForeignKey {
            name: "user_manager_id_fkey".into(),
            column_name: "manager_id".into(),
            referenced_table: "user".into(),
            referenced_column_name: "id".into(),
        }],
        ..Default::default()
    }]
}
