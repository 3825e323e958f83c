//! Engine wiring: owns the dialect and the catalog, dispatches verbs

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use mover_config::{Config, SchemaOverride};
use mover_core::{Dialect, MoverError, QueryCancelHandle, Result, Table};

use crate::extractor::Extractor;
use crate::loader::Loader;
use crate::media;
use crate::payload::{Payload, PAYLOAD_EXTENSION};
use crate::sanitizer::Sanitizer;

/// Maximum concurrent media downloads per table.
pub const DOWNLOAD_CHUNK_SIZE: usize = 10;

/// One catalog entry: the introspected table plus its configured override.
/// Tables without configuration carry an empty override.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub table: Table,
    pub config: SchemaOverride,
}

/// Pair every introspected table with its schema override.
pub(crate) fn copy_schema_tables(config: &Config, tables: Vec<Table>) -> HashMap<String, TableSchema> {
    tables
        .into_iter()
        .map(|table| {
            let config = config
                .override_for(&table.name)
                .cloned()
                .unwrap_or_else(|| SchemaOverride {
                    table_name: table.name.clone(),
                    ..Default::default()
                });
            (table.name.clone(), TableSchema { table, config })
        })
        .collect()
}

/// First identifier following `FROM`, case-insensitive and
/// whitespace-tolerant. This is how the seed table is discovered from a raw
/// query.
fn seed_table(query: &str) -> Option<String> {
    let mut tokens = query.split_whitespace();
    while let Some(token) = tokens.next() {
        if token.eq_ignore_ascii_case("from") {
            return tokens
                .next()
                .map(|table| table.trim_matches(|c| c == '"' || c == ';' || c == ',').to_string())
                .filter(|table| !table.is_empty());
        }
    }
    None
}

/// Extracts and loads data through a dialect.
pub struct Engine {
    dialect: Arc<dyn Dialect>,
    schema: HashMap<String, TableSchema>,
    config: Config,
}

impl Engine {
    /// Introspect the catalog and wire the engine. The catalog is read once
    /// here and immutable afterwards.
    pub async fn new(config: Config, dialect: Arc<dyn Dialect>) -> Result<Self> {
        let tables = dialect.tables().await?;
        let schema = copy_schema_tables(&config, tables);

        Ok(Self {
            dialect,
            schema,
            config,
        })
    }

    /// Handle aborting in-flight database work, when the dialect has one.
    pub fn cancel_handle(&self) -> Option<Arc<dyn QueryCancelHandle>> {
        self.dialect.cancel_handle()
    }

    /// Return a table definition from the catalog.
    pub fn describe(&self, table_name: &str) -> Result<&Table> {
        self.schema
            .get(table_name)
            .map(|schema| &schema.table)
            .ok_or_else(|| MoverError::Schema(format!("table {} does not exist", table_name)))
    }

    /// Run a graph-walk extract seeded at the query's `FROM` table, then
    /// extract every configured `extra` table wholesale, sanitize, and write
    /// one payload file per table under `output_path`.
    pub async fn extract(&self, output_path: &Path, query: &str) -> Result<()> {
        let table_name = seed_table(query).ok_or_else(|| {
            MoverError::InvalidQuery(format!("unable to retrieve table from query: {}", query))
        })?;
        if !self.schema.contains_key(&table_name) {
            return Err(MoverError::Schema(format!(
                "table {} does not exist",
                table_name
            )));
        }

        let mut extractor = Extractor::new(self.dialect.as_ref(), &self.schema);
        extractor.handle(&table_name, query, &[]).await?;

        for extra in &self.config.extra {
            let query = format!("SELECT * FROM {}", extra.table_name);
            extractor.handle(&extra.table_name, &query, &[]).await?;
        }

        let cache = extractor.into_table_sets();
        let mut sanitizer = Sanitizer::new(&self.config.locale, &self.schema);

        tokio::fs::create_dir_all(output_path).await?;

        for (table_name, sets) in &cache {
            let schema = self.schema.get(table_name).ok_or_else(|| {
                MoverError::Schema(format!("table {} does not exist", table_name))
            })?;

            let rows = sanitizer.sanitize(&schema.table, sets)?;
            let payload = Payload::new(table_name.clone(), rows);
            let encoded = payload.to_pretty_json()?;

            let file_path = output_path.join(format!("{}.{}", table_name, PAYLOAD_EXTENSION));
            tokio::fs::write(&file_path, encoded).await?;

            tracing::info!(
                table = %table_name,
                path = %file_path.display(),
                count = payload.count,
                "exported results"
            );

            // Media URLs come from the raw extracted rows: sanitization may
            // rewrite the very column that carries the path.
            let urls = media::media_urls(&schema.config, sets);
            if !urls.is_empty() {
                tracing::debug!(table = %table_name, files = urls.len(), "downloading media");
                if let Err(e) =
                    media::download_files(&urls, &output_path.join("media"), DOWNLOAD_CHUNK_SIZE)
                        .await
                {
                    tracing::error!(error = %e, table = %table_name, "unable to download files");
                }
            }
        }

        Ok(())
    }

    /// Load every payload file under `input_path` into the target database.
    pub async fn load(&self, input_path: &Path) -> Result<()> {
        Loader::new(self.dialect.as_ref(), &self.schema)
            .load(input_path)
            .await
    }

    /// Close the dialect connection.
    pub async fn shutdown(&self) -> Result<()> {
        self.dialect.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{author_book_catalog, StubDialect};
    use mover_core::{Row, Value};

    #[test]
    fn test_seed_table_parses_from_clause() {
        assert_eq!(seed_table("select * from ulule_project"), Some("ulule_project".into()));
        assert_eq!(seed_table("SELECT * FROM ulule_project"), Some("ulule_project".into()));
        assert_eq!(
            seed_table("SELECT one, two, three FROM ulule_project"),
            Some("ulule_project".into())
        );
        assert_eq!(
            seed_table("SELECT * FROM \"user\" WHERE id = 1"),
            Some("user".into())
        );
    }

    #[test]
    fn test_seed_table_rejects_queries_without_from() {
        assert_eq!(seed_table("SELECT 1"), None);
        assert_eq!(seed_table("SELECT * FROM"), None);
    }

    #[tokio::test]
    async fn test_describe_returns_catalog_entry() {
        let dialect = Arc::new(StubDialect::new(author_book_catalog()));
        let engine = Engine::new(Config::default(), dialect).await.unwrap();

        let table = engine.describe("author").unwrap();
        assert_eq!(table.name, "author");
        assert!(matches!(
            engine.describe("missing"),
            Err(MoverError::Schema(_))
        ));
    }

    #[tokio::test]
    async fn test_extract_rejects_query_without_from() {
        let dialect = Arc::new(StubDialect::new(author_book_catalog()));
        let engine = Engine::new(Config::default(), dialect).await.unwrap();
        let dir = tempfile::tempdir().unwrap();

        let err = engine.extract(dir.path(), "SELECT 1").await.unwrap_err();
        assert!(matches!(err, MoverError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_extract_rejects_unknown_seed_table() {
        let dialect = Arc::new(StubDialect::new(author_book_catalog()));
        let engine = Engine::new(Config::default(), dialect).await.unwrap();
        let dir = tempfile::tempdir().unwrap();

        let err = engine
            .extract(dir.path(), "SELECT * FROM nope")
            .await
            .unwrap_err();
        assert!(matches!(err, MoverError::Schema(_)));
    }

    #[tokio::test]
    async fn test_extract_writes_one_payload_per_table() {
        let dialect = StubDialect::new(author_book_catalog());
        dialect.respond(
            "SELECT * FROM book WHERE id = 1",
            &[],
            vec![Row::new(
                vec!["id".into(), "title".into(), "author_id".into()],
                vec![
                    Value::Int64(1),
                    Value::String("dune".into()),
                    Value::Int64(7),
                ],
            )],
        );
        dialect.respond(
            "SELECT * FROM author WHERE id = $1",
            &[Value::Int64(7)],
            vec![Row::new(
                vec!["id".into(), "name".into()],
                vec![Value::Int64(7), Value::String("herbert".into())],
            )],
        );

        let engine = Engine::new(Config::default(), Arc::new(dialect)).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        engine
            .extract(dir.path(), "SELECT * FROM book WHERE id = 1")
            .await
            .unwrap();

        let book: Payload = serde_json::from_slice(
            &std::fs::read(dir.path().join("book.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(book.table_name, "book");
        assert_eq!(book.count, 1);

        let author: Payload = serde_json::from_slice(
            &std::fs::read(dir.path().join("author.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(author.count, 1);
        assert_eq!(
            author.data[0].get("name"),
            Some(&Value::String("herbert".into()))
        );
    }

    #[tokio::test]
    async fn test_extract_runs_extra_schemas_after_seed() {
        let dialect = StubDialect::new(author_book_catalog());
        dialect.respond(
            "SELECT * FROM author WHERE id = 1",
            &[],
            vec![Row::new(
                vec!["id".into(), "name".into()],
                vec![Value::Int64(1), Value::String("a".into())],
            )],
        );
        dialect.respond(
            "SELECT * FROM book WHERE author_id = $1",
            &[Value::Int64(1)],
            vec![],
        );
        dialect.respond(
            "SELECT * FROM book",
            &[],
            vec![Row::new(
                vec!["id".into(), "title".into(), "author_id".into()],
                vec![Value::Int64(9), Value::String("solo".into()), Value::Null],
            )],
        );

        let config: Config =
            serde_json::from_str(r#"{"extra": [{"table_name": "book"}]}"#).unwrap();
        let engine = Engine::new(config, Arc::new(dialect)).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        engine
            .extract(dir.path(), "SELECT * FROM author WHERE id = 1")
            .await
            .unwrap();

        let book: Payload = serde_json::from_slice(
            &std::fs::read(dir.path().join("book.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(book.count, 1);
        assert_eq!(book.data[0].get("id"), Some(&Value::Int64(9)));
    }
}
