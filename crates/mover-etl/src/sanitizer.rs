//! Per-column sanitization of extracted rows

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::SeedableRng;

use mover_config::{ColumnRule, SchemaOverride};
use mover_core::{Result, Row, Table, Value};

use crate::engine::TableSchema;
use crate::faker::{self, Locale};
use crate::template;

const MAX_UNIQUE_ATTEMPTS: usize = 64;

/// Produces the emitted rows for one table from the extractor's cache entry:
/// flatten the result sets, dedup on the primary key, and apply the
/// configured column rules. Scoped to a single extract invocation, like its
/// uniqueness cache.
pub struct Sanitizer<'a> {
    schema: &'a HashMap<String, TableSchema>,
    locale: Locale,
    rng: StdRng,
    cache: HashMap<String, HashSet<String>>,
}

impl<'a> Sanitizer<'a> {
    pub fn new(locale_tag: &str, schema: &'a HashMap<String, TableSchema>) -> Self {
        Self {
            schema,
            locale: Locale::from_tag(locale_tag),
            rng: StdRng::from_entropy(),
            cache: HashMap::new(),
        }
    }

    /// Flatten and dedup the table's result sets in insertion order, then
    /// rewrite each row. Tables without column rules pass through untouched.
    pub fn sanitize(&mut self, table: &Table, sets: &[Vec<Row>]) -> Result<Vec<Row>> {
        let primary_key = table.primary_key()?.name.clone();
        let schema_map = self.schema;
        let config = schema_map.get(&table.name).map(|schema| &schema.config);

        let mut index: HashSet<String> = HashSet::new();
        let mut results = Vec::new();

        for set in sets {
            for row in set {
                let pk_value = row
                    .get(&primary_key)
                    .map(|value| value.to_string())
                    .unwrap_or_default();
                if !index.insert(pk_value) {
                    continue;
                }

                match config {
                    Some(config) if !config.columns.is_empty() => {
                        results.push(self.sanitize_row(config, row.clone()));
                    }
                    _ => results.push(row.clone()),
                }
            }
        }

        Ok(results)
    }

    /// Rule precedence per column: replace, then fake, then sanitize.
    fn sanitize_row(&mut self, config: &SchemaOverride, mut row: Row) -> Row {
        for rule in &config.columns {
            if let Some(replace) = &rule.replace {
                let expanded = template::expand(replace, &row);
                row.set(&rule.name, Value::String(expanded));
            } else if !rule.fake.is_empty() {
                let original = row.get(&rule.name).cloned().unwrap_or(Value::Null);
                let value = self.fake_value(rule, original);
                row.set(&rule.name, value);
            } else if rule.sanitize {
                row.set(&rule.name, Value::Null);
            }
        }
        row
    }

    fn fake_value(&mut self, rule: &ColumnRule, original: Value) -> Value {
        let Some(mut value) = faker::generate(&mut self.rng, self.locale, &rule.fake) else {
            // Unknown tag: leave the column alone.
            return original;
        };

        if rule.unique {
            let seen = self.cache.entry(rule.name.clone()).or_default();
            let mut attempts = 0;
            while seen.contains(&value) {
                attempts += 1;
                if attempts > MAX_UNIQUE_ATTEMPTS {
                    // The word table is smaller than the row count; append a
                    // growing disambiguator instead of spinning.
                    value = format!("{}-{}", value, seen.len());
                } else if let Some(retry) = faker::generate(&mut self.rng, self.locale, &rule.fake)
                {
                    value = retry;
                }
            }
            seen.insert(value.clone());
        }

        Value::String(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::schema_map;
    use mover_config::Config;
    use mover_core::{PrimaryKey, Table};

    fn user_table() -> Table {
        Table {
            name: "user".into(),
            primary_keys: vec![PrimaryKey {
                name: "id".into(),
                data_type: "integer".into(),
                table_name: "user".into(),
            }],
            ..Default::default()
        }
    }

    fn user_row(id: i64, name: &str, email: &str, password: &str) -> Row {
        Row::new(
            vec!["id".into(), "name".into(), "email".into(), "password".into()],
            vec![
                Value::Int64(id),
                Value::String(name.into()),
                Value::String(email.into()),
                Value::String(password.into()),
            ],
        )
    }

    fn scrubbing_config() -> Config {
        serde_json::from_str(
            r#"{"schema": [{"table_name": "user", "columns": [
                {"name": "email", "replace": "u-{id}@x.y"},
                {"name": "password", "sanitize": true},
                {"name": "name", "fake": "last_name", "unique": true}
            ]}]}"#,
        )
        .unwrap()
    }

    /// S6: replace, sanitize, and unique fake combined over three rows.
    #[test]
    fn test_replace_fake_sanitize_combined() {
        let schema = schema_map(&scrubbing_config(), vec![user_table()]);
        let mut sanitizer = Sanitizer::new("", &schema);

        let sets = vec![vec![
            user_row(1, "Messa", "a@ulule.com", "$ecret"),
            user_row(2, "Riviere", "b@ulule.com", "hunter2"),
            user_row(3, "Leblanc", "c@ulule.com", "pa55"),
        ]];
        let results = sanitizer.sanitize(&user_table(), &sets).unwrap();

        let emails: Vec<_> = results
            .iter()
            .map(|row| row.get("email").unwrap().to_string())
            .collect();
        assert_eq!(emails, vec!["u-1@x.y", "u-2@x.y", "u-3@x.y"]);

        for row in &results {
            assert_eq!(row.get("password"), Some(&Value::Null));
        }

        let names: HashSet<String> = results
            .iter()
            .map(|row| row.get("name").unwrap().to_string())
            .collect();
        assert_eq!(names.len(), 3, "fake names must be distinct");
    }

    /// Invariant: without column rules the sanitizer is the identity, row
    /// for row, column for column.
    #[test]
    fn test_passthrough_without_column_rules() {
        let schema = schema_map(&Config::default(), vec![user_table()]);
        let mut sanitizer = Sanitizer::new("", &schema);

        let rows = vec![user_row(1, "a", "a@x.y", "s"), user_row(2, "b", "b@x.y", "t")];
        let results = sanitizer
            .sanitize(&user_table(), &[rows.clone()])
            .unwrap();
        assert_eq!(results, rows);
    }

    /// Invariant: no two emitted rows share a primary-key value, and the
    /// first surfacing wins.
    #[test]
    fn test_dedup_on_primary_key_keeps_first() {
        let schema = schema_map(&Config::default(), vec![user_table()]);
        let mut sanitizer = Sanitizer::new("", &schema);

        let sets = vec![
            vec![user_row(1, "first", "a@x.y", "s")],
            vec![user_row(1, "second", "b@x.y", "t"), user_row(2, "other", "c@x.y", "u")],
        ];
        let results = sanitizer.sanitize(&user_table(), &sets).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].get("name"), Some(&Value::String("first".into())));
    }

    /// Invariant: N rows with a unique fake produce N distinct values, even
    /// when the generator's value space is smaller than N.
    #[test]
    fn test_unique_fake_cardinality_beyond_word_table() {
        let schema = schema_map(&scrubbing_config(), vec![user_table()]);
        let mut sanitizer = Sanitizer::new("", &schema);

        let rows: Vec<Row> = (1..=100)
            .map(|id| user_row(id, "x", "x@x.y", "s"))
            .collect();
        let results = sanitizer.sanitize(&user_table(), &[rows]).unwrap();

        let names: HashSet<String> = results
            .iter()
            .map(|row| row.get("name").unwrap().to_string())
            .collect();
        assert_eq!(names.len(), 100);
    }

    /// Precedence: replace wins over fake and sanitize on the same column.
    #[test]
    fn test_replace_takes_precedence() {
        let config: Config = serde_json::from_str(
            r#"{"schema": [{"table_name": "user", "columns": [
                {"name": "name", "replace": "{id}", "fake": "last_name", "sanitize": true}
            ]}]}"#,
        )
        .unwrap();
        let schema = schema_map(&config, vec![user_table()]);
        let mut sanitizer = Sanitizer::new("", &schema);

        let results = sanitizer
            .sanitize(&user_table(), &[vec![user_row(9, "x", "x@x.y", "s")]])
            .unwrap();
        assert_eq!(results[0].get("name"), Some(&Value::String("9".into())));
    }

    /// An unknown fake tag leaves the original value in place.
    #[test]
    fn test_unknown_fake_tag_is_a_noop() {
        let config: Config = serde_json::from_str(
            r#"{"schema": [{"table_name": "user", "columns": [
                {"name": "name", "fake": "unhandled_tag"}
            ]}]}"#,
        )
        .unwrap();
        let schema = schema_map(&config, vec![user_table()]);
        let mut sanitizer = Sanitizer::new("", &schema);

        let results = sanitizer
            .sanitize(&user_table(), &[vec![user_row(1, "keep", "k@x.y", "s")]])
            .unwrap();
        assert_eq!(results[0].get("name"), Some(&Value::String("keep".into())));
    }
}
