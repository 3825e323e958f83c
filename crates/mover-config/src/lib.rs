//! Typed configuration for mover
//!
//! The configuration file is JSON, named by the `MOVER_CONF` environment
//! variable. It carries the faker locale, per-table schema overrides
//! (which reverse edges to follow, how to scrub columns, extra templated
//! queries to fan out), and the `extra` schemas extracted wholesale after
//! the seed walk.

use std::path::Path;

use serde::{Deserialize, Serialize};

use mover_core::{MoverError, Result};

/// Root configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Locale tag for generated fake values (e.g. "fr"). Empty means the
    /// default locale.
    #[serde(default)]
    pub locale: String,
    /// Per-table overrides.
    #[serde(default)]
    pub schema: Vec<SchemaOverride>,
    /// Tables extracted with a plain `SELECT * FROM <table>` after the main
    /// seed walk.
    #[serde(default)]
    pub extra: Vec<SchemaOverride>,
}

impl Config {
    /// Load the configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|e| {
            MoverError::Configuration(format!("unable to open {}: {}", path.display(), e))
        })?;
        serde_json::from_slice(&raw).map_err(|e| {
            MoverError::Configuration(format!("unable to decode {}: {}", path.display(), e))
        })
    }

    /// Find the override for a table, when one is configured.
    pub fn override_for(&self, table_name: &str) -> Option<&SchemaOverride> {
        self.schema.iter().find(|s| s.table_name == table_name)
    }
}

/// Per-table extraction and sanitization override. Tables without one behave
/// as if an empty override were configured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaOverride {
    pub table_name: String,
    /// Suppress the depth-0 "follow every inbound edge" behavior.
    #[serde(default)]
    pub omit_reference_keys: bool,
    /// Reference keys (by constraint name) followed at any depth.
    #[serde(default)]
    pub reference_keys: Vec<String>,
    /// Templated queries fanned out per visited row.
    #[serde(default)]
    pub queries: Vec<QueryTemplate>,
    /// Column sanitization rules.
    #[serde(default)]
    pub columns: Vec<ColumnRule>,
}

/// A templated query expanded against each visited row: `{attr}` occurrences
/// are substituted with the row's values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryTemplate {
    pub table_name: String,
    pub query: String,
}

/// How one column of a table is rewritten on extract.
///
/// Precedence is first-match-wins: `replace`, then `fake`, then `sanitize`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnRule {
    pub name: String,
    /// Faker tag: last_name, first_name, email, street_address, phone_number.
    #[serde(default)]
    pub fake: String,
    /// Regenerate colliding fake values until unique within this extract.
    #[serde(default)]
    pub unique: bool,
    /// Template substituted against the row, e.g. `"user-{id}@example.com"`.
    #[serde(default)]
    pub replace: Option<String>,
    /// Null the column out.
    #[serde(default)]
    pub sanitize: bool,
    /// Treat the column value as a downloadable media path.
    #[serde(default)]
    pub download: Option<Download>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Download {
    #[serde(default, rename = "type")]
    pub kind: String,
    pub http: DownloadHttp,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadHttp {
    pub base_url: String,
}

impl DownloadHttp {
    /// Absolute URL for a stored media path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
