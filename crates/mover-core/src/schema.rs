//! Introspected table catalog

use serde::{Deserialize, Serialize};

use crate::{MoverError, Result};

/// Definition of a database table with its key relationships.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub primary_keys: Vec<PrimaryKey>,
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKey>,
    pub reference_keys: Vec<ReferenceKey>,
}

impl Table {
    /// The identity column: the first primary key.
    pub fn primary_key(&self) -> Result<&PrimaryKey> {
        self.primary_keys
            .first()
            .ok_or_else(|| MoverError::Schema(format!("table {} has no primary key", self.name)))
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a foreign key by the column that carries it
    pub fn foreign_key_on(&self, column_name: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.column_name == column_name)
    }
}

/// A primary key column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub name: String,
    pub data_type: String,
    pub table_name: String,
}

impl std::fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.table_name, self.name)
    }
}

/// A table column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub position: i64,
    pub table_name: String,
}

/// Outbound edge: this table's `column_name` points at
/// `referenced_table(referenced_column_name)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub column_name: String,
    pub referenced_table: String,
    pub referenced_column_name: String,
}

impl std::fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.referenced_table, self.referenced_column_name)
    }
}

/// Inbound edge: `table.column_name` points back at this table's primary key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceKey {
    pub name: String,
    pub table: String,
    pub column_name: String,
}

impl std::fmt::Display for ReferenceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.table, self.column_name)
    }
}

/// Post-introspection pass: every foreign and reference key must point at a
/// table present in the catalog. A dangling name means the introspection
/// returned an inconsistent snapshot.
pub fn resolve_references(tables: &[Table]) -> Result<()> {
    for table in tables {
        for fk in &table.foreign_keys {
            if !tables.iter().any(|t| t.name == fk.referenced_table) {
                return Err(MoverError::Schema(format!(
                    "foreign key {} on {} references unknown table {}",
                    fk.name, table.name, fk.referenced_table
                )));
            }
        }
        for rk in &table.reference_keys {
            if !tables.iter().any(|t| t.name == rk.table) {
                return Err(MoverError::Schema(format!(
                    "reference key {} on {} points from unknown table {}",
                    rk.name, table.name, rk.table
                )));
            }
        }
    }
    Ok(())
}
