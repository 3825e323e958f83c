//! Load path: payload files back into the database

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use mover_core::{Dialect, MoverError, Result};

use crate::engine::TableSchema;
use crate::payload::{Payload, PAYLOAD_EXTENSION};

/// Replays payload files through the dialect's transactional bulk insert.
/// Borrowed from the engine for the duration of one load verb.
pub struct Loader<'a> {
    dialect: &'a dyn Dialect,
    schema: &'a HashMap<String, TableSchema>,
}

impl<'a> Loader<'a> {
    pub fn new(dialect: &'a dyn Dialect, schema: &'a HashMap<String, TableSchema>) -> Self {
        Self { dialect, schema }
    }

    /// Load every payload file under `input_path`, walking subdirectories in
    /// lexical order.
    pub async fn load(&self, input_path: &Path) -> Result<()> {
        if !input_path.is_dir() {
            return Err(MoverError::Load(format!(
                "unable to open directory {}",
                input_path.display()
            )));
        }

        tracing::info!(path = %input_path.display(), "loading files from directory");

        let files = collect_payload_files(input_path)?;
        for file in files {
            tracing::info!(file = %file.display(), "load file");
            self.load_file(&file).await?;
        }

        Ok(())
    }

    async fn load_file(&self, path: &Path) -> Result<()> {
        let raw = tokio::fs::read(path).await?;
        let payload = Payload::from_slice(&raw).map_err(|e| {
            MoverError::Load(format!("unable to decode {}: {}", path.display(), e))
        })?;

        let schema = self.schema.get(&payload.table_name).ok_or_else(|| {
            MoverError::Load(format!(
                "unable to load {}: table {} does not exist",
                path.display(),
                payload.table_name
            ))
        })?;

        self.dialect
            .bulk_insert(&schema.table, &payload.data)
            .await
            .map_err(|e| {
                MoverError::Load(format!("unable to load file {}: {}", path.display(), e))
            })
    }
}

/// Regular files ending in the payload extension, recursively, in lexical
/// walk order.
fn collect_payload_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(root, &mut files)?;
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|entry| entry.path())
        .collect();
    entries.sort();

    for path in entries {
        if path.is_dir() {
            walk(&path, files)?;
        } else if path
            .extension()
            .map(|ext| ext == PAYLOAD_EXTENSION)
            .unwrap_or(false)
        {
            files.push(path);
        }
    }

    Ok(())
}
