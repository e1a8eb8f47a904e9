//! JSON file execution store

use super::ExecutionStore;
use crate::record::MigrationExecution;
use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ExecutionsDocument {
    #[serde(default)]
    executions: Vec<MigrationExecution>,
}

/// Execution store persisted as a single JSON document
///
/// Every `save` and `remove` rewrites the whole document atomically: the new
/// content goes to a temporary file in the same directory, is synced, then
/// renamed over the previous document. A crash mid-write leaves the previous
/// history intact.
///
/// ```json
/// { "executions": [ { "version": 1712953077, "executed_at_ms": 1712953100000, "finished_at_ms": 1712953100042 } ] }
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<ExecutionsDocument, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ExecutionsDocument::default()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(ExecutionsDocument::default());
        }

        let document: ExecutionsDocument = serde_json::from_str(&content)?;

        let mut seen = HashSet::new();
        for execution in &document.executions {
            if !seen.insert(execution.version) {
                return Err(StoreError::Corrupted(format!(
                    "{} holds more than one execution for version {}",
                    self.path.display(),
                    execution.version
                )));
            }
        }

        Ok(document)
    }

    fn write(&self, document: &ExecutionsDocument) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, document)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;

        Ok(())
    }
}

impl ExecutionStore for JsonFileStore {
    fn init(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        match fs::metadata(&self.path) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("Creating execution store at {}", self.path.display());
                self.write(&ExecutionsDocument::default())?;
            }
            Err(e) => return Err(e.into()),
        }

        // Surface a corrupt document at startup rather than on first use
        self.read().map(|_| ())
    }

    fn load_executions(&self) -> Result<Vec<MigrationExecution>, StoreError> {
        Ok(self.read()?.executions)
    }

    fn save(&self, execution: &MigrationExecution) -> Result<(), StoreError> {
        let mut document = self.read()?;

        match document
            .executions
            .iter_mut()
            .find(|e| e.version == execution.version)
        {
            Some(existing) => *existing = *execution,
            None => document.executions.push(*execution),
        }
        document.executions.sort_by_key(|e| e.version);

        self.write(&document)
    }

    fn remove(&self, execution: &MigrationExecution) -> Result<(), StoreError> {
        let mut document = self.read()?;
        let before = document.executions.len();
        document.executions.retain(|e| e.version != execution.version);

        if document.executions.len() == before {
            return Ok(());
        }

        self.write(&document)
    }

    fn find_one(&self, version: u64) -> Result<Option<MigrationExecution>, StoreError> {
        Ok(self
            .read()?
            .executions
            .into_iter()
            .find(|e| e.version == version))
    }
}
