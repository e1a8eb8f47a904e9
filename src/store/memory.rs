//! In-memory execution store

use super::ExecutionStore;
use crate::record::MigrationExecution;
use crate::StoreError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Store operations, used to force failures on [`InMemoryStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Init,
    Load,
    Save,
    Remove,
    FindOne,
}

/// Execution store kept in memory
///
/// Nothing survives the process. Failures can be injected per operation with
/// [`InMemoryStore::fail`]; a failing `save` or `remove` still applies the
/// change before reporting the error, the way a driver can commit and then
/// lose the acknowledgement.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    executions: Mutex<Vec<MigrationExecution>>,
    failures: Mutex<HashMap<StoreOp, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `executions`
    pub fn with_executions(executions: Vec<MigrationExecution>) -> Self {
        Self {
            executions: Mutex::new(executions),
            failures: Mutex::default(),
        }
    }

    /// Make every call of `op` return `StoreError::Injected(message)`
    pub fn fail(&self, op: StoreOp, message: impl Into<String>) {
        lock(&self.failures).insert(op, message.into());
    }

    /// Stop failing `op`
    pub fn recover(&self, op: StoreOp) {
        lock(&self.failures).remove(&op);
    }

    /// Snapshot of the stored executions, in storage order
    pub fn executions(&self) -> Vec<MigrationExecution> {
        lock(&self.executions).clone()
    }

    fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        match lock(&self.failures).get(&op) {
            Some(message) => Err(StoreError::Injected(message.clone())),
            None => Ok(()),
        }
    }
}

// A poisoned lock only means a panicking test thread; the data is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl ExecutionStore for InMemoryStore {
    fn init(&self) -> Result<(), StoreError> {
        self.check(StoreOp::Init)
    }

    fn load_executions(&self) -> Result<Vec<MigrationExecution>, StoreError> {
        self.check(StoreOp::Load)?;
        Ok(self.executions())
    }

    fn save(&self, execution: &MigrationExecution) -> Result<(), StoreError> {
        {
            let mut executions = lock(&self.executions);
            match executions.iter_mut().find(|e| e.version == execution.version) {
                Some(existing) => *existing = *execution,
                None => executions.push(*execution),
            }
        }
        self.check(StoreOp::Save)
    }

    fn remove(&self, execution: &MigrationExecution) -> Result<(), StoreError> {
        lock(&self.executions).retain(|e| e.version != execution.version);
        self.check(StoreOp::Remove)
    }

    fn find_one(&self, version: u64) -> Result<Option<MigrationExecution>, StoreError> {
        self.check(StoreOp::FindOne)?;
        Ok(lock(&self.executions)
            .iter()
            .find(|e| e.version == version)
            .copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_upserts_by_version() {
        let store = InMemoryStore::new();

        store.save(&MigrationExecution::new(1, 10, 0)).expect("save");
        store.save(&MigrationExecution::new(2, 20, 21)).expect("save");
        store.save(&MigrationExecution::new(1, 10, 11)).expect("save");

        assert_eq!(
            store.executions(),
            vec![
                MigrationExecution::new(1, 10, 11),
                MigrationExecution::new(2, 20, 21),
            ]
        );
    }

    #[test]
    fn test_remove_and_find_one() {
        let store = InMemoryStore::with_executions(vec![
            MigrationExecution::new(1, 10, 11),
            MigrationExecution::new(2, 20, 21),
        ]);

        store.remove(&MigrationExecution::new(1, 0, 0)).expect("remove");

        assert_eq!(store.find_one(1).expect("find"), None);
        assert_eq!(
            store.find_one(2).expect("find"),
            Some(MigrationExecution::new(2, 20, 21))
        );
    }

    #[test]
    fn test_injected_failures() {
        let store = InMemoryStore::new();
        store.fail(StoreOp::Load, "connection refused");

        let error = store.load_executions().expect_err("load should fail");
        assert_eq!(error.to_string(), "connection refused");

        store.recover(StoreOp::Load);
        assert!(store.load_executions().expect("load").is_empty());
    }

    #[test]
    fn test_failing_save_still_applies_change() {
        let store = InMemoryStore::new();
        store.fail(StoreOp::Save, "ack lost");

        assert!(store.save(&MigrationExecution::new(4, 1, 0)).is_err());
        assert_eq!(store.executions(), vec![MigrationExecution::new(4, 1, 0)]);
    }
}
