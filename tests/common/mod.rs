//! Shared helpers for handler integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use tidemark::{
    ActionError, ExecutionStore, InMemoryStore, Migration, MigrationExecution, MigrationRegistry,
    StoreError,
};

/// Ordered log of `up()`/`down()` calls, e.g. `["up 3", "up 4", "down 4"]`
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, call: String) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Migration that records its calls and can be told to fail
pub struct RecordingMigration {
    version: u64,
    log: CallLog,
    fail_up: bool,
    fail_down: bool,
}

impl RecordingMigration {
    pub fn new(version: u64, log: &CallLog) -> Self {
        Self {
            version,
            log: log.clone(),
            fail_up: false,
            fail_down: false,
        }
    }

    pub fn failing_up(mut self) -> Self {
        self.fail_up = true;
        self
    }

    pub fn failing_down(mut self) -> Self {
        self.fail_down = true;
        self
    }
}

impl Migration for RecordingMigration {
    fn version(&self) -> u64 {
        self.version
    }

    fn up(&self) -> Result<(), ActionError> {
        self.log.record(format!("up {}", self.version));
        if self.fail_up {
            return Err(format!("up {} exploded", self.version).into());
        }
        Ok(())
    }

    fn down(&self) -> Result<(), ActionError> {
        self.log.record(format!("down {}", self.version));
        if self.fail_down {
            return Err(format!("down {} exploded", self.version).into());
        }
        Ok(())
    }
}

/// In-memory store that appends its writes to the migrations' call log
///
/// Successful `save`/`remove` calls are logged as `"save N"`/`"remove N"`,
/// so a test can assert how actions and durable writes interleave.
pub struct RecordingStore {
    inner: InMemoryStore,
    log: CallLog,
}

impl RecordingStore {
    pub fn new(inner: InMemoryStore, log: &CallLog) -> Self {
        Self {
            inner,
            log: log.clone(),
        }
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }
}

impl ExecutionStore for RecordingStore {
    fn init(&self) -> Result<(), StoreError> {
        self.inner.init()
    }

    fn load_executions(&self) -> Result<Vec<MigrationExecution>, StoreError> {
        self.inner.load_executions()
    }

    fn save(&self, execution: &MigrationExecution) -> Result<(), StoreError> {
        self.inner.save(execution)?;
        self.log.record(format!("save {}", execution.version));
        Ok(())
    }

    fn remove(&self, execution: &MigrationExecution) -> Result<(), StoreError> {
        self.inner.remove(execution)?;
        self.log.record(format!("remove {}", execution.version));
        Ok(())
    }

    fn find_one(&self, version: u64) -> Result<Option<MigrationExecution>, StoreError> {
        self.inner.find_one(version)
    }
}

/// Registry of recording migrations for `versions`
pub fn recording_registry(versions: &[u64], log: &CallLog) -> MigrationRegistry {
    registry_of(
        versions
            .iter()
            .map(|&v| RecordingMigration::new(v, log))
            .collect(),
    )
}

pub fn registry_of(migrations: Vec<RecordingMigration>) -> MigrationRegistry {
    MigrationRegistry::from_migrations(
        migrations
            .into_iter()
            .map(|m| Box::new(m) as Box<dyn Migration>),
    )
    .expect("versions should be unique")
}

pub fn finished(version: u64) -> MigrationExecution {
    MigrationExecution::new(version, 1_000 + version, 2_000 + version)
}

pub fn unfinished(version: u64) -> MigrationExecution {
    MigrationExecution::new(version, 1_000 + version, 0)
}

/// Versions stored, ascending, with their finished flag
pub fn stored(executions: &[MigrationExecution]) -> Vec<(u64, bool)> {
    let mut stored: Vec<(u64, bool)> = executions
        .iter()
        .map(|e| (e.version, e.finished()))
        .collect();
    stored.sort_unstable();
    stored
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
