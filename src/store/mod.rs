//! Execution history persistence
//!
//! The core only depends on the [`ExecutionStore`] trait. SQL or NoSQL
//! backends implement it in their own crates; two stores ship here:
//!
//! - [`InMemoryStore`] for tests and dry runs
//! - [`JsonFileStore`] for projects that keep execution history next to
//!   their migrations

pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::{InMemoryStore, StoreOp};

use crate::record::MigrationExecution;
use crate::StoreError;

/// Storage of migration execution history
///
/// Every method call is expected to be an independent, immediately committed
/// operation. Receivers are `&self`; stores needing mutation use interior
/// mutability.
pub trait ExecutionStore {
    /// Idempotent setup (create table, collection, file, ...)
    fn init(&self) -> Result<(), StoreError>;

    /// All persisted executions, in any order
    fn load_executions(&self) -> Result<Vec<MigrationExecution>, StoreError>;

    /// Insert or update the execution with the same version
    fn save(&self, execution: &MigrationExecution) -> Result<(), StoreError>;

    /// Delete the execution with the same version
    fn remove(&self, execution: &MigrationExecution) -> Result<(), StoreError>;

    /// Find the execution for `version`, `Ok(None)` if there is none
    fn find_one(&self, version: u64) -> Result<Option<MigrationExecution>, StoreError>;
}

macro_rules! forward_execution_store {
    ($($ty:ty),*) => {$(
        impl<S: ExecutionStore + ?Sized> ExecutionStore for $ty {
            fn init(&self) -> Result<(), StoreError> {
                (**self).init()
            }

            fn load_executions(&self) -> Result<Vec<MigrationExecution>, StoreError> {
                (**self).load_executions()
            }

            fn save(&self, execution: &MigrationExecution) -> Result<(), StoreError> {
                (**self).save(execution)
            }

            fn remove(&self, execution: &MigrationExecution) -> Result<(), StoreError> {
                (**self).remove(execution)
            }

            fn find_one(&self, version: u64) -> Result<Option<MigrationExecution>, StoreError> {
                (**self).find_one(version)
            }
        }
    )*};
}

// Lets a caller keep ownership of a store it hands to the handler
forward_execution_store!(&S, Box<S>);
