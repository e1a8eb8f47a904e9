//! # Tidemark
//!
//! Versioned migration sequencing with a durable, resumable execution history.
//!
//! Migrations are registered in a [`MigrationRegistry`] under a unique `u64`
//! version. An [`ExecutionStore`] persists one [`MigrationExecution`] per
//! migration that was run. Before every run, the [`MigrationHandler`] builds
//! an [`ExecutionPlan`] that checks the history is a gapless prefix of the
//! registered migrations, then runs the next migrations forward or the last
//! ones backward, saving each outcome as soon as it is known.
//!
//! # Example
//!
//! ```rust
//! use tidemark::{FnMigration, InMemoryStore, Migration, MigrationHandler, MigrationRegistry, NumOfRuns};
//!
//! # fn main() -> Result<(), tidemark::MigrationError> {
//! let registry = MigrationRegistry::from_migrations(vec![
//!     Box::new(FnMigration::new(1_712_953_077, || Ok(()), || Ok(()))) as Box<dyn Migration>,
//!     Box::new(FnMigration::new(1_712_953_080, || Ok(()), || Ok(()))),
//! ])?;
//!
//! let handler = MigrationHandler::new(registry, InMemoryStore::new())?;
//! let applied = handler.migrate_up(NumOfRuns::ALL).into_result()?;
//! assert_eq!(applied.len(), 2);
//!
//! let plan = handler.plan()?;
//! assert_eq!(plan.finished_executions_count(), 2);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod directory;
pub mod error;
pub mod handler;
pub mod lock;
pub mod migration;
pub mod plan;
pub mod record;
pub mod registry;
pub mod steps;
pub mod store;

pub use config::MigrateConfig;
pub use directory::{migration_file_name, MigrationsDir, RegistryCoverage};
pub use error::{MigrationError, StoreError};
pub use handler::{HandledMigration, MigrationHandler, RunReport};
pub use lock::RunLock;
pub use migration::{ActionError, Direction, FnMigration, Migration, NoopMigration};
pub use plan::{ExecutedMigration, ExecutionPlan};
pub use record::MigrationExecution;
pub use registry::MigrationRegistry;
pub use steps::NumOfRuns;
pub use store::{ExecutionStore, InMemoryStore, JsonFileStore, StoreOp};
