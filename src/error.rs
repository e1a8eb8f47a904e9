//! Migration-specific error types

use crate::migration::{ActionError, Direction};
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by [`ExecutionStore`](crate::store::ExecutionStore) implementations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error from a file-backed store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored data is readable but violates the store's own constraints
    #[error("corrupted execution store: {0}")]
    Corrupted(String),

    /// Error raised by a third-party backend (SQL/NoSQL driver, ...)
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// Failure forced on a test double
    #[error("{0}")]
    Injected(String),
}

impl StoreError {
    /// Wrap any driver error as [`StoreError::Backend`]
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(error))
    }
}

/// Migration errors
///
/// Plan construction failures have one variant per violated invariant
/// (`TooManyExecutions`, `UnfinishedNotLast`, `OutOfOrder`) so callers can
/// tell them apart. Handler operations wrap their failures in
/// [`MigrationError::Operation`]; use [`MigrationError::innermost`] to get at
/// the root cause.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A migration with the same version is already in the registry
    #[error("failed to register migration {version}, the version is already registered")]
    AlreadyRegistered { version: u64 },

    /// The execution store failed
    #[error("failed to {operation}: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    /// More persisted executions than registered migrations
    #[error(
        "there are more executions ({executions}) than registered migrations ({migrations}). \
         Fix executions issues before trying to manipulate their state"
    )]
    TooManyExecutions { executions: usize, migrations: usize },

    /// An unfinished execution that is not the last one in version order
    #[error(
        "execution {version} at index {index} is unfinished but is not the last execution. \
         Only the last execution may be unfinished"
    )]
    UnfinishedNotLast { version: u64, index: usize },

    /// Executions are not a gapless, ordered prefix of the registered migrations
    #[error(
        "execution {execution} at index {index} does not match registered migration \
         {registered}. Migrations and executions are out of order"
    )]
    OutOfOrder {
        index: usize,
        execution: u64,
        registered: u64,
    },

    /// A migration's `up()` or `down()` returned an error
    #[error("migration {version} {direction} failed: {source}")]
    ActionFailed {
        version: u64,
        direction: Direction,
        #[source]
        source: ActionError,
    },

    /// Forced rollback of a migration that has no execution record
    #[error("execution for migration {version} not found. Maybe the migration was never executed")]
    NeverExecuted { version: u64 },

    /// Several failures in the same step (e.g. `up()` and the following save)
    #[error("{}", join_messages(.0))]
    Joined(Vec<MigrationError>),

    /// Failure of a handler operation, with the operation name as context
    #[error("{operation} failed: {source}")]
    Operation {
        operation: &'static str,
        #[source]
        source: Box<MigrationError>,
    },

    /// Invalid number of runs input
    #[error(
        "invalid number of runs {0:?}. Accepted values: an integer number or \"all\""
    )]
    InvalidNumOfRuns(String),

    /// Migrations directory does not exist or cannot be read
    #[error("invalid migrations directory {}: {reason}", .path.display())]
    InvalidMigrationsDir { path: PathBuf, reason: String },

    /// Migration files and registered migrations disagree
    #[error(
        "registry has invalid state. You must register all migrations before running \
         migrations. Not registered: {}. Extra migrations: {}",
        list_or_none(.missing),
        list_or_none(.extra)
    )]
    UnregisteredMigrations {
        missing: Vec<String>,
        extra: Vec<String>,
    },

    /// Run lock could not be acquired in time
    #[error(
        "failed to acquire run lock '{name}' within {waited_ms}ms. Another process may be \
         running migrations; remove the lock file if no run is in progress"
    )]
    LockTimeout { name: String, waited_ms: u128 },

    /// Run lock file could not be created
    #[error("failed to create run lock at {}: {source}", .path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Blank migration file could not be generated
    #[error("could not generate blank migration {}: {source}", .path.display())]
    Scaffold {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MigrationError {
    /// Wrap this error with the name of the operation that failed
    #[must_use]
    pub fn during(self, operation: &'static str) -> Self {
        MigrationError::Operation {
            operation,
            source: Box::new(self),
        }
    }

    /// Strip [`MigrationError::Operation`] context layers
    pub fn innermost(&self) -> &MigrationError {
        match self {
            MigrationError::Operation { source, .. } => source.innermost(),
            other => other,
        }
    }

    /// Join zero, one or more errors into a single optional error
    ///
    /// A single error is returned as-is rather than wrapped in `Joined`.
    pub fn join(errors: Vec<MigrationError>) -> Option<MigrationError> {
        let mut errors = errors;
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(MigrationError::Joined(errors)),
        }
    }
}

fn join_messages(errors: &[MigrationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
