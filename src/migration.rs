//! Migration trait definition

use std::fmt;

/// Error type returned by a migration's `up()` and `down()`
///
/// Boxed so migration authors can use `?` with whatever their database
/// driver returns.
pub type ActionError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Trait that all migrations must implement
///
/// Each migration file defines a struct implementing this trait, with an
/// `up()` that applies the change and a `down()` that reverts it.
/// Both should be idempotent: an interrupted `up()` is re-run from scratch on
/// the next forward run.
pub trait Migration: Send + Sync {
    /// Globally unique version (by convention the unix timestamp, in seconds,
    /// at which the migration file was generated). Must match the version in
    /// the file name.
    fn version(&self) -> u64;

    /// Apply the migration (forward migration)
    fn up(&self) -> Result<(), ActionError>;

    /// Rollback the migration (reverse migration)
    fn down(&self) -> Result<(), ActionError>;
}

impl fmt::Debug for dyn Migration + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version())
            .finish()
    }
}

/// Direction for migration execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Apply the migration (up)
    Up,
    /// Rollback the migration (down)
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up()"),
            Direction::Down => write!(f, "down()"),
        }
    }
}

type Action = Box<dyn Fn() -> Result<(), ActionError> + Send + Sync>;

/// Migration backed by a pair of closures
///
/// ```rust
/// use tidemark::FnMigration;
///
/// let migration = FnMigration::new(
///     1_712_953_077,
///     || Ok(()),
///     || Ok(()),
/// );
/// # use tidemark::Migration;
/// assert_eq!(migration.version(), 1_712_953_077);
/// ```
pub struct FnMigration {
    version: u64,
    up: Action,
    down: Action,
}

impl FnMigration {
    pub fn new<U, D>(version: u64, up: U, down: D) -> Self
    where
        U: Fn() -> Result<(), ActionError> + Send + Sync + 'static,
        D: Fn() -> Result<(), ActionError> + Send + Sync + 'static,
    {
        Self {
            version,
            up: Box::new(up),
            down: Box::new(down),
        }
    }
}

impl Migration for FnMigration {
    fn version(&self) -> u64 {
        self.version
    }

    fn up(&self) -> Result<(), ActionError> {
        (self.up)()
    }

    fn down(&self) -> Result<(), ActionError> {
        (self.down)()
    }
}

/// Migration whose `up()` and `down()` do nothing
#[derive(Debug, Clone, Copy)]
pub struct NoopMigration {
    version: u64,
}

impl NoopMigration {
    pub fn new(version: u64) -> Self {
        Self { version }
    }
}

impl Migration for NoopMigration {
    fn version(&self) -> u64 {
        self.version
    }

    fn up(&self) -> Result<(), ActionError> {
        Ok(())
    }

    fn down(&self) -> Result<(), ActionError> {
        Ok(())
    }
}
