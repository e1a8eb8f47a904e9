//! Migration registry

use crate::migration::Migration;
use crate::MigrationError;
use std::collections::BTreeMap;

/// The complete, statically known set of migrations, indexed by version
///
/// Built once at startup and read-only afterwards. Iteration is always in
/// ascending version order.
#[derive(Default)]
pub struct MigrationRegistry {
    migrations: BTreeMap<u64, Box<dyn Migration>>,
}

impl MigrationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of migrations
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::AlreadyRegistered` for the first duplicated version.
    pub fn from_migrations<I>(migrations: I) -> Result<Self, MigrationError>
    where
        I: IntoIterator<Item = Box<dyn Migration>>,
    {
        let mut registry = Self::new();
        for migration in migrations {
            registry.register(migration)?;
        }
        Ok(registry)
    }

    /// Register a migration
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::AlreadyRegistered` if a migration with the same
    /// version is already registered. The registry is left unchanged.
    pub fn register(&mut self, migration: Box<dyn Migration>) -> Result<(), MigrationError> {
        let version = migration.version();

        if self.migrations.contains_key(&version) {
            return Err(MigrationError::AlreadyRegistered { version });
        }

        self.migrations.insert(version, migration);
        Ok(())
    }

    /// All registered versions, ascending
    pub fn ordered_versions(&self) -> Vec<u64> {
        self.migrations.keys().copied().collect()
    }

    /// All registered migrations, ascending by version
    pub fn ordered_migrations(&self) -> Vec<&dyn Migration> {
        self.migrations.values().map(AsRef::as_ref).collect()
    }

    /// Get a migration by version
    pub fn get(&self, version: u64) -> Option<&dyn Migration> {
        self.migrations.get(&version).map(AsRef::as_ref)
    }

    pub fn contains(&self, version: u64) -> bool {
        self.migrations.contains_key(&version)
    }

    /// Total number of registered migrations
    pub fn count(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

impl std::fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("versions", &self.ordered_versions())
            .finish()
    }
}
