//! Migrations directory and file naming convention
//!
//! Migration files are named `version_{version}.rs`, e.g.
//! `version_1712953077.rs`. The directory check makes sure every migration
//! file has been registered and every registered migration has a file; it is
//! meant to run once at startup.

use crate::registry::MigrationRegistry;
use crate::MigrationError;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Prefix shared by all migration file names
pub const FILE_NAME_PREFIX: &str = "version";

/// Separator between the prefix and the version
pub const FILE_NAME_SEPARATOR: &str = "_";

static FILE_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^version_(\d+)\.rs$").expect("migration file name pattern is a valid regex")
});

/// File name of the migration with `version`
pub fn migration_file_name(version: u64) -> String {
    format!("{FILE_NAME_PREFIX}{FILE_NAME_SEPARATOR}{version}.rs")
}

/// Parse the version out of a migration file name
///
/// Returns `None` for names that do not follow the `version_{digits}.rs`
/// convention or whose version does not fit a `u64`.
pub fn parse_file_name(file_name: &str) -> Option<u64> {
    FILE_NAME_PATTERN
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .and_then(|version| version.as_str().parse().ok())
}

/// Result of comparing a migrations directory with a registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryCoverage {
    /// Files in the directory with no registered migration, sorted
    pub missing: Vec<String>,
    /// Registered migrations with no file in the directory, sorted
    pub extra: Vec<String>,
}

impl RegistryCoverage {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// A validated migrations directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationsDir {
    path: PathBuf,
}

impl MigrationsDir {
    /// # Errors
    ///
    /// Returns `MigrationError::InvalidMigrationsDir` if `path` does not exist
    /// or is not a directory.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, MigrationError> {
        let path = path.as_ref().to_path_buf();

        let metadata = fs::metadata(&path).map_err(|e| MigrationError::InvalidMigrationsDir {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        if !metadata.is_dir() {
            return Err(MigrationError::InvalidMigrationsDir {
                path,
                reason: "the provided path is not a directory".to_string(),
            });
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Versions of all migration files in the directory, ascending
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::InvalidMigrationsDir` if the directory cannot be read.
    pub fn versions(&self) -> Result<Vec<u64>, MigrationError> {
        let read_error = |e: std::io::Error| MigrationError::InvalidMigrationsDir {
            path: self.path.clone(),
            reason: format!("failed to read directory entries: {e}"),
        };

        let mut versions = Vec::new();
        for entry in fs::read_dir(&self.path).map_err(read_error)? {
            let entry = entry.map_err(read_error)?;

            if entry.file_type().map_err(read_error)?.is_dir() {
                continue;
            }

            if let Some(version) = entry.file_name().to_str().and_then(parse_file_name) {
                versions.push(version);
            }
        }

        versions.sort_unstable();
        Ok(versions)
    }

    /// Compare the migration files with the registered migrations
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::InvalidMigrationsDir` if the directory cannot be read.
    pub fn coverage(&self, registry: &MigrationRegistry) -> Result<RegistryCoverage, MigrationError> {
        let on_disk = self.versions()?;

        let missing = on_disk
            .iter()
            .filter(|&&version| !registry.contains(version))
            .map(|&version| migration_file_name(version))
            .collect();

        let extra = registry
            .ordered_versions()
            .into_iter()
            .filter(|version| on_disk.binary_search(version).is_err())
            .map(migration_file_name)
            .collect();

        Ok(RegistryCoverage { missing, extra })
    }

    /// Fail unless every migration file is registered and vice versa
    ///
    /// # Errors
    ///
    /// - `MigrationError::UnregisteredMigrations` listing the mismatched files
    /// - `MigrationError::InvalidMigrationsDir` if the directory cannot be read
    pub fn assert_registered(&self, registry: &MigrationRegistry) -> Result<(), MigrationError> {
        let coverage = self.coverage(registry)?;

        if coverage.is_complete() {
            return Ok(());
        }

        Err(MigrationError::UnregisteredMigrations {
            missing: coverage.missing,
            extra: coverage.extra,
        })
    }
}
