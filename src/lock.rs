//! File-based run lock
//!
//! The handler does not serialize runs itself. Callers wrap each top-level
//! run in a [`RunLock`]: acquire it before building the handler, keep the
//! guard alive for the whole run, and let it drop afterwards, whether the run
//! succeeded or not.

use crate::MigrationError;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Exclusive lock held through a `<name>.lock` file
///
/// The file is created with `create_new`, so only one process can hold a
/// lock of a given name in a given directory. The lock is released when the
/// guard is dropped.
#[derive(Debug)]
pub struct RunLock {
    name: String,
    path: PathBuf,
}

impl RunLock {
    /// Acquire the lock, polling until `timeout` elapses
    ///
    /// # Errors
    ///
    /// - `MigrationError::LockTimeout` if another holder kept the lock for the whole timeout
    /// - `MigrationError::Lock` if the lock file cannot be created for another reason
    pub fn acquire(
        dir: impl AsRef<Path>,
        name: &str,
        timeout: Duration,
    ) -> Result<Self, MigrationError> {
        let path = lock_path(dir.as_ref(), name);
        let start = Instant::now();

        loop {
            match try_create(&path) {
                Ok(()) => {
                    log::debug!("Acquired run lock {}", path.display());
                    return Ok(Self {
                        name: name.to_string(),
                        path,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if start.elapsed() >= timeout {
                        return Err(MigrationError::LockTimeout {
                            name: name.to_string(),
                            waited_ms: start.elapsed().as_millis(),
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL.min(timeout));
                }
                Err(source) => return Err(MigrationError::Lock { path, source }),
            }
        }
    }

    /// Check whether a lock of this name is currently held
    pub fn is_held(dir: impl AsRef<Path>, name: &str) -> bool {
        lock_path(dir.as_ref(), name).exists()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        // Errors can't be propagated from drop
        if let Err(e) = std::fs::remove_file(&self.path) {
            log::warn!("Failed to release run lock {}: {}", self.path.display(), e);
        } else {
            log::debug!("Released run lock {}", self.path.display());
        }
    }
}

fn lock_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.lock"))
}

fn try_create(path: &Path) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    writeln!(file, "{}", std::process::id())
}
