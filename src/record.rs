//! `MigrationExecution` - Durable evidence that a migration's `up()` was attempted

use crate::migration::Migration;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A migration execution record
///
/// One record per migration version. `finished_at_ms == 0` means the
/// migration's `up()` was started but never completed; at most one such
/// record may exist, and only for the newest executed version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationExecution {
    /// Version of the executed migration (primary key)
    pub version: u64,

    /// When `up()` was started, epoch milliseconds
    pub executed_at_ms: u64,

    /// When `up()` completed, epoch milliseconds (0 = unfinished)
    pub finished_at_ms: u64,
}

impl MigrationExecution {
    #[must_use]
    pub fn new(version: u64, executed_at_ms: u64, finished_at_ms: u64) -> Self {
        Self {
            version,
            executed_at_ms,
            finished_at_ms,
        }
    }

    /// Start a new, unfinished execution of `migration`
    #[must_use]
    pub fn start(migration: &dyn Migration) -> Self {
        Self::new(migration.version(), now_ms(), 0)
    }

    /// Mark the execution as finished. No-op if it already is.
    pub fn finish(&mut self) {
        if !self.finished() {
            // 0 is reserved for "unfinished"
            self.finished_at_ms = now_ms().max(1);
        }
    }

    #[must_use]
    pub fn finished(&self) -> bool {
        self.finished_at_ms > 0
    }
}

fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::NoopMigration;

    #[test]
    fn test_start_execution_is_unfinished() {
        let execution = MigrationExecution::start(&NoopMigration::new(1_712_953_077));

        assert_eq!(execution.version, 1_712_953_077);
        assert!(execution.executed_at_ms > 0);
        assert_eq!(execution.finished_at_ms, 0);
        assert!(!execution.finished());
    }

    #[test]
    fn test_finish_execution() {
        let mut execution = MigrationExecution::start(&NoopMigration::new(3));
        execution.finish();

        assert!(execution.finished());
        assert!(execution.finished_at_ms >= execution.executed_at_ms);
    }

    #[test]
    fn test_finish_keeps_first_finish_time() {
        let mut execution = MigrationExecution::new(3, 100, 200);
        execution.finish();

        assert_eq!(execution.finished_at_ms, 200);
    }

    #[test]
    fn test_serialized_shape() {
        let execution = MigrationExecution::new(7, 1_000, 2_000);
        let json = serde_json::to_value(execution).expect("Should serialize");

        assert_eq!(
            json,
            serde_json::json!({
                "version": 7,
                "executed_at_ms": 1_000,
                "finished_at_ms": 2_000,
            })
        );
    }
}
