//! Execution plan: registered migrations reconciled against execution history
//!
//! The history must always be a gapless, order-preserving prefix of the
//! registered migrations, with at most one unfinished execution at its tail.
//! [`ExecutionPlan::new`] refuses to build a plan from any other state, so
//! every query on a plan can index migrations and executions side by side.

use crate::migration::Migration;
use crate::record::MigrationExecution;
use crate::registry::MigrationRegistry;
use crate::store::ExecutionStore;
use crate::MigrationError;

/// A registered migration paired with its finished execution
#[derive(Debug, Clone, Copy)]
pub struct ExecutedMigration<'a> {
    pub migration: &'a dyn Migration,
    pub execution: &'a MigrationExecution,
}

/// Consistent, ordered view of migrations and their executions
///
/// Built from a snapshot; later changes to the store are not reflected.
#[derive(Debug)]
pub struct ExecutionPlan<'r> {
    ordered_migrations: Vec<&'r dyn Migration>,
    ordered_executions: Vec<MigrationExecution>,
}

impl<'r> ExecutionPlan<'r> {
    /// Load executions from `store` and validate them against `registry`
    ///
    /// # Errors
    ///
    /// - `MigrationError::Store` if executions cannot be loaded
    /// - `MigrationError::TooManyExecutions` if there are more executions than migrations
    /// - `MigrationError::UnfinishedNotLast` if an unfinished execution is not the newest one
    /// - `MigrationError::OutOfOrder` if executions are not a gapless prefix of the migrations
    pub fn new(
        registry: &'r MigrationRegistry,
        store: &dyn ExecutionStore,
    ) -> Result<Self, MigrationError> {
        let mut executions = store
            .load_executions()
            .map_err(|source| MigrationError::Store {
                operation: "load executions",
                source,
            })?;
        executions.sort_by_key(|e| e.version);

        Self::from_parts(registry.ordered_migrations(), executions)
    }

    fn from_parts(
        ordered_migrations: Vec<&'r dyn Migration>,
        ordered_executions: Vec<MigrationExecution>,
    ) -> Result<Self, MigrationError> {
        if ordered_executions.len() > ordered_migrations.len() {
            return Err(MigrationError::TooManyExecutions {
                executions: ordered_executions.len(),
                migrations: ordered_migrations.len(),
            });
        }

        let last_index = ordered_executions.len().saturating_sub(1);
        for (index, (execution, migration)) in ordered_executions
            .iter()
            .zip(&ordered_migrations)
            .enumerate()
        {
            if !execution.finished() && index != last_index {
                return Err(MigrationError::UnfinishedNotLast {
                    version: execution.version,
                    index,
                });
            }

            if execution.version != migration.version() {
                return Err(MigrationError::OutOfOrder {
                    index,
                    execution: execution.version,
                    registered: migration.version(),
                });
            }
        }

        let plan = Self {
            ordered_migrations,
            ordered_executions,
        };

        if let Some(unfinished) = plan.unfinished_execution() {
            log::warn!(
                "Migration {} was started at {}ms but never finished; it will be executed again",
                unfinished.version,
                unfinished.executed_at_ms
            );
        }
        log::debug!(
            "Execution plan: {} registered, {} finished, {} to be executed",
            plan.registered_migrations_count(),
            plan.finished_executions_count(),
            plan.all_to_be_executed().len()
        );

        Ok(plan)
    }

    pub fn registered_migrations_count(&self) -> usize {
        self.ordered_migrations.len()
    }

    /// Number of finished executions (an unfinished tail is not counted)
    pub fn finished_executions_count(&self) -> usize {
        match self.ordered_executions.last() {
            Some(last) if !last.finished() => self.ordered_executions.len() - 1,
            _ => self.ordered_executions.len(),
        }
    }

    /// The execution that was started but never finished, if any
    pub fn unfinished_execution(&self) -> Option<&MigrationExecution> {
        self.ordered_executions.last().filter(|e| !e.finished())
    }

    /// Every migration not yet finished, ascending
    ///
    /// Includes the migration of an unfinished execution: it is re-run from
    /// scratch, not skipped.
    pub fn all_to_be_executed(&self) -> &[&'r dyn Migration] {
        &self.ordered_migrations[self.finished_executions_count()..]
    }

    /// Every finished migration with its execution, ascending
    pub fn all_executed(&self) -> Vec<ExecutedMigration<'_>> {
        self.ordered_migrations
            .iter()
            .zip(&self.ordered_executions)
            .take(self.finished_executions_count())
            .map(|(migration, execution)| ExecutedMigration {
                migration: *migration,
                execution,
            })
            .collect()
    }

    /// The next migration a forward run would execute
    pub fn next_to_execute(&self) -> Option<&'r dyn Migration> {
        self.all_to_be_executed().first().copied()
    }

    /// The most recent finished migration, which a backward run would revert first
    pub fn last_executed(&self) -> Option<ExecutedMigration<'_>> {
        self.all_executed().pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::NoopMigration;
    use crate::store::{InMemoryStore, StoreOp};

    fn registry(versions: &[u64]) -> MigrationRegistry {
        MigrationRegistry::from_migrations(
            versions
                .iter()
                .map(|&v| Box::new(NoopMigration::new(v)) as Box<dyn Migration>),
        )
        .unwrap()
    }

    fn finished(version: u64) -> MigrationExecution {
        MigrationExecution::new(version, version * 10, version * 10 + 1)
    }

    fn unfinished(version: u64) -> MigrationExecution {
        MigrationExecution::new(version, version * 10, 0)
    }

    fn versions(migrations: &[&dyn Migration]) -> Vec<u64> {
        migrations.iter().map(|m| m.version()).collect()
    }

    #[test]
    fn test_plan_with_partial_history() {
        let registry = registry(&[1, 2, 3, 4]);
        // Stored out of order on purpose
        let store = InMemoryStore::with_executions(vec![finished(2), finished(1)]);

        let plan = ExecutionPlan::new(&registry, &store).unwrap();

        assert_eq!(plan.registered_migrations_count(), 4);
        assert_eq!(plan.finished_executions_count(), 2);
        assert_eq!(versions(plan.all_to_be_executed()), vec![3, 4]);
        assert_eq!(plan.next_to_execute().map(|m| m.version()), Some(3));

        let executed = plan.all_executed();
        assert_eq!(executed.len(), 2);
        assert_eq!(executed[0].migration.version(), 1);
        assert_eq!(*executed[0].execution, finished(1));
        assert_eq!(plan.last_executed().map(|e| e.migration.version()), Some(2));
        assert!(plan.unfinished_execution().is_none());
    }

    #[test]
    fn test_plan_with_unfinished_tail_reruns_it() {
        let registry = registry(&[1, 2, 3]);
        let store = InMemoryStore::with_executions(vec![finished(1), unfinished(2)]);

        let plan = ExecutionPlan::new(&registry, &store).unwrap();

        assert_eq!(plan.finished_executions_count(), 1);
        assert_eq!(versions(plan.all_to_be_executed()), vec![2, 3]);
        assert_eq!(plan.next_to_execute().map(|m| m.version()), Some(2));
        assert_eq!(plan.all_executed().len(), 1);
        assert_eq!(plan.last_executed().map(|e| e.migration.version()), Some(1));
        assert_eq!(plan.unfinished_execution(), Some(&unfinished(2)));
    }

    #[test]
    fn test_plan_all_executed() {
        let registry = registry(&[1, 2]);
        let store = InMemoryStore::with_executions(vec![finished(1), finished(2)]);

        let plan = ExecutionPlan::new(&registry, &store).unwrap();

        assert!(plan.all_to_be_executed().is_empty());
        assert!(plan.next_to_execute().is_none());
        assert_eq!(plan.finished_executions_count(), 2);
        assert_eq!(plan.last_executed().map(|e| e.migration.version()), Some(2));
    }

    #[test]
    fn test_plan_with_empty_registry_and_history() {
        let registry = MigrationRegistry::new();
        let store = InMemoryStore::new();

        let plan = ExecutionPlan::new(&registry, &store).unwrap();

        assert_eq!(plan.registered_migrations_count(), 0);
        assert_eq!(plan.finished_executions_count(), 0);
        assert!(plan.all_to_be_executed().is_empty());
        assert!(plan.all_executed().is_empty());
        assert!(plan.next_to_execute().is_none());
        assert!(plan.last_executed().is_none());
    }

    #[test]
    fn test_only_unfinished_execution() {
        let registry = registry(&[1, 2]);
        let store = InMemoryStore::with_executions(vec![unfinished(1)]);

        let plan = ExecutionPlan::new(&registry, &store).unwrap();

        assert_eq!(plan.finished_executions_count(), 0);
        assert!(plan.all_executed().is_empty());
        assert!(plan.last_executed().is_none());
        assert_eq!(plan.next_to_execute().map(|m| m.version()), Some(1));
    }

    #[test]
    fn test_more_executions_than_migrations() {
        let registry = registry(&[1]);
        let store = InMemoryStore::with_executions(vec![finished(1), finished(2)]);

        let error = ExecutionPlan::new(&registry, &store).unwrap_err();

        assert!(matches!(
            error,
            MigrationError::TooManyExecutions {
                executions: 2,
                migrations: 1
            }
        ));
        assert!(error.to_string().contains("more executions"));
    }

    #[test]
    fn test_unfinished_execution_not_last() {
        let registry = registry(&[1, 2, 3]);
        let store = InMemoryStore::with_executions(vec![unfinished(1), finished(2)]);

        let error = ExecutionPlan::new(&registry, &store).unwrap_err();

        assert!(matches!(
            error,
            MigrationError::UnfinishedNotLast { version: 1, index: 0 }
        ));
    }

    #[test]
    fn test_two_unfinished_executions() {
        let registry = registry(&[1, 2, 3]);
        let store = InMemoryStore::with_executions(vec![unfinished(1), unfinished(2)]);

        let error = ExecutionPlan::new(&registry, &store).unwrap_err();

        assert!(matches!(error, MigrationError::UnfinishedNotLast { .. }));
    }

    #[test]
    fn test_gap_in_history_is_out_of_order() {
        let registry = registry(&[1, 2, 3]);
        let store = InMemoryStore::with_executions(vec![finished(1), finished(3)]);

        let error = ExecutionPlan::new(&registry, &store).unwrap_err();

        assert!(matches!(
            error,
            MigrationError::OutOfOrder {
                index: 1,
                execution: 3,
                registered: 2
            }
        ));
        assert!(error.to_string().contains("out of order"));
    }

    #[test]
    fn test_unregistered_execution_is_out_of_order() {
        let registry = registry(&[10, 20, 30]);
        let store = InMemoryStore::with_executions(vec![finished(10), finished(15)]);

        let error = ExecutionPlan::new(&registry, &store).unwrap_err();

        assert!(matches!(error, MigrationError::OutOfOrder { index: 1, .. }));
    }

    #[test]
    fn test_history_not_starting_at_first_migration() {
        let registry = registry(&[1, 2, 3]);
        let store = InMemoryStore::with_executions(vec![finished(2)]);

        let error = ExecutionPlan::new(&registry, &store).unwrap_err();

        assert!(matches!(
            error,
            MigrationError::OutOfOrder {
                index: 0,
                execution: 2,
                registered: 1
            }
        ));
    }

    #[test]
    fn test_load_failure_is_wrapped() {
        let registry = registry(&[1]);
        let store = InMemoryStore::new();
        store.fail(StoreOp::Load, "connection refused");

        let error = ExecutionPlan::new(&registry, &store).unwrap_err();

        assert!(matches!(
            error,
            MigrationError::Store {
                operation: "load executions",
                ..
            }
        ));
        assert!(error.to_string().contains("connection refused"));
    }

    /// Exhaustive check of the prefix rule over a small registry: a history
    /// is accepted iff, sorted by version, it is a gapless prefix of the
    /// registered versions with at most its last element unfinished.
    #[test]
    fn test_prefix_invariant_exhaustive() {
        let registered = [1u64, 2, 3, 4];
        let registry = registry(&registered);

        // Each of the 5 candidate versions (4 registered + 1 stray) is absent,
        // finished or unfinished.
        let candidates = [1u64, 2, 3, 4, 9];
        for code in 0..3u32.pow(candidates.len() as u32) {
            let mut history = Vec::new();
            let mut rest = code;
            for &version in &candidates {
                match rest % 3 {
                    1 => history.push(finished(version)),
                    2 => history.push(unfinished(version)),
                    _ => {}
                }
                rest /= 3;
            }

            let is_prefix = history
                .iter()
                .zip(registered.iter())
                .all(|(e, v)| e.version == *v)
                && history.len() <= registered.len();
            let unfinished_ok = history
                .iter()
                .rev()
                .skip(1)
                .all(MigrationExecution::finished);
            let expected_ok = is_prefix && unfinished_ok;

            let store = InMemoryStore::with_executions(history.clone());
            let result = ExecutionPlan::new(&registry, &store);

            assert_eq!(
                result.is_ok(),
                expected_ok,
                "history {history:?} expected ok={expected_ok}, got {result:?}"
            );
        }
    }
}
