//! Migration handler - runs migrations and records their executions

use crate::migration::{Direction, Migration};
use crate::plan::ExecutionPlan;
use crate::record::MigrationExecution;
use crate::registry::MigrationRegistry;
use crate::steps::NumOfRuns;
use crate::store::ExecutionStore;
use crate::MigrationError;

/// A migration the handler ran (or tried to run) during a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandledMigration {
    /// Version of the migration
    pub version: u64,

    /// The execution record as it was last persisted or removed
    ///
    /// For forward runs this is the saved record, unfinished if `up()`
    /// failed. For backward runs it is the removed record, or `None` if the
    /// rollback failed and the record was kept.
    pub execution: Option<MigrationExecution>,
}

/// Outcome of a handler request
///
/// Runs stop at the first failure, so a report can hold both the migrations
/// handled before the failure and the error itself.
#[derive(Debug, Default)]
pub struct RunReport {
    pub handled: Vec<HandledMigration>,
    pub error: Option<MigrationError>,
}

impl RunReport {
    fn failed(error: MigrationError) -> Self {
        Self {
            handled: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Versions handled, in execution order
    pub fn versions(&self) -> Vec<u64> {
        self.handled.iter().map(|h| h.version).collect()
    }

    /// Discard the partial progress on failure
    pub fn into_result(self) -> Result<Vec<HandledMigration>, MigrationError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.handled),
        }
    }
}

/// Runs migrations forward and backward, one durable write per migration
///
/// Each request builds a fresh [`ExecutionPlan`], so changes made to the
/// store between requests are picked up. Within one request the work list is
/// fixed when the request starts.
///
/// The handler does not serialize concurrent runs against the same store;
/// callers hold a run lock (see [`RunLock`](crate::RunLock)) around it.
pub struct MigrationHandler<S: ExecutionStore> {
    registry: MigrationRegistry,
    store: S,
}

impl<S: ExecutionStore> MigrationHandler<S> {
    /// Create a handler, initializing the store
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Store` (wrapped) if `store.init()` fails.
    pub fn new(registry: MigrationRegistry, store: S) -> Result<Self, MigrationError> {
        store
            .init()
            .map_err(|source| {
                MigrationError::Store {
                    operation: "initialize the store",
                    source,
                }
                .during("create migrations handler")
            })?;

        Ok(Self { registry, store })
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_parts(self) -> (MigrationRegistry, S) {
        (self.registry, self.store)
    }

    /// Build a fresh plan from the current store contents
    ///
    /// # Errors
    ///
    /// See [`ExecutionPlan::new`].
    pub fn plan(&self) -> Result<ExecutionPlan<'_>, MigrationError> {
        ExecutionPlan::new(&self.registry, &self.store)
    }

    /// Run `up()` for up to `num_of_runs` pending migrations, ascending
    ///
    /// Every attempt is saved, finished only if `up()` succeeded. Stops at the
    /// first `up()` or save failure; the failed migration is the last entry of
    /// the report.
    pub fn migrate_up(&self, num_of_runs: NumOfRuns) -> RunReport {
        const OPERATION: &str = "migrate up";

        if self.registry.is_empty() {
            return RunReport::default();
        }

        let plan = match self.plan() {
            Ok(plan) => plan,
            Err(e) => return RunReport::failed(e.during(OPERATION)),
        };

        let pending = plan.all_to_be_executed();
        let runs = pending.len().min(num_of_runs.get());
        let mut report = RunReport::default();

        for &migration in &pending[..runs] {
            let (execution, error) = self.execute_up(migration);
            report.handled.push(HandledMigration {
                version: migration.version(),
                execution: Some(execution),
            });

            if let Some(error) = error {
                report.error = Some(error.during(OPERATION));
                break;
            }
        }

        report
    }

    /// Run `down()` for up to `num_of_runs` finished migrations, newest first
    ///
    /// A record is removed only after its `down()` succeeded. Stops at the
    /// first `down()` or remove failure; the failed migration is the last
    /// entry of the report, with no execution.
    pub fn migrate_down(&self, num_of_runs: NumOfRuns) -> RunReport {
        const OPERATION: &str = "migrate down";

        let plan = match self.plan() {
            Ok(plan) => plan,
            Err(e) => return RunReport::failed(e.during(OPERATION)),
        };

        let mut executed = plan.all_executed();
        executed.reverse();
        let runs = executed.len().min(num_of_runs.get());
        let mut report = RunReport::default();

        for executed_migration in &executed[..runs] {
            let migration = executed_migration.migration;
            let execution = *executed_migration.execution;

            match self.execute_down(migration, &execution) {
                Ok(()) => report.handled.push(HandledMigration {
                    version: migration.version(),
                    execution: Some(execution),
                }),
                Err(error) => {
                    report.handled.push(HandledMigration {
                        version: migration.version(),
                        execution: None,
                    });
                    report.error = Some(error.during(OPERATION));
                    break;
                }
            }
        }

        report
    }

    /// Run `up()` for `version`, ignoring the plan
    ///
    /// No-op if `version` is not registered. The execution is saved whether
    /// or not `up()` succeeded.
    pub fn force_up(&self, version: u64) -> RunReport {
        let Some(migration) = self.registry.get(version) else {
            log::warn!("Migration {version} is not registered, nothing to force up");
            return RunReport::default();
        };

        let (execution, error) = self.execute_up(migration);

        RunReport {
            handled: vec![HandledMigration {
                version,
                execution: Some(execution),
            }],
            error: error.map(|e| e.during("force up")),
        }
    }

    /// Run `down()` for `version`, ignoring the plan
    ///
    /// No-op if `version` is not registered. Fails without calling `down()` if
    /// the migration has no execution record.
    pub fn force_down(&self, version: u64) -> RunReport {
        const OPERATION: &str = "force down";

        let Some(migration) = self.registry.get(version) else {
            log::warn!("Migration {version} is not registered, nothing to force down");
            return RunReport::default();
        };

        let not_removed = |error: MigrationError| RunReport {
            handled: vec![HandledMigration {
                version,
                execution: None,
            }],
            error: Some(error.during(OPERATION)),
        };

        let execution = match self.store.find_one(version) {
            Ok(Some(execution)) => execution,
            Ok(None) => return not_removed(MigrationError::NeverExecuted { version }),
            Err(source) => {
                return not_removed(MigrationError::Store {
                    operation: "load execution",
                    source,
                })
            }
        };

        match self.execute_down(migration, &execution) {
            Ok(()) => RunReport {
                handled: vec![HandledMigration {
                    version,
                    execution: Some(execution),
                }],
                error: None,
            },
            Err(error) => not_removed(error),
        }
    }

    /// Start, run and save one forward execution
    ///
    /// Returns the execution as saved, plus the `up()` and save errors joined.
    fn execute_up(
        &self,
        migration: &dyn Migration,
    ) -> (MigrationExecution, Option<MigrationError>) {
        let version = migration.version();
        let mut execution = MigrationExecution::start(migration);
        let mut errors = Vec::new();

        log::info!("Executing up() for migration {version}");
        match migration.up() {
            Ok(()) => execution.finish(),
            Err(source) => {
                log::warn!("Migration {version} up() failed: {source}");
                errors.push(MigrationError::ActionFailed {
                    version,
                    direction: Direction::Up,
                    source,
                });
            }
        }

        if let Err(source) = self.store.save(&execution) {
            log::warn!("Failed to save execution of migration {version}: {source}");
            errors.push(MigrationError::Store {
                operation: "save execution",
                source,
            });
        }

        (execution, MigrationError::join(errors))
    }

    /// Run `down()` and, only if it succeeded, remove the execution
    fn execute_down(
        &self,
        migration: &dyn Migration,
        execution: &MigrationExecution,
    ) -> Result<(), MigrationError> {
        let version = migration.version();

        log::info!("Executing down() for migration {version}");
        migration.down().map_err(|source| {
            log::warn!("Migration {version} down() failed: {source}");
            MigrationError::ActionFailed {
                version,
                direction: Direction::Down,
                source,
            }
        })?;

        self.store
            .remove(execution)
            .map_err(|source| MigrationError::Store {
                operation: "remove execution",
                source,
            })
    }
}

impl<S: ExecutionStore> std::fmt::Debug for MigrationHandler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationHandler")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
