//! Command-line surface and command execution

use crate::scaffold;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tidemark::{
    migration_file_name, Direction, ExecutionPlan, ExecutionStore, HandledMigration,
    MigrateConfig, Migration, MigrationError, MigrationHandler, MigrationRegistry, MigrationsDir,
    NumOfRuns, RunLock, RunReport,
};

#[derive(Debug, Parser)]
#[command(name = "tidemark-migrate")]
#[command(about = "Versioned migration runner with a resumable execution history")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Migrations directory path (overrides config)
    #[arg(long)]
    pub migrations_dir: Option<PathBuf>,

    /// JSON execution store path (overrides config)
    #[arg(long)]
    pub store_path: Option<PathBuf>,

    /// Seconds to wait for the run lock (overrides config)
    #[arg(long)]
    pub lock_timeout: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Execute up() for the next registered and not yet executed migrations
    Up {
        /// Number of migrations to run, or "all"
        #[arg(long, default_value = "1", allow_negative_numbers = true)]
        steps: NumOfRuns,
    },

    /// Execute down() for the last executed migrations, newest first
    Down {
        /// Number of migrations to roll back, or "all"
        #[arg(long, default_value = "1", allow_negative_numbers = true)]
        steps: NumOfRuns,
    },

    /// Execute up() for the given version, ignoring execution order
    #[command(name = "force:up")]
    ForceUp {
        /// Migration version
        #[arg(long)]
        version: u64,
    },

    /// Execute down() for the given version, ignoring execution order
    #[command(name = "force:down")]
    ForceDown {
        /// Migration version
        #[arg(long)]
        version: u64,
    },

    /// Display statistics about registered migrations and executions
    Stats,

    /// Generate a new, blank migration file in the migrations directory
    Blank,
}

impl Commands {
    /// Whether the command runs migrations and must hold the run lock
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Commands::Up { .. }
                | Commands::Down { .. }
                | Commands::ForceUp { .. }
                | Commands::ForceDown { .. }
        )
    }
}

impl Cli {
    /// Apply command-line overrides on top of the loaded config
    pub fn apply_overrides(&self, mut config: MigrateConfig) -> MigrateConfig {
        if let Some(dir) = &self.migrations_dir {
            config.dir = dir.clone();
        }
        if let Some(store_path) = &self.store_path {
            config.store_path = store_path.clone();
        }
        if let Some(seconds) = self.lock_timeout {
            config.lock_timeout_seconds = seconds;
        }
        config
    }

    /// Default log filter for the verbosity flags
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

/// Build the registry and cross-check it with the migrations directory
///
/// The directory check is skipped when `dir` does not exist, so projects
/// that keep their migrations elsewhere can still run.
///
/// # Errors
///
/// - `MigrationError::AlreadyRegistered` for duplicate versions
/// - `MigrationError::UnregisteredMigrations` if the directory and the list disagree
pub fn load_registry(
    dir: &Path,
    migrations: Vec<Box<dyn Migration>>,
) -> Result<MigrationRegistry, MigrationError> {
    let registry = MigrationRegistry::from_migrations(migrations)?;

    if dir.exists() {
        MigrationsDir::new(dir)?.assert_registered(&registry)?;
    } else {
        log::debug!(
            "Migrations directory {} not found, skipping file check",
            dir.display()
        );
    }

    Ok(registry)
}

/// Execute `command`, writing human-readable progress to `out`
///
/// Commands that run migrations hold a [`RunLock`] named after
/// `config.lock_name` for their whole duration.
///
/// # Errors
///
/// Returns the first migration, store or lock error, or an I/O error when
/// writing to `out` fails.
pub fn run<S: ExecutionStore>(
    command: &Commands,
    config: &MigrateConfig,
    registry: MigrationRegistry,
    store: S,
    out: &mut dyn Write,
) -> Result<()> {
    let _lock = if command.is_mutating() {
        Some(RunLock::acquire(
            &config.lock_dir,
            &config.lock_name,
            config.lock_timeout(),
        )?)
    } else {
        None
    };

    match command {
        Commands::Stats => {
            let plan = ExecutionPlan::new(&registry, &store)?;
            print_stats(&plan, out)
        }
        Commands::Blank => {
            let path = scaffold::generate_blank(&config.dir)?;
            writeln!(out, "✅ New blank migration file generated: {}", path.display())?;
            writeln!(out, "   Register it in the migrations list and implement up() and down()")?;
            Ok(())
        }
        Commands::Up { steps } => {
            execute(registry, store, out, Direction::Up, print_batch, |h| {
                h.migrate_up(*steps)
            })
        }
        Commands::Down { steps } => {
            execute(registry, store, out, Direction::Down, print_batch, |h| {
                h.migrate_down(*steps)
            })
        }
        Commands::ForceUp { version } => {
            execute(registry, store, out, Direction::Up, print_forced, |h| {
                h.force_up(*version)
            })
        }
        Commands::ForceDown { version } => {
            execute(registry, store, out, Direction::Down, print_forced, |h| {
                h.force_down(*version)
            })
        }
    }
}

type Printer = fn(&RunReport, Direction, &mut dyn Write) -> Result<()>;

/// Build the handler, run one request, print its report
fn execute<S, F>(
    registry: MigrationRegistry,
    store: S,
    out: &mut dyn Write,
    direction: Direction,
    print: Printer,
    request: F,
) -> Result<()>
where
    S: ExecutionStore,
    F: FnOnce(&MigrationHandler<S>) -> RunReport,
{
    let handler = MigrationHandler::new(registry, store)?;
    let report = request(&handler);
    print(&report, direction, out)?;
    report.into_result()?;
    Ok(())
}

// A failed up() still leaves a saved, unfinished execution behind
fn succeeded(handled: &HandledMigration, direction: Direction) -> bool {
    match direction {
        Direction::Up => handled.execution.is_some_and(|e| e.finished()),
        Direction::Down => handled.execution.is_some(),
    }
}

fn print_batch(report: &RunReport, direction: Direction, out: &mut dyn Write) -> Result<()> {
    let done = report
        .handled
        .iter()
        .filter(|h| succeeded(h, direction))
        .count();

    writeln!(out, "Executed {direction} for {done} migration(s)")?;
    for handled in &report.handled {
        let file_name = migration_file_name(handled.version);
        if succeeded(handled, direction) {
            writeln!(out, "  ✓ {file_name}")?;
        } else {
            writeln!(out, "  ✗ {file_name} (failed)")?;
        }
    }
    Ok(())
}

fn print_forced(report: &RunReport, direction: Direction, out: &mut dyn Write) -> Result<()> {
    match report.handled.first() {
        Some(handled) if succeeded(handled, direction) => writeln!(
            out,
            "Executed {direction} forcefully for migration {}",
            handled.version
        )?,
        _ => writeln!(out, "No migration executed")?,
    }
    Ok(())
}

fn print_stats(plan: &ExecutionPlan<'_>, out: &mut dyn Write) -> Result<()> {
    let next_file = plan
        .next_to_execute()
        .map(|m| migration_file_name(m.version()))
        .unwrap_or_else(|| "-".to_string());
    let last_file = plan
        .last_executed()
        .map(|e| migration_file_name(e.migration.version()))
        .unwrap_or_else(|| "-".to_string());

    writeln!(out, "\n📊 Migration Stats\n")?;
    writeln!(
        out,
        "Registered migrations count: {}",
        plan.registered_migrations_count()
    )?;
    writeln!(
        out,
        "Finished executions count: {}",
        plan.finished_executions_count()
    )?;
    writeln!(out, "Next migration file: {next_file}")?;
    writeln!(out, "Last migration file: {last_file}")?;

    if let Some(unfinished) = plan.unfinished_execution() {
        writeln!(
            out,
            "⚠️  {} has an unfinished execution and will be re-run by the next up",
            migration_file_name(unfinished.version)
        )?;
    }
    Ok(())
}
