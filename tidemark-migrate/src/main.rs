//! Tidemark Migration CLI Tool
//!
//! Runs the project's migrations against a JSON execution store. Suitable for
//! both manual use and CI/CD pipelines: progress goes to stdout, errors to
//! stderr with a non-zero exit code.

use clap::Parser;
use std::io;
use std::process;
use tidemark::{JsonFileStore, MigrateConfig};
use tidemark_migrate::{load_registry, migrations, run, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // A missing .env file is fine
    dotenv::dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .init();

    let config = match MigrateConfig::load() {
        Ok(config) => cli.apply_overrides(config),
        Err(e) => {
            eprintln!("❌ Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    // Registry inconsistencies are configuration bugs, not runtime conditions
    let registry = if matches!(cli.command, Commands::Blank) {
        tidemark::MigrationRegistry::from_migrations(migrations())
    } else {
        load_registry(&config.dir, migrations())
    };
    let registry = match registry {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            process::exit(1);
        }
    };

    let store = JsonFileStore::new(&config.store_path);
    let mut stdout = io::stdout();

    match run(&cli.command, &config, registry, store, &mut stdout) {
        Ok(()) => {
            if !cli.quiet {
                println!("✅ Success");
            }
        }
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            process::exit(1);
        }
    }
}
