//! Tidemark Migration Library
//!
//! This library provides the `tidemark-migrate` command line surface so
//! projects can embed it with their own migrations and execution store.
//! The CLI tool (main.rs) uses this library.

pub mod cli;
pub mod migrations;
pub mod scaffold;

pub use cli::{load_registry, run, Cli, Commands};
pub use migrations::migrations;
