//! Blank migration file generation

use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tidemark::{migration_file_name, MigrationError, MigrationsDir};

/// Create `version_<unix seconds>.rs` in `dir` from the blank template
///
/// # Errors
///
/// - `MigrationError::InvalidMigrationsDir` if `dir` does not exist
/// - `MigrationError::Scaffold` if the file already exists or cannot be written
pub fn generate_blank(dir: &Path) -> Result<PathBuf, MigrationError> {
    generate_blank_at(dir, Utc::now())
}

/// Same as [`generate_blank`], versioned by `now`
pub fn generate_blank_at(dir: &Path, now: DateTime<Utc>) -> Result<PathBuf, MigrationError> {
    let dir = MigrationsDir::new(dir)?;
    let version = u64::try_from(now.timestamp()).unwrap_or_default();
    let path = dir.path().join(migration_file_name(version));

    let scaffold_error = |source| MigrationError::Scaffold {
        path: path.clone(),
        source,
    };

    // create_new: two blanks in the same second must not clobber each other
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(scaffold_error)?;
    file.write_all(render(version, now).as_bytes())
        .map_err(scaffold_error)?;

    log::debug!("Generated blank migration {}", path.display());
    Ok(path)
}

fn render(version: u64, now: DateTime<Utc>) -> String {
    let generated = now.format("%Y-%m-%d %H:%M:%S UTC");
    format!(
        r#"//! Migration {file_name}
//! Generated: {generated}

use tidemark::{{ActionError, Migration}};

pub struct Migration{version};

impl Migration for Migration{version} {{
    fn version(&self) -> u64 {{
        {version}
    }}

    fn up(&self) -> Result<(), ActionError> {{
        Ok(())
    }}

    fn down(&self) -> Result<(), ActionError> {{
        Ok(())
    }}
}}
"#,
        file_name = migration_file_name(version),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_render_substitutes_version() {
        let now = Utc.timestamp_opt(1_712_953_077, 0).unwrap();

        let content = render(1_712_953_077, now);

        assert!(content.starts_with("//! Migration version_1712953077.rs\n"));
        assert!(content.contains("//! Generated: 2024-04-12 20:17:57 UTC"));
        assert!(content.contains("pub struct Migration1712953077;"));
        assert!(content.contains("        1712953077\n"));
        assert!(!content.contains("{version}"));
    }
}
