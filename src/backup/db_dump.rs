// backuptool/src/backup/db_dump.rs
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::process::Command;
use which::which;

use crate::errors::{AppError, Result};

// Helper function to find pg_dump executable
fn find_pg_dump_executable() -> Result<PathBuf> {
    Ok(which("pg_dump").context(
        "pg_dump executable not found in PATH. Please ensure PostgreSQL client tools are installed and in your PATH.",
    )?)
}

/// Dumps the configured database to a plain-text SQL file using pg_dump.
///
/// The dump executable writes directly to `dump_path`; stdin/stdout are not
/// used. Any non-zero exit is surfaced with the process's error text.
pub fn dump_database(database_url: &str, dump_path: &Path) -> Result<()> {
    let pg_dump_path = find_pg_dump_executable()?;
    println!(
        "Dumping database to {} using pg_dump...",
        dump_path.display()
    );

    let output = Command::new(&pg_dump_path)
        .arg("--format=plain")
        .arg("--no-owner")
        .arg("--no-privileges")
        .arg("-f")
        .arg(dump_path)
        .arg(database_url)
        .output()?;

    if !output.status.success() {
        return Err(AppError::Execution {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    println!("✓ Database dumped successfully via pg_dump.");
    Ok(())
}
