// backuptool/src/restore/db_restore.rs
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::process::Command;
use which::which;

use crate::errors::{AppError, Result};

/// Finds the psql executable in the system PATH.
fn find_psql_executable() -> Result<PathBuf> {
    Ok(which("psql").context(
        "psql executable not found in PATH. Please ensure PostgreSQL client tools are installed and in your PATH.",
    )?)
}

/// Feeds a plaintext SQL file to the target database using psql.
pub fn restore_database(target_db_url: &str, sql_file_path: &Path) -> Result<()> {
    if !sql_file_path.exists() {
        return Err(AppError::NotFound(format!(
            "SQL file for restoration not found: {}",
            sql_file_path.display()
        )));
    }

    let psql_path = find_psql_executable()?;
    println!(
        "Executing SQL file with psql: {}...",
        sql_file_path.display()
    );

    let output = Command::new(psql_path)
        .arg("-X") // Do not read psqlrc
        .arg("-q") // Quiet mode
        .arg("-v")
        .arg("ON_ERROR_STOP=1") // Exit on first error
        .arg("-d")
        .arg(target_db_url)
        .arg("-f")
        .arg(sql_file_path)
        .output()?;

    if !output.status.success() {
        return Err(AppError::Execution {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    println!(
        "✓ Successfully executed SQL file with psql: {}",
        sql_file_path.display()
    );
    Ok(())
}
