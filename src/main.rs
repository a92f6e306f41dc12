//! Database Backup/Restore Tool
//!
//! Provides CLI interface for scheduled backups, verified restores and
//! retention maintenance across local and S3 storage.

// backuptool/src/main.rs
mod archive;
mod audit;
mod backup;
mod config;
mod errors;
mod orchestrator;
mod restore;
mod retention;
mod storage;
mod utils;

use anyhow::{Context, Result};
use config::AppConfig;
use orchestrator::BackupOrchestrator;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use storage::{BackupLevel, StorageKind};
use uuid::Uuid;

/// Main entry point for the backup/restore tool
#[tokio::main]
async fn main() -> ExitCode {
    match run_app().await {
        Ok(_) => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    // Expects config.json in the working directory, next to the executable
    // or the project root when running with `cargo run`.
    let config_path = PathBuf::from("config.json");
    let app_config = AppConfig::load_from_json(&config_path).context(format!(
        "Failed to load application configuration from {}",
        config_path.display()
    ))?;
    let orchestrator = BackupOrchestrator::from_config(app_config)
        .context("Failed to initialize storage backends")?;

    let args: Vec<String> = env::args().skip(1).collect();
    let choice = if let Some(first) = args.first() {
        first.trim().to_string()
    } else {
        prompt_choice()?
    };

    match choice.as_str() {
        "1" | "backup" => {
            if args.get(1).map(|s| s.trim()) == Some("auto") {
                // Cron entry point: run whichever levels are due today.
                let results = orchestrator.execute_due().await;
                if results.is_empty() {
                    println!("No backup level is due today.");
                }
                for result in results {
                    if !result.success {
                        anyhow::bail!(
                            "Backup failed: {}",
                            result.error.unwrap_or_else(|| "unknown error".to_string())
                        );
                    }
                }
            } else {
                let level = match args.get(1) {
                    Some(raw) => parse_level(raw)?,
                    None => BackupLevel::Daily,
                };
                let result = orchestrator.execute(level).await;
                if !result.success {
                    anyhow::bail!(
                        "Backup failed: {}",
                        result.error.unwrap_or_else(|| "unknown error".to_string())
                    );
                }
            }
        }
        "2" | "restore" => {
            println!("🔄 Starting Restore Process...");
            let (id, kind) = parse_id_and_storage(&args)?;
            let result = orchestrator.restore_backup(id, kind).await;
            match result.restored_at {
                Some(at) if result.success => {
                    println!("✅ Database restored from backup {} at {}", id, at);
                }
                _ => anyhow::bail!(
                    "Restore failed: {}",
                    result.error.unwrap_or_else(|| "unknown error".to_string())
                ),
            }
        }
        "3" | "test-restore" => {
            println!("🧪 Starting Test Restore (dry run)...");
            let (id, kind) = parse_id_and_storage(&args)?;
            let result = orchestrator.test_restore(id, kind).await;
            if !result.success {
                anyhow::bail!(
                    "Test restore failed: {}",
                    result.error.unwrap_or_else(|| "unknown error".to_string())
                );
            }
            println!("✅ Backup {} verified in {:.2?}", id, result.duration);
        }
        "4" | "list" => {
            let filter = match args.get(1) {
                Some(raw) => Some(parse_storage(raw)?),
                None => None,
            };
            let backups = orchestrator
                .list_backups(filter)
                .await
                .context("Failed to list backups")?;
            if backups.is_empty() {
                println!("No backups found.");
            }
            for entry in backups {
                println!(
                    "{}  {}  {}  {}  {} bytes  expires {}",
                    entry.id,
                    entry.storage.as_str(),
                    entry.level.as_str(),
                    entry.filename,
                    entry.size,
                    entry.expires_at.format("%Y-%m-%d")
                );
            }
        }
        "5" | "delete" => {
            let (id, kind) = parse_id_and_storage(&args)?;
            let result = orchestrator.delete_backup(id, kind).await;
            if !result.success {
                anyhow::bail!(
                    "Delete failed: {}",
                    result.error.unwrap_or_else(|| "unknown error".to_string())
                );
            }
            if result.deleted {
                println!("🗑 Deleted backup {} from {} storage", id, kind.as_str());
            } else {
                println!("Backup {} not found in {} storage", id, kind.as_str());
            }
        }
        "6" | "retention" => {
            println!("🧹 Applying retention policy...");
            let outcome = orchestrator.apply_retention_policy().await;
            println!(
                "Removed {} expired backup(s), {} error(s)",
                outcome.deleted, outcome.errors
            );
            if outcome.errors > 0 {
                anyhow::bail!("Retention sweep finished with {} error(s)", outcome.errors);
            }
        }
        "7" | "status" => {
            let statuses = orchestrator
                .status()
                .await
                .context("Failed to gather storage status")?;
            for status in statuses {
                let last = status
                    .last_backup
                    .map(|m| m.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{}: {} backup(s), {} bytes, last backup {}",
                    status.storage.as_str(),
                    status.backups,
                    status.total_bytes,
                    last
                );
            }
        }
        _ => {
            println!(
                "❌ Invalid choice. Use backup, restore, test-restore, list, delete, retention or status."
            );
            anyhow::bail!("Invalid operation choice");
        }
    }
    Ok(())
}

fn parse_level(raw: &str) -> Result<BackupLevel> {
    BackupLevel::parse(raw.trim()).ok_or_else(|| {
        anyhow::anyhow!("Unknown backup level '{}'. Use daily, weekly or monthly.", raw)
    })
}

fn parse_storage(raw: &str) -> Result<StorageKind> {
    StorageKind::parse(raw.trim())
        .ok_or_else(|| anyhow::anyhow!("Unknown storage backend '{}'. Use local or s3.", raw))
}

fn parse_id_and_storage(args: &[String]) -> Result<(Uuid, StorageKind)> {
    let raw_id = args
        .get(1)
        .context("Missing backup id argument (a UUID)")?;
    let id = Uuid::parse_str(raw_id.trim())
        .context(format!("Invalid backup id '{}'", raw_id))?;
    let kind = match args.get(2) {
        Some(raw) => parse_storage(raw)?,
        None => StorageKind::Local,
    };
    Ok((id, kind))
}

/// Prompts user to select an operation when no argument is given
///
/// Returns the user's choice as String
fn prompt_choice() -> Result<String> {
    use std::io::{stdin, stdout, Write};

    println!("Select an operation:");
    println!("1. Take Backup (or type 'backup')");
    println!("2. Restore Backup (or type 'restore')");
    println!("3. Test Restore without touching the database (or type 'test-restore')");
    println!("4. List Backups (or type 'list')");
    println!("5. Delete a Backup (or type 'delete')");
    println!("6. Apply Retention Policy (or type 'retention')");
    println!("7. Storage Status (or type 'status')");
    print!("Enter your choice: ");
    let _ = stdout().flush().context("Failed to flush stdout")?;

    let mut input = String::new();
    stdin()
        .read_line(&mut input)
        .context("Failed to read user input")?;
    Ok(input.trim().to_string())
}
