// backuptool/src/utils/setting.rs
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// Preflight connectivity check against the source/target database.
pub async fn check_db_connection(db_url: &str) -> bool {
    let connect = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(db_url)
        .await;
    match connect {
        Ok(_) => {
            println!("✅ Successfully connected to the database");
            true
        }
        Err(e) => {
            eprintln!("❌ Failed to connect to the database: {}", e);
            false
        }
    }
}
