use std::env;
use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;

use metadata_export::db_migration::initialize_database;
use metadata_export::{
    init_logging, ExportConfig, ExportObjectsInput, ExportTask, HashAlgorithm, LocalDownloadStore, SqliteLibrary,
};

const USAGE: &str = "usage: export_library (--full | <input.json>)";

fn hash_algorithm() -> Result<HashAlgorithm, Box<dyn std::error::Error>> {
    match env::var("HASH_ALGORITHM") {
        Ok(raw) => Ok(serde_json::from_value(serde_json::Value::String(raw.trim().to_uppercase()))?),
        Err(_) => Ok(HashAlgorithm::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = ExportConfig::from_env()?;
    let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL is not set")?;
    let hash_algorithm = hash_algorithm()?;

    let arg = env::args().nth(1).ok_or(USAGE)?;

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;
    initialize_database(&pool).await?;

    let store = Arc::new(SqliteLibrary::new(pool.clone()));
    let downloads = Arc::new(LocalDownloadStore::default());

    let task = if arg == "--full" {
        ExportTask::full(store, downloads.clone(), config, hash_algorithm)
    } else {
        let raw = std::fs::read_to_string(&arg)?;
        let input: ExportObjectsInput = serde_json::from_str(&raw)?;
        ExportTask::new(store, downloads.clone(), config, hash_algorithm, &input)
    };

    let outcome = task.run().await?;

    for report in &outcome.reports {
        println!(
            "{:<11} {:>6} written {:>4} failed",
            report.kind.to_string(),
            report.written,
            report.failed
        );
    }

    match &outcome.download_hash {
        Some(handle) => {
            if let Some(entry) = downloads.entry(handle).await {
                println!("archive {} ({})", entry.path.display(), handle);
            }
        }
        None => println!("metadata written to {}", outcome.output_root.display()),
    }

    pool.close().await;
    Ok(())
}
