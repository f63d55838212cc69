use kinder_ops::config::DatabaseConfig;
use kinder_ops::database::{Migrator, PendingStep};
use kinder_ops::db::Database;
use kinder_ops::env::load_environment;
use kinder_ops::error::AppError;

#[tokio::main]
async fn main() {
    let pending = match get_pending_steps().await {
        Ok(pending) => pending,
        Err(e) => {
            eprintln!("Failed to check for pending migrations: {}", e);
            std::process::exit(2);
        }
    };

    if pending.is_empty() {
        println!("Schema is up to date ✓");
        return;
    }

    println!("Pending schema steps:");
    let mut current = "";
    for step in &pending {
        if step.migration != current {
            println!("  {}", step.migration);
            current = &step.migration;
        }
        println!("    {}", step.step);
    }
    std::process::exit(1);
}

async fn get_pending_steps() -> Result<Vec<PendingStep>, AppError> {
    load_environment()?;
    let config = DatabaseConfig::from_env()?;
    let db = Database::connect(&config).await?;

    let pending = Migrator::with_catalog(&db).plan().await;
    db.close().await;
    pending
}
