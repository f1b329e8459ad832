use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};

use crate::{config::Config, error::AppResult};

/// Connect and bring the schema up to date, retrying on a fixed interval
/// until the database answers or the attempt bound is exhausted.
pub async fn connect_with_retry(config: &Config) -> AppResult<DatabaseConnection> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match connect_and_migrate(&config.database_url).await {
            Ok(db) => return Ok(db),
            Err(err) if attempt < config.db_connect_attempts => {
                tracing::warn!(attempt, error = %err, "database not ready, retrying");
                tokio::time::sleep(Duration::from_millis(config.db_connect_retry_ms)).await;
            }
            Err(err) => return Err(err),
        }
    }
}

pub async fn connect_and_migrate(database_url: &str) -> AppResult<DatabaseConnection> {
    let db = Database::connect(database_url).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}
