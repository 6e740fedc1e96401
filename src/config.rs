use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use tracing::{debug, error, info};

/// Used when neither `--database-url` nor `DATABASE_URL` is given.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://cartstore.db?mode=rwc";

/// Default log directives, overridden by `RUST_LOG`.
pub const DEFAULT_LOG_DIRECTIVES: &str = "cartstore=info,store=info";

/// Connect to the database and bring the schema up to date.
pub async fn open_database(database_url: &str) -> Result<DatabaseConnection> {
    let db = store::connect(database_url).await.map_err(|e| {
        error!("Failed to connect to database: {}", e);
        e
    })?;

    info!("Running database migrations");
    if let Err(e) = Migrator::up(&db, None).await {
        error!("Failed to run database migrations: {}", e);
        return Err(e.into());
    }
    debug!("All pending migrations have been applied");

    Ok(db)
}
