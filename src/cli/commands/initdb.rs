use anyhow::Result;
use tracing::{info, trace};

use crate::config::open_database;

pub async fn init_database(database_url: &str) -> Result<()> {
    trace!("Entering init_database function");
    info!("Initializing database");

    let db = open_database(database_url).await?;
    db.close().await?;

    info!("Database initialization completed successfully!");
    Ok(())
}
