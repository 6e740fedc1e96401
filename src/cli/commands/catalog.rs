use anyhow::Result;
use tracing::{debug, trace};

use crate::config::open_database;

/// Prints the catalog to stdout as a JSON array.
pub async fn print_catalog(database_url: &str) -> Result<()> {
    trace!("Entering print_catalog function");
    let db = open_database(database_url).await?;

    let items = store::list_items(&db).await?;
    debug!("Printing {} items", items.len());
    println!("{}", serde_json::to_string_pretty(&items)?);

    db.close().await?;
    Ok(())
}
