use anyhow::Result;
use sea_orm::DatabaseConnection;
use store::{NewItem, create_item, find_item_by_name};
use tracing::{debug, info, trace};

use crate::config::open_database;

/// The demo catalog.
pub const DEMO_ITEMS: [&str; 8] = [
    "Smartphone",
    "Laptop",
    "Headphones",
    "Running Shoes",
    "Coffee Maker",
    "Backpack",
    "Smart Watch",
    "Desk Lamp",
];

/// Inserts every demo item not yet in the catalog and returns how many
/// were added.
pub async fn seed_items(db: &DatabaseConnection) -> Result<usize> {
    let mut added = 0;
    for name in DEMO_ITEMS {
        if find_item_by_name(db, name).await?.is_some() {
            debug!("Item '{}' already present, skipping", name);
            continue;
        }
        create_item(db, NewItem::named(name)).await?;
        added += 1;
    }
    Ok(added)
}

pub async fn seed_catalog(database_url: &str) -> Result<()> {
    trace!("Entering seed_catalog function");
    let db = open_database(database_url).await?;

    let added = seed_items(&db).await?;
    info!("Added {} items to the catalog", added);

    db.close().await?;
    Ok(())
}
