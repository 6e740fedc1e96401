//! Data access layer for the shopping cart.
//!
//! Every operation checks its constraints explicitly (required fields,
//! references, uniqueness) before touching the database, and the schema
//! backs the same rules up at the storage boundary. Failures come back as
//! [`StoreError`]; nothing is retried or swallowed.

pub mod cart_items;
pub mod carts;
pub mod error;
pub mod items;
pub mod orders;
pub mod users;

#[cfg(test)]
mod testing;

pub use cart_items::{add_item_to_cart, list_items_in_cart, remove_item_from_cart};
pub use carts::{
    CartChanges, NewCart, active_cart, create_cart, delete_cart, get_cart, list_carts_for_user,
    update_cart,
};
pub use error::{Result, StoreError};
pub use items::{
    ItemChanges, NewItem, create_item, delete_item, find_item_by_name, get_item, list_items,
    update_item,
};
pub use orders::{
    Checkout, NewOrder, OrderChanges, checkout, create_order, delete_order, get_order,
    list_order_items, list_orders_for_user, update_order,
};
pub use users::{
    NewUser, UserChanges, create_user, delete_user, find_user_by_username, get_user, list_users,
    register_user, update_user,
};

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend};
use tracing::{debug, info, instrument};

/// Opens a connection to `database_url`.
///
/// SQLite only checks foreign keys when asked to, so they are switched on here.
#[instrument(skip_all)]
pub async fn connect(database_url: &str) -> Result<DatabaseConnection> {
    info!("Connecting to database");
    let db = Database::connect(database_url).await?;

    if db.get_database_backend() == DbBackend::Sqlite {
        debug!("Enabling SQLite foreign key enforcement");
        db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;
    }

    Ok(db)
}
