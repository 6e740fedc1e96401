use chrono::Utc;
use model::entities::{cart, cart_item, order, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait, Value, sea_query::Expr,
};
use serde::Deserialize;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{Result, StoreError};
use crate::users::{ensure_user_exists, find_user};

/// Input for creating a cart. `status` defaults to [`cart::DEFAULT_STATUS`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCart {
    pub id: Option<i32>,
    /// Owning user, must exist
    pub user_id: i32,
    #[serde(default)]
    pub name: String,
    pub status: Option<String>,
    pub created_at: Option<chrono::DateTime<Utc>>,
}

/// Field changes for a cart; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct CartChanges {
    pub user_id: Option<i32>,
    pub name: Option<String>,
    pub status: Option<String>,
}

pub(crate) async fn find_cart<C: ConnectionTrait>(conn: &C, cart_id: i32) -> Result<cart::Model> {
    match cart::Entity::find_by_id(cart_id).one(conn).await? {
        Some(cart) => Ok(cart),
        None => {
            warn!("Cart with ID {} not found", cart_id);
            Err(StoreError::not_found("Cart", cart_id))
        }
    }
}

pub(crate) async fn insert_cart<C: ConnectionTrait>(conn: &C, new_cart: NewCart) -> Result<cart::Model> {
    ensure_user_exists(conn, new_cart.user_id).await?;

    let mut active = cart::ActiveModel {
        user_id: Set(new_cart.user_id),
        name: Set(new_cart.name),
        status: Set(new_cart
            .status
            .unwrap_or_else(|| cart::DEFAULT_STATUS.to_string())),
        created_at: Set(new_cart.created_at.unwrap_or_else(Utc::now)),
        ..Default::default()
    };

    if let Some(id) = new_cart.id {
        if cart::Entity::find_by_id(id).one(conn).await?.is_some() {
            return Err(StoreError::constraint(format!("cart {} already exists", id)));
        }
        active.id = Set(id);
    }

    let cart = active.insert(conn).await?;
    info!("Cart created successfully with ID: {} for user {}", cart.id, cart.user_id);
    Ok(cart)
}

/// Creates a cart. It does not become the owner's active cart on its own.
#[instrument(skip(db))]
pub async fn create_cart(db: &DatabaseConnection, new_cart: NewCart) -> Result<cart::Model> {
    trace!("Entering create_cart function");
    insert_cart(db, new_cart).await
}

#[instrument(skip(db))]
pub async fn get_cart(db: &DatabaseConnection, cart_id: i32) -> Result<cart::Model> {
    find_cart(db, cart_id).await
}

/// Every cart owned by the user, oldest first.
#[instrument(skip(db))]
pub async fn list_carts_for_user(db: &DatabaseConnection, user_id: i32) -> Result<Vec<cart::Model>> {
    find_user(db, user_id).await?;

    let carts = cart::Entity::find()
        .filter(cart::Column::UserId.eq(user_id))
        .order_by_asc(cart::Column::Id)
        .all(db)
        .await?;
    debug!("User {} owns {} carts", user_id, carts.len());
    Ok(carts)
}

/// The cart the user's `cart_id` points at.
#[instrument(skip(db))]
pub async fn active_cart(db: &DatabaseConnection, user_id: i32) -> Result<cart::Model> {
    let user = find_user(db, user_id).await?;
    let Some(cart_id) = user.cart_id else {
        warn!("User {} has no active cart", user_id);
        return Err(StoreError::not_found("Active cart of user", user_id));
    };
    find_cart(db, cart_id).await
}

/// Applies `changes` to an existing cart.
///
/// Moving a cart to another owner is refused while it is someone's active
/// cart or while orders point at it.
#[instrument(skip(db))]
pub async fn update_cart(
    db: &DatabaseConnection,
    cart_id: i32,
    changes: CartChanges,
) -> Result<cart::Model> {
    trace!("Entering update_cart function for cart_id: {}", cart_id);
    let existing = find_cart(db, cart_id).await?;

    if let Some(user_id) = changes.user_id.filter(|id| *id != existing.user_id) {
        ensure_user_exists(db, user_id).await?;

        let holders = user::Entity::find()
            .filter(user::Column::CartId.eq(cart_id))
            .count(db)
            .await?;
        if holders > 0 {
            return Err(StoreError::constraint(format!(
                "cart {} is an active cart and cannot change owner",
                cart_id
            )));
        }
        if count_orders(db, cart_id).await? > 0 {
            return Err(StoreError::constraint(format!(
                "cart {} has orders and cannot change owner",
                cart_id
            )));
        }
    }

    let mut active: cart::ActiveModel = existing.clone().into();
    let mut changed = false;
    if let Some(user_id) = changes.user_id {
        active.user_id = Set(user_id);
        changed = true;
    }
    if let Some(name) = changes.name {
        active.name = Set(name);
        changed = true;
    }
    if let Some(status) = changes.status {
        active.status = Set(status);
        changed = true;
    }

    if !changed {
        debug!("No fields to update for cart ID: {}", cart_id);
        return Ok(existing);
    }

    let updated = active.update(db).await?;
    info!("Cart with ID {} updated successfully", cart_id);
    Ok(updated)
}

pub(crate) async fn count_orders<C: ConnectionTrait>(conn: &C, cart_id: i32) -> Result<u64> {
    Ok(order::Entity::find()
        .filter(order::Column::CartId.eq(cart_id))
        .count(conn)
        .await?)
}

/// Deletes a cart. Restricted while any order references it; otherwise its
/// item links are removed and users holding it as active cart lose it.
#[instrument(skip(db))]
pub async fn delete_cart(db: &DatabaseConnection, cart_id: i32) -> Result<()> {
    trace!("Entering delete_cart function for cart_id: {}", cart_id);
    let txn = db.begin().await?;

    find_cart(&txn, cart_id).await?;

    let orders = count_orders(&txn, cart_id).await?;
    if orders > 0 {
        warn!("Refusing to delete cart {} referenced by {} orders", cart_id, orders);
        return Err(StoreError::constraint(format!(
            "cart {} is referenced by {} orders",
            cart_id, orders
        )));
    }

    cart_item::Entity::delete_many()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .exec(&txn)
        .await?;

    user::Entity::update_many()
        .col_expr(user::Column::CartId, Expr::value(Value::Int(None)))
        .filter(user::Column::CartId.eq(cart_id))
        .exec(&txn)
        .await?;

    cart::Entity::delete_by_id(cart_id).exec(&txn).await?;
    txn.commit().await?;

    info!("Cart with ID {} deleted successfully", cart_id);
    Ok(())
}
