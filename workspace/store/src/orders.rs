use chrono::Utc;
use model::entities::{cart, cart_item, item, order, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};

use crate::cart_items::items_of_cart;
use crate::carts::{NewCart, find_cart, insert_cart};
use crate::error::{Result, StoreError};
use crate::users::{ensure_user_exists, find_user};

/// Input for recording an order directly. The cart must belong to the user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewOrder {
    pub id: Option<i32>,
    pub cart_id: i32,
    pub user_id: i32,
    pub created_at: Option<chrono::DateTime<Utc>>,
}

/// Field changes for an order; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct OrderChanges {
    pub cart_id: Option<i32>,
    pub user_id: Option<i32>,
}

/// Outcome of [`checkout`].
#[derive(Debug, Clone, Serialize)]
pub struct Checkout {
    pub order: order::Model,
    /// What was bought: the items of the checked-out cart.
    pub items: Vec<item::Model>,
    /// The empty cart that is now the user's active cart.
    pub next_cart: cart::Model,
}

async fn find_order<C: ConnectionTrait>(conn: &C, order_id: i32) -> Result<order::Model> {
    match order::Entity::find_by_id(order_id).one(conn).await? {
        Some(order) => Ok(order),
        None => {
            warn!("Order with ID {} not found", order_id);
            Err(StoreError::not_found("Order", order_id))
        }
    }
}

async fn ensure_cart_of_user<C: ConnectionTrait>(conn: &C, cart_id: i32, user_id: i32) -> Result<()> {
    ensure_user_exists(conn, user_id).await?;

    match cart::Entity::find_by_id(cart_id).one(conn).await? {
        None => Err(StoreError::constraint(format!("cart {} does not exist", cart_id))),
        Some(cart) if cart.user_id != user_id => Err(StoreError::constraint(format!(
            "cart {} does not belong to user {}",
            cart_id, user_id
        ))),
        Some(_) => Ok(()),
    }
}

async fn insert_order<C: ConnectionTrait>(conn: &C, new_order: NewOrder) -> Result<order::Model> {
    ensure_cart_of_user(conn, new_order.cart_id, new_order.user_id).await?;

    let mut active = order::ActiveModel {
        cart_id: Set(new_order.cart_id),
        user_id: Set(new_order.user_id),
        created_at: Set(new_order.created_at.unwrap_or_else(Utc::now)),
        ..Default::default()
    };

    if let Some(id) = new_order.id {
        if order::Entity::find_by_id(id).one(conn).await?.is_some() {
            return Err(StoreError::constraint(format!("order {} already exists", id)));
        }
        active.id = Set(id);
    }

    let order = active.insert(conn).await?;
    info!("Order created successfully with ID: {} from cart {}", order.id, order.cart_id);
    Ok(order)
}

/// Records an order for an existing cart of the user.
#[instrument(skip(db))]
pub async fn create_order(db: &DatabaseConnection, new_order: NewOrder) -> Result<order::Model> {
    trace!("Entering create_order function");
    insert_order(db, new_order).await
}

#[instrument(skip(db))]
pub async fn get_order(db: &DatabaseConnection, order_id: i32) -> Result<order::Model> {
    find_order(db, order_id).await
}

/// Applies `changes` to an existing order. The resulting cart must still
/// belong to the resulting user.
#[instrument(skip(db))]
pub async fn update_order(
    db: &DatabaseConnection,
    order_id: i32,
    changes: OrderChanges,
) -> Result<order::Model> {
    trace!("Entering update_order function for order_id: {}", order_id);
    let existing = find_order(db, order_id).await?;
    if changes.cart_id.is_none() && changes.user_id.is_none() {
        debug!("No fields to update for order ID: {}", order_id);
        return Ok(existing);
    }

    let cart_id = changes.cart_id.unwrap_or(existing.cart_id);
    let user_id = changes.user_id.unwrap_or(existing.user_id);
    ensure_cart_of_user(db, cart_id, user_id).await?;

    let mut active: order::ActiveModel = existing.into();
    active.cart_id = Set(cart_id);
    active.user_id = Set(user_id);

    let updated = active.update(db).await?;
    info!("Order with ID {} updated successfully", order_id);
    Ok(updated)
}

#[instrument(skip(db))]
pub async fn delete_order(db: &DatabaseConnection, order_id: i32) -> Result<()> {
    trace!("Entering delete_order function for order_id: {}", order_id);

    let result = order::Entity::delete_by_id(order_id).exec(db).await?;
    if result.rows_affected == 0 {
        warn!("Order with ID {} not found for deletion (no rows affected)", order_id);
        return Err(StoreError::not_found("Order", order_id));
    }

    info!("Order with ID {} deleted successfully", order_id);
    Ok(())
}

/// The user's orders, newest first.
#[instrument(skip(db))]
pub async fn list_orders_for_user(db: &DatabaseConnection, user_id: i32) -> Result<Vec<order::Model>> {
    find_user(db, user_id).await?;

    let orders = order::Entity::find()
        .filter(order::Column::UserId.eq(user_id))
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .all(db)
        .await?;
    debug!("User {} has {} orders", user_id, orders.len());
    Ok(orders)
}

/// The items bought with an order, read from its cart snapshot.
#[instrument(skip(db))]
pub async fn list_order_items(db: &DatabaseConnection, order_id: i32) -> Result<Vec<item::Model>> {
    let order = find_order(db, order_id).await?;
    items_of_cart(db, order.cart_id).await
}

/// Turns the user's active cart into an order.
///
/// In one transaction: the order is recorded against the active cart, that
/// cart is marked [`cart::CHECKED_OUT_STATUS`] and keeps its items as the
/// order's snapshot, and a fresh empty cart becomes the user's active cart.
/// An empty cart cannot be checked out.
#[instrument(skip(db))]
pub async fn checkout(db: &DatabaseConnection, user_id: i32) -> Result<Checkout> {
    trace!("Entering checkout function for user_id: {}", user_id);
    let txn = db.begin().await?;

    let user = find_user(&txn, user_id).await?;
    let Some(cart_id) = user.cart_id else {
        warn!("User {} has no active cart to check out", user_id);
        return Err(StoreError::not_found("Active cart of user", user_id));
    };
    let cart = find_cart(&txn, cart_id).await?;

    let line_count = cart_item::Entity::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .count(&txn)
        .await?;
    if line_count == 0 {
        warn!("Checkout refused, cart {} is empty", cart.id);
        return Err(StoreError::constraint(format!("cart {} is empty", cart.id)));
    }

    let order = insert_order(
        &txn,
        NewOrder {
            cart_id: cart.id,
            user_id,
            ..Default::default()
        },
    )
    .await?;

    let items = items_of_cart(&txn, cart.id).await?;
    let next_name = cart.name.clone();

    let mut checked_out: cart::ActiveModel = cart.into();
    checked_out.status = Set(cart::CHECKED_OUT_STATUS.to_string());
    checked_out.update(&txn).await?;

    let next_cart = insert_cart(
        &txn,
        NewCart {
            user_id,
            name: next_name,
            ..Default::default()
        },
    )
    .await?;

    let mut holder: user::ActiveModel = user.into();
    holder.cart_id = Set(Some(next_cart.id));
    holder.update(&txn).await?;

    txn.commit().await?;
    info!(
        "User {} checked out cart {} into order {} ({} items)",
        user_id,
        order.cart_id,
        order.id,
        items.len()
    );

    Ok(Checkout {
        order,
        items,
        next_cart,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart_items::{add_item_to_cart, list_items_in_cart, remove_item_from_cart};
    use crate::carts::{active_cart, create_cart, delete_cart, get_cart};
    use crate::items::{NewItem, create_item};
    use crate::testing::{new_user, setup_db};
    use crate::users::{create_user, get_user, register_user};

    #[tokio::test]
    async fn test_create_and_get_order() {
        let db = setup_db().await;
        let (user, cart) = register_user(&db, new_user("alice", "pw")).await.unwrap();

        let order = create_order(
            &db,
            NewOrder {
                cart_id: cart.id,
                user_id: user.id,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(get_order(&db, order.id).await.unwrap(), order);
        assert!(order.created_at <= Utc::now());
    }

    #[tokio::test]
    async fn test_create_order_checks_references() {
        let db = setup_db().await;
        let (alice, alice_cart) = register_user(&db, new_user("alice", "pw")).await.unwrap();
        let bob = create_user(&db, new_user("bob", "pw")).await.unwrap();

        let no_cart = NewOrder {
            cart_id: 77,
            user_id: alice.id,
            ..Default::default()
        };
        assert!(create_order(&db, no_cart).await.unwrap_err().is_constraint_violation());

        let no_user = NewOrder {
            cart_id: alice_cart.id,
            user_id: 77,
            ..Default::default()
        };
        assert!(create_order(&db, no_user).await.unwrap_err().is_constraint_violation());

        let foreign_cart = NewOrder {
            cart_id: alice_cart.id,
            user_id: bob.id,
            ..Default::default()
        };
        assert!(create_order(&db, foreign_cart).await.unwrap_err().is_constraint_violation());
    }

    #[tokio::test]
    async fn test_update_and_delete_order() {
        let db = setup_db().await;
        let (alice, first) = register_user(&db, new_user("alice", "pw")).await.unwrap();
        let second = create_cart(
            &db,
            NewCart {
                user_id: alice.id,
                name: "second".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let order = create_order(
            &db,
            NewOrder {
                cart_id: first.id,
                user_id: alice.id,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let moved = update_order(
            &db,
            order.id,
            OrderChanges {
                cart_id: Some(second.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(moved.cart_id, second.id);

        let dangling = OrderChanges {
            cart_id: Some(404),
            ..Default::default()
        };
        assert!(update_order(&db, order.id, dangling).await.unwrap_err().is_constraint_violation());
        assert!(update_order(&db, 404, OrderChanges::default()).await.unwrap_err().is_not_found());

        delete_order(&db, order.id).await.unwrap();
        assert!(get_order(&db, order.id).await.unwrap_err().is_not_found());
        assert!(delete_order(&db, order.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_checkout_empty_cart_is_refused() {
        let db = setup_db().await;
        let (alice, cart) = register_user(&db, new_user("alice", "pw")).await.unwrap();

        let err = checkout(&db, alice.id).await.unwrap_err();
        assert!(err.is_constraint_violation());

        // Nothing changed
        assert_eq!(active_cart(&db, alice.id).await.unwrap(), cart);
        assert!(list_orders_for_user(&db, alice.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_without_active_cart() {
        let db = setup_db().await;
        let bob = create_user(&db, new_user("bob", "pw")).await.unwrap();

        assert!(checkout(&db, bob.id).await.unwrap_err().is_not_found());
        assert!(checkout(&db, 31).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_checkout_snapshots_cart_and_opens_a_new_one() {
        let db = setup_db().await;
        let (alice, cart) = register_user(&db, new_user("alice", "pw")).await.unwrap();
        let phone = create_item(&db, NewItem::named("Smartphone")).await.unwrap();
        let shoes = create_item(&db, NewItem::named("Running Shoes")).await.unwrap();
        add_item_to_cart(&db, cart.id, phone.id).await.unwrap();
        add_item_to_cart(&db, cart.id, shoes.id).await.unwrap();

        let receipt = checkout(&db, alice.id).await.unwrap();

        assert_eq!(receipt.order.cart_id, cart.id);
        assert_eq!(receipt.order.user_id, alice.id);
        assert_eq!(receipt.items, vec![phone.clone(), shoes.clone()]);
        assert_eq!(list_order_items(&db, receipt.order.id).await.unwrap(), vec![phone, shoes]);

        let old_cart = get_cart(&db, cart.id).await.unwrap();
        assert_eq!(old_cart.status, cart::CHECKED_OUT_STATUS);

        let user = get_user(&db, alice.id).await.unwrap();
        assert_eq!(user.cart_id, Some(receipt.next_cart.id));
        assert_ne!(receipt.next_cart.id, cart.id);
        assert_eq!(receipt.next_cart.status, cart::DEFAULT_STATUS);
        assert!(list_items_in_cart(&db, receipt.next_cart.id).await.unwrap().is_empty());

        let orders = list_orders_for_user(&db, alice.id).await.unwrap();
        assert_eq!(orders, vec![receipt.order]);

        // The snapshot cart is now protected
        assert!(delete_cart(&db, cart.id).await.unwrap_err().is_constraint_violation());
    }

    #[tokio::test]
    async fn test_ordered_cart_items_are_frozen() {
        let db = setup_db().await;
        let (alice, cart) = register_user(&db, new_user("alice", "pw")).await.unwrap();
        let book = create_item(&db, NewItem::named("Book")).await.unwrap();
        let lamp = create_item(&db, NewItem::named("Lamp")).await.unwrap();
        add_item_to_cart(&db, cart.id, book.id).await.unwrap();

        let receipt = checkout(&db, alice.id).await.unwrap();
        assert_eq!(receipt.items, vec![book.clone()]);

        let added = add_item_to_cart(&db, cart.id, lamp.id).await.unwrap_err();
        assert!(added.is_constraint_violation());
        let removed = remove_item_from_cart(&db, cart.id, book.id).await.unwrap_err();
        assert!(removed.is_constraint_violation());

        assert_eq!(list_order_items(&db, receipt.order.id).await.unwrap(), vec![book]);

        // The new active cart still takes items
        add_item_to_cart(&db, receipt.next_cart.id, lamp.id).await.unwrap();
        remove_item_from_cart(&db, receipt.next_cart.id, lamp.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_orders_for_missing_user() {
        let db = setup_db().await;
        assert!(list_orders_for_user(&db, 5).await.unwrap_err().is_not_found());
        assert!(list_order_items(&db, 5).await.unwrap_err().is_not_found());
    }
}
