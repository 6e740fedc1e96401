use model::entities::{cart, cart_item, item};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::carts::{count_orders, find_cart};
use crate::error::{Result, StoreError};

// Items of an ordered cart are what the order bought.
async fn ensure_cart_not_ordered<C: ConnectionTrait>(conn: &C, cart_id: i32) -> Result<()> {
    let orders = count_orders(conn, cart_id).await?;
    if orders > 0 {
        warn!("Cart {} is referenced by {} orders and cannot change", cart_id, orders);
        return Err(StoreError::constraint(format!(
            "cart {} is referenced by {} orders",
            cart_id, orders
        )));
    }
    Ok(())
}

/// Puts an item into a cart.
///
/// Both ids must exist, the cart must not be referenced by an order and the
/// pair must not be linked yet; each of these failures is a
/// `ConstraintViolation`. The composite primary key on
/// `cart_items` catches concurrent duplicates the check cannot see.
#[instrument(skip(db))]
pub async fn add_item_to_cart(
    db: &DatabaseConnection,
    cart_id: i32,
    item_id: i32,
) -> Result<cart_item::Model> {
    trace!("Entering add_item_to_cart function");

    if cart::Entity::find_by_id(cart_id).one(db).await?.is_none() {
        warn!("Attempted to add item {} to non-existent cart {}", item_id, cart_id);
        return Err(StoreError::constraint(format!("cart {} does not exist", cart_id)));
    }
    ensure_cart_not_ordered(db, cart_id).await?;
    if item::Entity::find_by_id(item_id).one(db).await?.is_none() {
        warn!("Attempted to add non-existent item {} to cart {}", item_id, cart_id);
        return Err(StoreError::constraint(format!("item {} does not exist", item_id)));
    }
    if cart_item::Entity::find_by_id((cart_id, item_id)).one(db).await?.is_some() {
        warn!("Item {} is already in cart {}", item_id, cart_id);
        return Err(StoreError::constraint(format!(
            "item {} is already in cart {}",
            item_id, cart_id
        )));
    }

    let link = cart_item::ActiveModel {
        cart_id: Set(cart_id),
        item_id: Set(item_id),
    }
    .insert(db)
    .await?;

    info!("Item {} added to cart {}", item_id, cart_id);
    Ok(link)
}

/// Takes an item out of a cart; `NotFound` when the pair is not linked,
/// `ConstraintViolation` when the cart is referenced by an order.
#[instrument(skip(db))]
pub async fn remove_item_from_cart(db: &DatabaseConnection, cart_id: i32, item_id: i32) -> Result<()> {
    trace!("Entering remove_item_from_cart function");
    ensure_cart_not_ordered(db, cart_id).await?;

    let result = cart_item::Entity::delete_by_id((cart_id, item_id))
        .exec(db)
        .await?;
    debug!("Delete operation completed. Rows affected: {}", result.rows_affected);

    if result.rows_affected == 0 {
        warn!("Item {} is not in cart {}", item_id, cart_id);
        return Err(StoreError::not_found(
            "Cart item",
            format!("({}, {})", cart_id, item_id),
        ));
    }

    info!("Item {} removed from cart {}", item_id, cart_id);
    Ok(())
}

/// Items linked to `cart_id`, without existence check.
pub(crate) async fn items_of_cart<C: ConnectionTrait>(conn: &C, cart_id: i32) -> Result<Vec<item::Model>> {
    Ok(item::Entity::find()
        .join(sea_orm::JoinType::InnerJoin, item::Relation::CartItem.def())
        .filter(cart_item::Column::CartId.eq(cart_id))
        .order_by_asc(item::Column::Id)
        .all(conn)
        .await?)
}

/// The items in a cart, ordered by item id.
#[instrument(skip(db))]
pub async fn list_items_in_cart(db: &DatabaseConnection, cart_id: i32) -> Result<Vec<item::Model>> {
    find_cart(db, cart_id).await?;

    let items = items_of_cart(db, cart_id).await?;
    debug!("Cart {} holds {} items", cart_id, items.len());
    Ok(items)
}
