use chrono::Utc;
use model::entities::{cart, cart_item, order, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{debug, info, instrument, trace, warn};
use validator::Validate;

use crate::carts::{self, NewCart};
use crate::error::{Result, StoreError};

/// Input for creating a user. `id` and `created_at` are assigned when unset.
///
/// A new user has no active cart; [`register_user`] or [`update_user`] sets it.
#[derive(Clone, Default, Deserialize, Validate)]
pub struct NewUser {
    pub id: Option<i32>,
    /// Must be unique
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    pub token: Option<String>,
    pub created_at: Option<chrono::DateTime<Utc>>,
}

// Hand-written so the password never ends up in logs.
impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Field changes for a user. `None` leaves a field untouched; for the
/// nullable fields `Some(None)` clears the value.
#[derive(Clone, Default, Validate)]
pub struct UserChanges {
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub username: Option<String>,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: Option<String>,
    pub token: Option<Option<String>>,
    pub cart_id: Option<Option<i32>>,
}

impl std::fmt::Debug for UserChanges {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserChanges")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("cart_id", &self.cart_id)
            .finish_non_exhaustive()
    }
}

/// Looks up a user, mapping a missing row to `NotFound`.
pub(crate) async fn find_user<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<user::Model> {
    match user::Entity::find_by_id(user_id).one(conn).await? {
        Some(user) => Ok(user),
        None => {
            warn!("User with ID {} not found", user_id);
            Err(StoreError::not_found("User", user_id))
        }
    }
}

/// Checks a user reference held by another row.
pub(crate) async fn ensure_user_exists<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<()> {
    if user::Entity::find_by_id(user_id).one(conn).await?.is_none() {
        warn!("Reference to non-existent user_id: {}", user_id);
        return Err(StoreError::constraint(format!(
            "user {} does not exist",
            user_id
        )));
    }
    Ok(())
}

async fn ensure_username_free<C: ConnectionTrait>(
    conn: &C,
    username: &str,
    except_id: Option<i32>,
) -> Result<()> {
    let holder = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(conn)
        .await?;

    match holder {
        Some(existing) if Some(existing.id) != except_id => {
            warn!("Username '{}' is already taken by user {}", username, existing.id);
            Err(StoreError::constraint(format!(
                "username '{}' already exists",
                username
            )))
        }
        _ => Ok(()),
    }
}

async fn ensure_cart_owned_by<C: ConnectionTrait>(
    conn: &C,
    cart_id: i32,
    owner: i32,
) -> Result<()> {
    let Some(cart) = cart::Entity::find_by_id(cart_id).one(conn).await? else {
        warn!("Reference to non-existent cart_id: {}", cart_id);
        return Err(StoreError::constraint(format!(
            "cart {} does not exist",
            cart_id
        )));
    };

    if cart.user_id != owner {
        warn!("Cart {} belongs to user {}, not {}", cart_id, cart.user_id, owner);
        return Err(StoreError::constraint(format!(
            "cart {} does not belong to this user",
            cart_id
        )));
    }
    Ok(())
}

async fn insert_user<C: ConnectionTrait>(conn: &C, new_user: NewUser) -> Result<user::Model> {
    ensure_username_free(conn, &new_user.username, None).await?;

    let mut active = user::ActiveModel {
        username: Set(new_user.username),
        password: Set(new_user.password),
        token: Set(new_user.token),
        cart_id: Set(None),
        created_at: Set(new_user.created_at.unwrap_or_else(Utc::now)),
        ..Default::default()
    };

    if let Some(id) = new_user.id {
        if user::Entity::find_by_id(id).one(conn).await?.is_some() {
            return Err(StoreError::constraint(format!("user {} already exists", id)));
        }
        active.id = Set(id);
    }

    trace!("Attempting to insert new user into database");
    let user = active.insert(conn).await?;
    info!("User created successfully with ID: {}, username: {}", user.id, user.username);
    Ok(user)
}

/// Creates a user.
#[instrument(skip(db))]
pub async fn create_user(db: &DatabaseConnection, new_user: NewUser) -> Result<user::Model> {
    trace!("Entering create_user function");
    new_user.validate()?;
    insert_user(db, new_user).await
}

/// Creates a user together with an empty cart and makes that cart active,
/// all in one transaction.
#[instrument(skip(db))]
pub async fn register_user(
    db: &DatabaseConnection,
    new_user: NewUser,
) -> Result<(user::Model, cart::Model)> {
    trace!("Entering register_user function");
    new_user.validate()?;

    let txn = db.begin().await?;

    let user = insert_user(&txn, new_user).await?;

    let cart = carts::insert_cart(
        &txn,
        NewCart {
            user_id: user.id,
            name: format!("{}'s cart", user.username),
            ..Default::default()
        },
    )
    .await?;

    let mut active: user::ActiveModel = user.into();
    active.cart_id = Set(Some(cart.id));
    let user = active.update(&txn).await?;

    txn.commit().await?;
    info!("Registered user {} with cart {}", user.id, cart.id);
    Ok((user, cart))
}

/// Fetches a user by id.
#[instrument(skip(db))]
pub async fn get_user(db: &DatabaseConnection, user_id: i32) -> Result<user::Model> {
    trace!("Entering get_user function for user_id: {}", user_id);
    find_user(db, user_id).await
}

/// Fetches a user by username.
#[instrument(skip(db))]
pub async fn find_user_by_username(db: &DatabaseConnection, username: &str) -> Result<user::Model> {
    trace!("Entering find_user_by_username function for username: {}", username);

    match user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?
    {
        Some(user) => Ok(user),
        None => {
            warn!("User with username '{}' not found", username);
            Err(StoreError::not_found("User", username))
        }
    }
}

/// All users, ordered by id.
#[instrument(skip(db))]
pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    let users = user::Entity::find()
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?;
    debug!("Retrieved {} users from database", users.len());
    Ok(users)
}

/// Applies `changes` to an existing user.
#[instrument(skip(db))]
pub async fn update_user(
    db: &DatabaseConnection,
    user_id: i32,
    changes: UserChanges,
) -> Result<user::Model> {
    trace!("Entering update_user function for user_id: {}", user_id);
    changes.validate()?;

    let existing = find_user(db, user_id).await?;
    let mut active: user::ActiveModel = existing.into();
    let mut updated_fields = Vec::new();

    if let Some(username) = changes.username {
        ensure_username_free(db, &username, Some(user_id)).await?;
        updated_fields.push(format!("username: {}", username));
        active.username = Set(username);
    }
    if let Some(password) = changes.password {
        updated_fields.push("password".to_string());
        active.password = Set(password);
    }
    if let Some(token) = changes.token {
        updated_fields.push("token".to_string());
        active.token = Set(token);
    }
    if let Some(cart_id) = changes.cart_id {
        if let Some(cart_id) = cart_id {
            ensure_cart_owned_by(db, cart_id, user_id).await?;
        }
        updated_fields.push(format!("cart_id: {:?}", cart_id));
        active.cart_id = Set(cart_id);
    }

    if updated_fields.is_empty() {
        debug!("No fields to update for user ID: {}", user_id);
        return find_user(db, user_id).await;
    }

    let updated = active.update(db).await?;
    info!("User with ID {} updated. Updated fields: {}", user_id, updated_fields.join(", "));
    Ok(updated)
}

/// Deletes a user. Cascades: the user's orders, the items of the user's
/// carts and the carts themselves go in the same transaction.
#[instrument(skip(db))]
pub async fn delete_user(db: &DatabaseConnection, user_id: i32) -> Result<()> {
    trace!("Entering delete_user function for user_id: {}", user_id);
    let txn = db.begin().await?;

    find_user(&txn, user_id).await?;

    let cart_ids: Vec<i32> = cart::Entity::find()
        .filter(cart::Column::UserId.eq(user_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|cart| cart.id)
        .collect();

    let orders = order::Entity::delete_many()
        .filter(order::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;

    let links = cart_item::Entity::delete_many()
        .filter(cart_item::Column::CartId.is_in(cart_ids.clone()))
        .exec(&txn)
        .await?;

    cart::Entity::delete_many()
        .filter(cart::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;

    user::Entity::delete_by_id(user_id).exec(&txn).await?;
    txn.commit().await?;

    info!(
        "User with ID {} deleted along with {} carts, {} cart items and {} orders",
        user_id,
        cart_ids.len(),
        links.rows_affected,
        orders.rows_affected
    );
    Ok(())
}
