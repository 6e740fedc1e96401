use chrono::Utc;
use model::entities::{cart_item, item};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tracing::{debug, info, instrument, trace, warn};
use validator::Validate;

use crate::error::{Result, StoreError};

/// Input for creating a catalog item. `status` defaults to
/// [`item::DEFAULT_STATUS`].
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewItem {
    pub id: Option<i32>,
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    pub status: Option<String>,
    pub created_at: Option<chrono::DateTime<Utc>>,
}

impl NewItem {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Field changes for an item; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Validate)]
pub struct ItemChanges {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,
    pub status: Option<String>,
}

pub(crate) async fn find_item<C: ConnectionTrait>(conn: &C, item_id: i32) -> Result<item::Model> {
    match item::Entity::find_by_id(item_id).one(conn).await? {
        Some(item) => Ok(item),
        None => {
            warn!("Item with ID {} not found", item_id);
            Err(StoreError::not_found("Item", item_id))
        }
    }
}

/// Adds an item to the catalog.
#[instrument(skip(db))]
pub async fn create_item(db: &DatabaseConnection, new_item: NewItem) -> Result<item::Model> {
    trace!("Entering create_item function");
    new_item.validate()?;

    let mut active = item::ActiveModel {
        name: Set(new_item.name),
        status: Set(new_item
            .status
            .unwrap_or_else(|| item::DEFAULT_STATUS.to_string())),
        created_at: Set(new_item.created_at.unwrap_or_else(Utc::now)),
        ..Default::default()
    };

    if let Some(id) = new_item.id {
        if item::Entity::find_by_id(id).one(db).await?.is_some() {
            return Err(StoreError::constraint(format!("item {} already exists", id)));
        }
        active.id = Set(id);
    }

    let item = active.insert(db).await?;
    info!("Item created successfully with ID: {}, name: {}", item.id, item.name);
    Ok(item)
}

#[instrument(skip(db))]
pub async fn get_item(db: &DatabaseConnection, item_id: i32) -> Result<item::Model> {
    find_item(db, item_id).await
}

/// The whole catalog, newest first.
#[instrument(skip(db))]
pub async fn list_items(db: &DatabaseConnection) -> Result<Vec<item::Model>> {
    let items = item::Entity::find()
        .order_by_desc(item::Column::CreatedAt)
        .order_by_desc(item::Column::Id)
        .all(db)
        .await?;
    debug!("Retrieved {} items from catalog", items.len());
    Ok(items)
}

/// First item carrying exactly `name`, if any.
#[instrument(skip(db))]
pub async fn find_item_by_name(db: &DatabaseConnection, name: &str) -> Result<Option<item::Model>> {
    trace!("Entering find_item_by_name function for name: {}", name);

    let item = item::Entity::find()
        .filter(item::Column::Name.eq(name))
        .order_by_asc(item::Column::Id)
        .one(db)
        .await?;
    if item.is_none() {
        warn!("Item with name '{}' not found", name);
    }
    Ok(item)
}

/// Applies `changes` to an existing item.
#[instrument(skip(db))]
pub async fn update_item(
    db: &DatabaseConnection,
    item_id: i32,
    changes: ItemChanges,
) -> Result<item::Model> {
    trace!("Entering update_item function for item_id: {}", item_id);
    changes.validate()?;

    let existing = find_item(db, item_id).await?;
    if changes.name.is_none() && changes.status.is_none() {
        debug!("No fields to update for item ID: {}", item_id);
        return Ok(existing);
    }

    let mut active: item::ActiveModel = existing.into();
    if let Some(name) = changes.name {
        active.name = Set(name);
    }
    if let Some(status) = changes.status {
        active.status = Set(status);
    }

    let updated = active.update(db).await?;
    info!("Item with ID {} updated successfully", item_id);
    Ok(updated)
}

/// Deletes an item. Restricted while any cart holds it.
#[instrument(skip(db))]
pub async fn delete_item(db: &DatabaseConnection, item_id: i32) -> Result<()> {
    trace!("Entering delete_item function for item_id: {}", item_id);
    find_item(db, item_id).await?;

    let holders = cart_item::Entity::find()
        .filter(cart_item::Column::ItemId.eq(item_id))
        .count(db)
        .await?;
    if holders > 0 {
        warn!("Refusing to delete item {} held by {} carts", item_id, holders);
        return Err(StoreError::constraint(format!(
            "item {} is in {} carts",
            item_id, holders
        )));
    }

    let result = item::Entity::delete_by_id(item_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(StoreError::not_found("Item", item_id));
    }
    info!("Item with ID {} deleted successfully", item_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::setup_db;
    use chrono::Duration;

    #[tokio::test]
    async fn test_create_item_round_trip() {
        let db = setup_db().await;

        let created = create_item(&db, NewItem::named("Widget")).await.unwrap();
        let fetched = get_item(&db, created.id).await.unwrap();

        assert_eq!(fetched.name, "Widget");
        assert_eq!(fetched.status, item::DEFAULT_STATUS);
        assert!(fetched.created_at <= Utc::now());
    }

    #[tokio::test]
    async fn test_create_item_requires_name() {
        let db = setup_db().await;

        let err = create_item(&db, NewItem::named("")).await.unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[tokio::test]
    async fn test_create_item_keeps_given_status() {
        let db = setup_db().await;

        let item = create_item(
            &db,
            NewItem {
                status: Some("discontinued".to_string()),
                ..NewItem::named("Fax machine")
            },
        )
        .await
        .unwrap();
        assert_eq!(item.status, "discontinued");
    }

    #[tokio::test]
    async fn test_list_items_newest_first() {
        let db = setup_db().await;
        let now = Utc::now();

        for (name, age_days) in [("Old", 3), ("Newest", 0), ("Middle", 1)] {
            create_item(
                &db,
                NewItem {
                    created_at: Some(now - Duration::days(age_days)),
                    ..NewItem::named(name)
                },
            )
            .await
            .unwrap();
        }

        let names: Vec<String> = list_items(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.name)
            .collect();
        assert_eq!(names, vec!["Newest", "Middle", "Old"]);
    }

    #[tokio::test]
    async fn test_update_item() {
        let db = setup_db().await;
        let item = create_item(&db, NewItem::named("Lamp")).await.unwrap();

        let updated = update_item(
            &db,
            item.id,
            ItemChanges {
                name: Some("Desk Lamp".to_string()),
                status: Some("sold_out".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Desk Lamp");
        assert_eq!(updated.status, "sold_out");
        assert_eq!(updated.created_at, item.created_at);

        let empty = ItemChanges {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(update_item(&db, item.id, empty).await.unwrap_err().is_constraint_violation());
        assert!(update_item(&db, 99, ItemChanges::default()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_item() {
        let db = setup_db().await;
        let item = create_item(&db, NewItem::named("Lamp")).await.unwrap();

        delete_item(&db, item.id).await.unwrap();
        assert!(get_item(&db, item.id).await.unwrap_err().is_not_found());
        assert!(delete_item(&db, item.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_find_item_by_name() {
        let db = setup_db().await;
        let lamp = create_item(&db, NewItem::named("Lamp")).await.unwrap();

        assert_eq!(find_item_by_name(&db, "Lamp").await.unwrap(), Some(lamp));
        assert_eq!(find_item_by_name(&db, "Sofa").await.unwrap(), None);
    }
}
