use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Represents a shopper.
///
/// `password` is write-only: it is persisted but never part of any
/// serialized representation. `token` is left out of the output while unset.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Session token handed out by the auth layer.
    #[serde(skip_serializing_if = "token_is_unset")]
    pub token: Option<String>,
    /// The user's active cart. There is no storage-level foreign key here
    /// (it would be circular with `carts.user_id`), the store checks it.
    pub cart_id: Option<i32>,
    pub created_at: DateTimeUtc,
}

fn token_is_unset(token: &Option<String>) -> bool {
    token.as_deref().is_none_or(str::is_empty)
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Every cart the user ever owned, the active one included.
    #[sea_orm(has_many = "super::cart::Entity")]
    Cart,
    #[sea_orm(has_many = "super::order::Entity")]
    Order,
}

impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cart.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
