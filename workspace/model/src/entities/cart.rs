use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Status given to carts created without one.
pub const DEFAULT_STATUS: &str = "open";
/// Status a cart is moved to once it has been turned into an order.
pub const CHECKED_OUT_STATUS: &str = "checked_out";

/// A user's shopping cart.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "carts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// The owning user.
    pub user_id: i32,
    pub name: String,
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItem,
    /// Orders placed from this cart.
    #[sea_orm(has_many = "super::order::Entity")]
    Order,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItem.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        super::cart_item::Relation::Item.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::cart_item::Relation::Cart.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
