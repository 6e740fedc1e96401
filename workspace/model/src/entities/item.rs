use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Status given to items created without one.
pub const DEFAULT_STATUS: &str = "available";

/// A product from the catalog that can be put into carts.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// Free-text state label, no transitions are enforced.
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItem,
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItem.def()
    }
}

// Many-to-many with carts through `cart_items`.
impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        super::cart_item::Relation::Cart.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::cart_item::Relation::Item.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
