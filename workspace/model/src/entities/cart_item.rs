use super::{cart, item};
use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Join row linking one cart to one item. The pair is the identity.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "cart_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub cart_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "cart::Entity",
        from = "Column::CartId",
        to = "cart::Column::Id"
    )]
    Cart,
    #[sea_orm(belongs_to = "item::Entity", from = "Column::ItemId", to = "item::Column::Id")]
    Item,
}

impl Related<cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cart.def()
    }
}

impl Related<item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
