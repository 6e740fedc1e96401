//! This file serves as the root for all SeaORM entity modules.
//! We define the data models for the shopping cart here: users, the item
//! catalog, carts, the cart-to-item join table and orders.

pub mod cart;
pub mod cart_item;
pub mod item;
pub mod order;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::cart::Entity as Cart;
    pub use super::cart_item::Entity as CartItem;
    pub use super::item::Entity as Item;
    pub use super::order::Entity as Order;
    pub use super::user::Entity as User;
}
