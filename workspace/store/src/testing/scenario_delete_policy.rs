//! Deleting users cascades, deleting carts and items is restricted by
//! dependents. The outcome must not depend on how often it is run.

use model::entities::{cart, cart_item, order};
use sea_orm::{DatabaseConnection, EntityTrait};

use crate::carts::{NewCart, create_cart, delete_cart};
use crate::items::{NewItem, create_item, get_item};
use crate::orders::checkout;
use crate::testing::{new_user, setup_db};
use crate::users::{create_user, delete_user, get_user, list_users, register_user};
use crate::{add_item_to_cart, list_items_in_cart};

async fn count_rows(db: &DatabaseConnection) -> (usize, usize, usize) {
    (
        cart::Entity::find().all(db).await.unwrap().len(),
        cart_item::Entity::find().all(db).await.unwrap().len(),
        order::Entity::find().all(db).await.unwrap().len(),
    )
}

#[tokio::test]
async fn test_delete_user_cascades_to_carts_and_orders() {
    for _run in 0..3 {
        let db = setup_db().await;

        let (alice, cart) = register_user(&db, new_user("alice", "pw")).await.unwrap();
        let (bob, bob_cart) = register_user(&db, new_user("bob", "pw")).await.unwrap();
        let lamp = create_item(&db, NewItem::named("Desk Lamp")).await.unwrap();

        add_item_to_cart(&db, cart.id, lamp.id).await.unwrap();
        add_item_to_cart(&db, bob_cart.id, lamp.id).await.unwrap();
        checkout(&db, alice.id).await.unwrap();

        // alice: checked-out cart + fresh cart, one link, one order; bob: one cart, one link
        assert_eq!(count_rows(&db).await, (3, 2, 1));

        delete_user(&db, alice.id).await.unwrap();

        assert!(get_user(&db, alice.id).await.unwrap_err().is_not_found());
        assert_eq!(count_rows(&db).await, (1, 1, 0));

        // Other users and the catalog are untouched
        assert_eq!(list_users(&db).await.unwrap(), vec![get_user(&db, bob.id).await.unwrap()]);
        assert_eq!(list_items_in_cart(&db, bob_cart.id).await.unwrap(), vec![lamp.clone()]);
        assert_eq!(get_item(&db, lamp.id).await.unwrap(), lamp);
    }
}

#[tokio::test]
async fn test_delete_user_with_plain_cart() {
    let db = setup_db().await;
    let user = create_user(&db, new_user("dave", "pw")).await.unwrap();
    create_cart(
        &db,
        NewCart {
            user_id: user.id,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    delete_user(&db, user.id).await.unwrap();
    assert_eq!(count_rows(&db).await, (0, 0, 0));
}

#[tokio::test]
async fn test_ordered_cart_is_restricted_until_its_owner_goes() {
    let db = setup_db().await;
    let (alice, cart) = register_user(&db, new_user("alice", "pw")).await.unwrap();
    let book = create_item(&db, NewItem::named("Book")).await.unwrap();
    add_item_to_cart(&db, cart.id, book.id).await.unwrap();
    checkout(&db, alice.id).await.unwrap();

    for _ in 0..2 {
        let err = delete_cart(&db, cart.id).await.unwrap_err();
        assert!(err.is_constraint_violation());
    }

    delete_user(&db, alice.id).await.unwrap();
    assert!(delete_cart(&db, cart.id).await.unwrap_err().is_not_found());
}
