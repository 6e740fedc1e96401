//! The canonical walk through the data model: one user, one cart, one item.

use model::entities::item;

use crate::carts::{NewCart, create_cart};
use crate::items::{NewItem, create_item};
use crate::testing::{new_user, setup_db};
use crate::users::create_user;
use crate::{add_item_to_cart, list_items_in_cart};

#[tokio::test]
async fn test_scenario_alice_book() {
    let db = setup_db().await;

    let alice = create_user(&db, new_user("alice", "secret")).await.unwrap();
    assert_eq!(alice.id, 1);

    let cart = create_cart(
        &db,
        NewCart {
            user_id: alice.id,
            name: "alice's cart".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(cart.id, 1);

    let book = create_item(&db, NewItem::named("Book")).await.unwrap();
    assert_eq!(book.id, 1);

    add_item_to_cart(&db, 1, 1).await.unwrap();

    let items: Vec<item::Model> = list_items_in_cart(&db, 1).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, 1);
    assert_eq!(items[0].name, "Book");

    let again = add_item_to_cart(&db, 1, 1).await.unwrap_err();
    assert!(again.is_constraint_violation());
}

#[tokio::test]
async fn test_scenario_serialized_user_hides_password() {
    let db = setup_db().await;

    for (username, password) in [("alice", "secret"), ("bob", "correct horse"), ("carol", "pa55")] {
        let user = create_user(&db, new_user(username, password)).await.unwrap();
        let json = serde_json::to_string(&user).unwrap();

        assert!(!json.contains(password), "password leaked for {username}: {json}");
        assert!(json.contains(username));
    }
}
