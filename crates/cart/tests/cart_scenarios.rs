//! Integration tests for cart history and revert across many mutations.

use cart::{CartError, CartItem, CartStore, DEFAULT_HISTORY_LIMIT};
use common::{Money, ProductId, UserId};
use kv_store::InMemoryKeyValueStore;

fn widget(qty: u32) -> CartItem {
    CartItem::new("SKU-001", qty, Money::from_cents(1000), "Widget")
}

fn gadget(qty: u32) -> CartItem {
    CartItem::new("SKU-002", qty, Money::from_cents(2500), "Gadget")
}

#[tokio::test]
async fn test_totals_hold_across_mixed_mutations() {
    let store = CartStore::new(InMemoryKeyValueStore::new());
    let user = UserId::new();

    store.add(user, widget(2)).await.unwrap();
    store.add(user, gadget(1)).await.unwrap();
    store.add(user, widget(1)).await.unwrap();
    let cart = store
        .remove(user, &ProductId::new("SKU-002"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(cart.total().cents(), 3000);
    for snapshot in store.history(user).await.unwrap() {
        let expected: i64 = snapshot
            .cart
            .items()
            .iter()
            .map(|i| i.unit_price.cents() * i64::from(i.quantity))
            .sum();
        assert_eq!(snapshot.cart.total().cents(), expected);
    }
}

#[tokio::test]
async fn test_revert_after_checkout_style_clear() {
    let store = CartStore::new(InMemoryKeyValueStore::new());
    let user = UserId::new();

    store.add(user, widget(1)).await.unwrap();
    store.add(user, gadget(3)).await.unwrap();
    store.clear(user).await.unwrap();

    let restored = store.revert_to(user, 1).await.unwrap();
    assert_eq!(restored.items().len(), 2);
    assert_eq!(restored.total().cents(), 1000 + 3 * 2500);
    assert_eq!(store.get(user).await.unwrap().unwrap(), restored);
}

#[tokio::test]
async fn test_history_never_exceeds_limit_and_reverts_stay_bounded() {
    let store = CartStore::new(InMemoryKeyValueStore::new());
    let user = UserId::new();

    for _ in 0..12 {
        store.add(user, widget(1)).await.unwrap();
    }
    for _ in 0..5 {
        store.revert_to(user, 0).await.unwrap();
        assert_eq!(store.history(user).await.unwrap().len(), DEFAULT_HISTORY_LIMIT);
    }

    let err = store
        .revert_to(user, DEFAULT_HISTORY_LIMIT)
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::SnapshotNotFound { .. }));
}

#[tokio::test]
async fn test_custom_history_limit() {
    let store = CartStore::with_history_limit(InMemoryKeyValueStore::new(), 3);
    let user = UserId::new();
    for qty in 1..=5 {
        store.add(user, widget(qty)).await.unwrap();
    }
    let history = store.history(user).await.unwrap();
    assert_eq!(history.len(), 3);
    // quantities accumulate: 1, 3, 6, 10, 15
    assert_eq!(history[0].cart.items()[0].quantity, 6);
}

#[tokio::test]
async fn test_users_are_isolated() {
    let store = CartStore::new(InMemoryKeyValueStore::new());
    let alice = UserId::new();
    let bob = UserId::new();

    store.add(alice, widget(1)).await.unwrap();
    assert!(store.get(bob).await.unwrap().is_none());
    assert!(store.history(bob).await.unwrap().is_empty());
}
