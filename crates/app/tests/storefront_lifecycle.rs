//! Startup, seeding and shutdown of the wired storefront.

use std::sync::Arc;
use std::time::Duration;

use app::{AppError, Config, ErrorResponse, Status, Storefront, seed_demo_data};
use audit_store::{AuditError, InMemoryAuditStore};
use common::{Caller, UserId};
use domain::OrderStatus;

fn test_config() -> Config {
    Config {
        audit_retry_attempts: 2,
        audit_retry_delay: Duration::from_millis(1),
        seed_demo_data: false,
        ..Config::default()
    }
}

#[tokio::test]
async fn test_init_without_database_uses_memory_store() {
    let storefront = Storefront::init(&test_config()).await.unwrap();

    let cart = storefront
        .carts
        .view_cart(Caller::customer(UserId::new()))
        .await
        .unwrap();
    assert!(cart.is_empty());

    storefront.shutdown().await;
}

#[tokio::test]
async fn test_invalid_namespace_rejected_before_connecting() {
    let config = Config {
        audit_namespace: "bad-name; drop".to_string(),
        ..test_config()
    };

    let result = Storefront::init(&config).await;

    assert!(matches!(
        result,
        Err(AppError::Audit(AuditError::InvalidNamespace(_)))
    ));
}

#[tokio::test]
async fn test_shutdown_closes_audit_store() {
    let audit = InMemoryAuditStore::new();
    let storefront = Storefront::with_audit_store(&test_config(), Arc::new(audit.clone()));

    storefront.shutdown().await;

    assert!(audit.is_closed());
}

#[tokio::test]
async fn test_demo_seed_populates_every_store() {
    let audit = InMemoryAuditStore::new();
    let storefront = Storefront::with_audit_store(&test_config(), Arc::new(audit.clone()));

    let summary = seed_demo_data(&storefront).await.unwrap();

    assert_eq!(summary.products.len(), 5);
    assert_eq!(summary.customers.len(), 2);
    assert_eq!(summary.orders.len(), 2);

    let admin = Caller::admin(UserId::new());
    let orders = storefront
        .orders
        .list_orders(admin, Some(OrderStatus::Pending), 1, 10)
        .await
        .unwrap();
    assert_eq!(orders.total, 2);

    let first = storefront
        .invoices
        .invoice_for_order(admin, summary.orders[0])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.status, domain::InvoiceStatus::Paid);

    let phone = storefront.catalog.product_details(&summary.products[1]).await.unwrap();
    assert_eq!(phone.price_history.len(), 3);
    assert!(audit.row_count().await > 0);

    let alice = storefront.graph.user(summary.customers[0]).await.unwrap().unwrap();
    assert_eq!(alice.total_orders, 1);
    assert_eq!(alice.profile.email, "alice@example.com");
}

#[tokio::test]
async fn test_errors_map_to_public_responses() {
    let storefront = Storefront::with_audit_store(&test_config(), Arc::new(InMemoryAuditStore::new()));
    let customer = Caller::customer(UserId::new());

    let err = storefront
        .checkout
        .checkout(customer, Default::default())
        .await
        .unwrap_err();
    let response = ErrorResponse::for_caller(&err, customer);

    assert_eq!(response.status, Status::BadRequest);
    assert_eq!(response.error, "Cart is empty");
}
