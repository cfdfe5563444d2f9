//! Integration tests for checkout, invoicing and catalog auditing over the
//! in-memory stores.

use std::time::Duration;

use audit_store::{
    CacheAside, ChangeType, InMemoryAuditStore, InvoiceOperationKind, ResilientAuditClient,
    RetryPolicy,
};
use cart::CartStore;
use chrono::Utc;
use common::{Caller, ErrorKind, Money, ProductId, UserId};
use domain::{
    CatalogStore, InMemoryCatalogStore, InMemoryInvoiceStore, InMemoryOrderStore, Invoice,
    InvoiceNumber, InvoiceStatus, InvoiceStore, OrderStore, PaymentInfo, PaymentMethod, Product,
    ProductUpdate,
};
use fulfillment::{
    CartCoordinator, CatalogService, CheckoutCoordinator, CheckoutRequest, FulfillmentError,
    FulfillmentState, InvoiceRecorder, steps,
};
use graph::{GraphService, InMemoryInteractionGraph, InteractionAction, Segment};
use kv_store::InMemoryKeyValueStore;

type Audit = ResilientAuditClient<InMemoryAuditStore, InMemoryKeyValueStore>;

struct TestHarness {
    catalog: InMemoryCatalogStore,
    orders: InMemoryOrderStore,
    kv: InMemoryKeyValueStore,
    graph: InMemoryInteractionGraph,
    audit_store: InMemoryAuditStore,
    invoice_store: InMemoryInvoiceStore,
    carts: CartCoordinator<InMemoryCatalogStore, InMemoryKeyValueStore, InMemoryInteractionGraph>,
    checkout: CheckoutCoordinator<
        InMemoryCatalogStore,
        InMemoryOrderStore,
        InMemoryKeyValueStore,
        InMemoryInteractionGraph,
    >,
    invoices: InvoiceRecorder<
        InMemoryOrderStore,
        InMemoryInvoiceStore,
        InMemoryAuditStore,
        InMemoryKeyValueStore,
        InMemoryInteractionGraph,
    >,
    products: CatalogService<
        InMemoryCatalogStore,
        InMemoryAuditStore,
        InMemoryKeyValueStore,
        InMemoryInteractionGraph,
    >,
    admin: Caller,
}

impl TestHarness {
    fn new() -> Self {
        let catalog = InMemoryCatalogStore::new();
        let orders = InMemoryOrderStore::new();
        let kv = InMemoryKeyValueStore::new();
        let graph = InMemoryInteractionGraph::new();
        let audit_store = InMemoryAuditStore::new();
        let invoice_store = InMemoryInvoiceStore::new();
        let graph_service = GraphService::new(graph.clone());
        let audit: Audit = ResilientAuditClient::with_cache(
            audit_store.clone(),
            CacheAside::new(kv.clone()),
            RetryPolicy::fixed(2, Duration::from_millis(1)),
        );

        Self {
            carts: CartCoordinator::new(
                catalog.clone(),
                CartStore::new(kv.clone()),
                graph_service.clone(),
            ),
            checkout: CheckoutCoordinator::new(
                catalog.clone(),
                orders.clone(),
                CartStore::new(kv.clone()),
                graph_service.clone(),
            ),
            invoices: InvoiceRecorder::new(
                orders.clone(),
                invoice_store.clone(),
                audit.clone(),
                graph_service.clone(),
            ),
            products: CatalogService::new(catalog.clone(), audit, graph_service),
            catalog,
            orders,
            kv,
            graph,
            audit_store,
            invoice_store,
            admin: Caller::admin(UserId::new()),
        }
    }

    async fn stock(&self, sku: &str, name: &str, cents: i64, stock: u32) -> ProductId {
        let product = Product::new(sku, name, Money::from_cents(cents), stock);
        let id = product.id.clone();
        self.catalog.insert(product).await.unwrap();
        id
    }

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            payment: PaymentInfo::new(PaymentMethod::CreditCard, "tx-1"),
            ..CheckoutRequest::default()
        }
    }
}

#[tokio::test]
async fn test_happy_path_checkout() {
    let h = TestHarness::new();
    let widget = h.stock("SKU-001", "Widget", 1000, 5).await;
    let gadget = h.stock("SKU-002", "Gadget", 2500, 2).await;
    let buyer = Caller::customer(UserId::new());

    h.carts.add_to_cart(buyer, &widget, 2).await.unwrap();
    h.carts.add_to_cart(buyer, &gadget, 1).await.unwrap();
    let outcome = h.checkout.checkout(buyer, TestHarness::request()).await.unwrap();

    assert_eq!(outcome.order.total(), Money::from_cents(4500));
    assert_eq!(outcome.order.user_id, buyer.user_id);
    assert_eq!(outcome.progress.state, FulfillmentState::Completed);
    assert_eq!(outcome.progress.completed_steps, steps::ALL_STEPS.to_vec());
    assert!(outcome.progress.degraded_steps.is_empty());
    assert_eq!(outcome.segment, Some(Segment::Low));

    assert_eq!(h.catalog.stock_of(&widget).await, Some(3));
    assert_eq!(h.catalog.stock_of(&gadget).await, Some(1));
    assert!(h.carts.view_cart(buyer).await.unwrap().is_empty());
    assert!(h.orders.find(outcome.order.id).await.unwrap().is_some());
    assert_eq!(h.graph.order_edges(buyer.user_id).await.len(), 1);
}

#[tokio::test]
async fn test_repeat_buyer_moves_up_a_segment() {
    let h = TestHarness::new();
    let widget = h.stock("SKU-001", "Widget", 1000, 100).await;
    let buyer = Caller::customer(UserId::new());

    let mut last = None;
    for _ in 0..5 {
        h.carts.add_to_cart(buyer, &widget, 1).await.unwrap();
        last = h.checkout.checkout(buyer, TestHarness::request()).await.unwrap().segment;
    }

    assert_eq!(last, Some(Segment::Medium));
    let node = GraphService::new(h.graph.clone())
        .user(buyer.user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(node.category, Segment::Medium);
    assert_eq!(node.total_orders, 5);
}

#[tokio::test]
async fn test_empty_cart_mutates_nothing() {
    let h = TestHarness::new();
    let widget = h.stock("SKU-001", "Widget", 1000, 5).await;
    let buyer = Caller::customer(UserId::new());

    let err = h.checkout.checkout(buyer, TestHarness::request()).await.unwrap_err();

    assert!(matches!(err, FulfillmentError::EmptyCart));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.catalog.stock_of(&widget).await, Some(5));
    assert!(h.orders.is_empty().await);
}

#[tokio::test]
async fn test_second_line_short_leaves_first_line_reserved() {
    let h = TestHarness::new();
    let widget = h.stock("SKU-001", "Widget", 1000, 5).await;
    let gadget = h.stock("SKU-002", "Gadget", 2500, 3).await;
    let buyer = Caller::customer(UserId::new());

    h.carts.add_to_cart(buyer, &widget, 2).await.unwrap();
    h.carts.add_to_cart(buyer, &gadget, 3).await.unwrap();
    // Someone else buys a gadget between add and checkout.
    h.catalog.decrement_stock(&gadget, 1).await.unwrap();

    let err = h.checkout.checkout(buyer, TestHarness::request()).await.unwrap_err();

    match err {
        FulfillmentError::InsufficientStock {
            product_id,
            name,
            requested,
            available,
        } => {
            assert_eq!(product_id, gadget);
            assert_eq!(name, "Gadget");
            assert_eq!(requested, 3);
            assert_eq!(available, 2);
        }
        other => panic!("expected insufficient stock, got {other:?}"),
    }
    assert_eq!(h.catalog.stock_of(&widget).await, Some(3));
    assert_eq!(h.catalog.stock_of(&gadget).await, Some(2));
    assert!(h.orders.is_empty().await);
    assert_eq!(h.carts.view_cart(buyer).await.unwrap().items().len(), 2);
}

#[tokio::test]
async fn test_product_removed_before_checkout_keeps_earlier_reservation() {
    let h = TestHarness::new();
    let widget = h.stock("SKU-001", "Widget", 1000, 5).await;
    let gadget = h.stock("SKU-002", "Gadget", 2500, 3).await;
    let buyer = Caller::customer(UserId::new());

    h.carts.add_to_cart(buyer, &widget, 2).await.unwrap();
    h.carts.add_to_cart(buyer, &gadget, 1).await.unwrap();
    assert!(h.catalog.delete(&gadget).await.unwrap());

    let err = h.checkout.checkout(buyer, TestHarness::request()).await.unwrap_err();

    match err {
        FulfillmentError::ProductNotFound(product_id) => assert_eq!(product_id, gadget),
        other => panic!("expected product not found, got {other:?}"),
    }
    assert_eq!(h.catalog.stock_of(&widget).await, Some(3));
    assert!(h.orders.is_empty().await);
    assert_eq!(h.carts.view_cart(buyer).await.unwrap().items().len(), 2);
}

#[tokio::test]
async fn test_order_save_failure_reports_step() {
    let h = TestHarness::new();
    let widget = h.stock("SKU-001", "Widget", 1000, 5).await;
    let buyer = Caller::customer(UserId::new());
    h.carts.add_to_cart(buyer, &widget, 1).await.unwrap();
    h.orders.set_fail_on_save(true).await;

    let err = h.checkout.checkout(buyer, TestHarness::request()).await.unwrap_err();

    assert!(matches!(
        err,
        FulfillmentError::StepFailed {
            step: steps::STEP_PERSIST_ORDER,
            ..
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Internal);
    // Stock is not returned.
    assert_eq!(h.catalog.stock_of(&widget).await, Some(4));
    assert!(!h.carts.view_cart(buyer).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_graph_outage_degrades_but_completes() {
    let h = TestHarness::new();
    let widget = h.stock("SKU-001", "Widget", 1000, 5).await;
    let buyer = Caller::customer(UserId::new());
    h.carts.add_to_cart(buyer, &widget, 1).await.unwrap();
    h.graph.fail_next(1);

    let outcome = h.checkout.checkout(buyer, TestHarness::request()).await.unwrap();

    assert_eq!(outcome.progress.state, FulfillmentState::Completed);
    assert_eq!(outcome.progress.degraded_steps, vec![steps::STEP_RECORD_GRAPH]);
    assert!(h.graph.order_edges(buyer.user_id).await.is_empty());
    assert!(h.carts.view_cart(buyer).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_segment_write_failure_degrades() {
    let h = TestHarness::new();
    let widget = h.stock("SKU-001", "Widget", 1000, 5).await;
    let buyer = Caller::customer(UserId::new());
    h.carts.add_to_cart(buyer, &widget, 1).await.unwrap();
    h.graph.set_fail_on_segment_write(true);

    let outcome = h.checkout.checkout(buyer, TestHarness::request()).await.unwrap();

    assert_eq!(outcome.segment, None);
    assert_eq!(outcome.progress.degraded_steps, vec![steps::STEP_REFRESH_SEGMENT]);
}

#[tokio::test]
async fn test_invoice_once_per_order() {
    let h = TestHarness::new();
    let widget = h.stock("SKU-001", "Widget", 10000, 5).await;
    let buyer = Caller::customer(UserId::new());
    h.carts.add_to_cart(buyer, &widget, 1).await.unwrap();
    let order = h.checkout.checkout(buyer, TestHarness::request()).await.unwrap().order;

    let invoice = h.invoices.create_invoice(buyer, order.id).await.unwrap();
    assert_eq!(invoice.subtotal(), Money::from_cents(10000));
    assert_eq!(invoice.tax(), Money::from_cents(2100));
    assert_eq!(invoice.total(), Money::from_cents(12100));
    assert!(invoice.number.as_str().starts_with("INV-"));
    assert!(invoice.number.as_str().ends_with("-000001"));

    let err = h.invoices.create_invoice(buyer, order.id).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::InvoiceExists(id) if id == order.id));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    assert_eq!(h.graph.invoice_edges(buyer.user_id).await.len(), 1);
    let trail = h.invoices.invoice_history(buyer, invoice.id).await.unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].operation, InvoiceOperationKind::Create);
    assert_eq!(trail[0].status, "pending");
}

#[tokio::test]
async fn test_invoice_number_clash_moves_to_next_sequence() {
    let h = TestHarness::new();
    let widget = h.stock("SKU-001", "Widget", 1000, 5).await;
    let first = Caller::customer(UserId::new());
    let second = Caller::customer(UserId::new());
    h.carts.add_to_cart(first, &widget, 1).await.unwrap();
    let first_order = h.checkout.checkout(first, TestHarness::request()).await.unwrap().order;
    h.carts.add_to_cart(second, &widget, 1).await.unwrap();
    let second_order = h.checkout.checkout(second, TestHarness::request()).await.unwrap().order;

    // A concurrent writer already took the number the next count would yield.
    let taken = Invoice::for_order(&second_order, InvoiceNumber::sequential(Utc::now(), 2));
    h.invoice_store.insert(taken).await.unwrap();

    let invoice = h.invoices.create_invoice(first, first_order.id).await.unwrap();

    assert!(invoice.number.as_str().ends_with("-000003"));
    assert_eq!(h.invoice_store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_invoice_access_and_status_changes() {
    let h = TestHarness::new();
    let widget = h.stock("SKU-001", "Widget", 1000, 5).await;
    let buyer = Caller::customer(UserId::new());
    let stranger = Caller::customer(UserId::new());
    h.carts.add_to_cart(buyer, &widget, 1).await.unwrap();
    let order = h.checkout.checkout(buyer, TestHarness::request()).await.unwrap().order;

    let denied = h.invoices.create_invoice(stranger, order.id).await.unwrap_err();
    assert_eq!(denied.kind(), ErrorKind::Forbidden);

    let invoice = h.invoices.create_invoice(buyer, order.id).await.unwrap();
    assert_eq!(
        h.invoices.invoice(stranger, invoice.id).await.unwrap_err().kind(),
        ErrorKind::Forbidden
    );
    assert_eq!(
        h.invoices
            .update_invoice_status(buyer, invoice.id, InvoiceStatus::Paid)
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::Forbidden
    );

    let paid = h
        .invoices
        .update_invoice_status(h.admin, invoice.id, InvoiceStatus::Paid)
        .await
        .unwrap();
    assert_eq!(paid.status, InvoiceStatus::Paid);
    assert!(paid.payment_date.is_some());

    let trail = h.invoices.invoice_history(h.admin, invoice.id).await.unwrap();
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].operation, InvoiceOperationKind::UpdateStatus);
    assert_eq!(trail[0].user_id, h.admin.user_id);
}

#[tokio::test]
async fn test_invoice_survives_audit_outage() {
    let h = TestHarness::new();
    let widget = h.stock("SKU-001", "Widget", 1000, 5).await;
    let buyer = Caller::customer(UserId::new());
    h.carts.add_to_cart(buyer, &widget, 1).await.unwrap();
    let order = h.checkout.checkout(buyer, TestHarness::request()).await.unwrap().order;
    h.audit_store.fail_next(10);

    let invoice = h.invoices.create_invoice(buyer, order.id).await;

    assert!(invoice.is_ok());
}

#[tokio::test]
async fn test_catalog_mutations_are_audited() {
    let h = TestHarness::new();
    let product = Product::new("SKU-100", "Lamp", Money::from_cents(4000), 10)
        .with_category("lighting");

    let created = h.products.create_product(h.admin, product).await.unwrap();
    h.products
        .update_product(h.admin, &created.id, ProductUpdate::price(Money::from_cents(5000)))
        .await
        .unwrap();
    h.products
        .update_product(h.admin, &created.id, ProductUpdate::stock(3))
        .await
        .unwrap();

    let details = h.products.product_details(&created.id).await.unwrap();
    assert_eq!(details.product.price, Money::from_cents(5000));
    assert_eq!(details.product.stock, 3);
    assert_eq!(details.price_history.len(), 2);
    assert_eq!(details.price_history[0].price, Money::from_cents(5000));
    let kinds: Vec<ChangeType> = details.changes.iter().map(|c| c.change_type).collect();
    assert_eq!(kinds, vec![ChangeType::Update, ChangeType::Update, ChangeType::Create]);

    let analytics = h
        .products
        .price_analytics(h.admin, &created.id, None)
        .await
        .unwrap();
    assert_eq!(analytics.average_price, Money::from_cents(4500));

    h.products.delete_product(h.admin, &created.id).await.unwrap();
    assert!(h.catalog.get(&created.id).await.unwrap().is_none());
    let changes = h.products.audit().product_changes(&created.id).await.unwrap();
    assert_eq!(changes[0].change_type, ChangeType::Delete);
    assert_eq!(changes[0].new_value, "");
}

#[tokio::test]
async fn test_default_analytics_window_is_served_from_cache() {
    let h = TestHarness::new();
    let id = h.stock("SKU-001", "Widget", 1000, 5).await;
    h.products
        .update_product(h.admin, &id, ProductUpdate::price(Money::from_cents(1200)))
        .await
        .unwrap();

    let first = h.products.price_analytics(h.admin, &id, None).await.unwrap();
    let reads = h.audit_store.read_count();
    let second = h.products.price_analytics(h.admin, &id, None).await.unwrap();

    assert_eq!(h.audit_store.read_count(), reads);
    assert_eq!(first.window, second.window);
    assert_eq!(first.volatility, second.volatility);
}

#[tokio::test]
async fn test_failed_delete_is_not_audited() {
    let h = TestHarness::new();
    let product = Product::new("SKU-100", "Lamp", Money::from_cents(4000), 10);
    let created = h.products.create_product(h.admin, product).await.unwrap();
    h.catalog.set_fail_on_save(true).await;

    let err = h.products.delete_product(h.admin, &created.id).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
    let changes = h.products.audit().product_changes(&created.id).await.unwrap();
    assert!(changes.iter().all(|c| c.change_type != ChangeType::Delete));
}

#[tokio::test]
async fn test_catalog_writes_require_admin() {
    let h = TestHarness::new();
    let customer = Caller::customer(UserId::new());
    let product = Product::new("SKU-100", "Lamp", Money::from_cents(4000), 10);

    let err = h.products.create_product(customer, product).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert!(h.catalog.list().await.unwrap().is_empty());
    assert_eq!(h.audit_store.row_count().await, 0);
}

#[tokio::test]
async fn test_product_details_degrade_when_audit_is_down() {
    let h = TestHarness::new();
    let id = h.stock("SKU-001", "Widget", 1000, 5).await;
    h.audit_store.fail_next(10);

    let details = h.products.product_details(&id).await.unwrap();

    assert_eq!(details.product.id, id);
    assert!(details.price_history.is_empty());
    assert!(details.changes.is_empty());
}

#[tokio::test]
async fn test_add_to_cart_ranks_above_view() {
    let h = TestHarness::new();
    let anchor = h.stock("SKU-A", "Anchor", 100, 50).await;
    let carted = h.stock("SKU-C", "Carted", 100, 50).await;
    let viewed = h.stock("SKU-V", "Viewed", 100, 50).await;
    let me = Caller::customer(UserId::new());
    let peer = Caller::customer(UserId::new());

    h.products
        .record_interaction(me, &anchor, InteractionAction::View)
        .await
        .unwrap();
    h.products
        .record_interaction(peer, &anchor, InteractionAction::View)
        .await
        .unwrap();
    h.carts.add_to_cart(peer, &carted, 1).await.unwrap();
    h.products
        .record_interaction(peer, &viewed, InteractionAction::View)
        .await
        .unwrap();

    let recs = GraphService::new(h.graph.clone())
        .recommend(me.user_id, 10)
        .await
        .unwrap();

    let ids: Vec<&ProductId> = recs.iter().map(|r| &r.product_id).collect();
    assert_eq!(ids, vec![&carted, &viewed]);
    assert!(recs[0].score > recs[1].score);
    assert_eq!(recs[0].name.as_deref(), Some("Carted"));
}

#[tokio::test]
async fn test_cart_add_rejects_unknown_and_short_products() {
    let h = TestHarness::new();
    let widget = h.stock("SKU-001", "Widget", 1000, 1).await;
    let buyer = Caller::customer(UserId::new());

    let unknown = h
        .carts
        .add_to_cart(buyer, &ProductId::new("nope"), 1)
        .await
        .unwrap_err();
    assert!(matches!(unknown, FulfillmentError::ProductNotFound(_)));

    let short = h.carts.add_to_cart(buyer, &widget, 2).await.unwrap_err();
    assert_eq!(short.kind(), ErrorKind::InsufficientStock);

    let zero = h.carts.add_to_cart(buyer, &widget, 0).await.unwrap_err();
    assert_eq!(zero.kind(), ErrorKind::Validation);
    assert!(h.carts.view_cart(buyer).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cart_store_outage_surfaces_on_checkout() {
    let h = TestHarness::new();
    let widget = h.stock("SKU-001", "Widget", 1000, 5).await;
    let buyer = Caller::customer(UserId::new());
    h.carts.add_to_cart(buyer, &widget, 1).await.unwrap();
    h.kv.fail_next(1);

    let err = h.checkout.checkout(buyer, TestHarness::request()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
    assert_eq!(h.catalog.stock_of(&widget).await, Some(5));
}
