//! Demo data for local runs.

use common::{Caller, Money, OrderId, ProductId, UserId};
use domain::{Address, InvoiceStatus, PaymentInfo, PaymentMethod, Product, ProductUpdate};
use fulfillment::{CheckoutRequest, Result};
use graph::{InteractionAction, UserProfile};

use crate::Storefront;

/// What the seeding run created.
#[derive(Debug, Clone, Default)]
pub struct SeedSummary {
    pub products: Vec<ProductId>,
    pub customers: Vec<UserId>,
    pub orders: Vec<OrderId>,
}

fn catalog() -> [Product; 5] {
    [
        ("LAP-001", "Laptop Pro 14", "electronics", 129_900, 25),
        ("PHN-001", "Phone X", "electronics", 79_900, 40),
        ("HPH-001", "Noise Cancelling Headphones", "electronics", 24_900, 60),
        ("MUG-001", "Ceramic Mug", "home", 1_500, 200),
        ("LMP-001", "Desk Lamp", "home", 4_500, 80),
    ]
    .map(|(sku, name, category, cents, stock)| {
        Product::new(sku, name, Money::from_cents(cents), stock).with_category(category)
    })
}

fn checkout_request(tx: &str) -> CheckoutRequest {
    CheckoutRequest {
        payment: PaymentInfo::new(PaymentMethod::CreditCard, tx),
        shipping_address: Address {
            street: "1 Market St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip_code: "62701".to_string(),
            country: "US".to_string(),
        },
    }
}

/// Populates the catalog, two customers with browsing history, orders,
/// invoices and a couple of price changes, then logs what the graph
/// makes of it.
#[tracing::instrument(skip(store))]
pub async fn seed_demo_data(store: &Storefront) -> Result<SeedSummary> {
    let admin = Caller::admin(UserId::new());
    let mut summary = SeedSummary::default();

    let products = catalog();
    let ids = products.each_ref().map(|p| p.id.clone());
    for product in products {
        store.catalog.create_product(admin, product).await?;
    }
    summary.products = ids.to_vec();
    let [laptop, phone, headphones, mug, lamp] = ids;

    let alice = UserId::new();
    let bob = UserId::new();
    store
        .graph
        .register_user(UserProfile::new(alice, "alice@example.com", "Alice", "Doe"))
        .await?;
    store
        .graph
        .register_user(UserProfile::new(bob, "bob@example.com", "Bob", "Roe"))
        .await?;
    summary.customers = vec![alice, bob];
    let (alice, bob) = (Caller::customer(alice), Caller::customer(bob));

    for id in [&laptop, &phone, &headphones] {
        store
            .catalog
            .record_interaction(alice, id, InteractionAction::View)
            .await?;
    }
    store
        .catalog
        .record_interaction(bob, &laptop, InteractionAction::View)
        .await?;
    store
        .catalog
        .record_interaction(bob, &mug, InteractionAction::Click)
        .await?;

    store.carts.add_to_cart(alice, &laptop, 1).await?;
    store.carts.add_to_cart(alice, &headphones, 1).await?;
    let first = store.checkout.checkout(alice, checkout_request("tx-demo-1")).await?;
    summary.orders.push(first.order.id);

    store.carts.add_to_cart(bob, &mug, 4).await?;
    store.carts.add_to_cart(bob, &lamp, 1).await?;
    let second = store.checkout.checkout(bob, checkout_request("tx-demo-2")).await?;
    summary.orders.push(second.order.id);

    let invoice = store.invoices.create_invoice(alice, first.order.id).await?;
    store
        .invoices
        .update_invoice_status(admin, invoice.id, InvoiceStatus::Paid)
        .await?;
    store.invoices.create_invoice(bob, second.order.id).await?;

    store
        .catalog
        .update_product(admin, &phone, ProductUpdate::price(Money::from_cents(74_900)))
        .await?;
    store
        .catalog
        .update_product(admin, &phone, ProductUpdate::price(Money::from_cents(69_900)))
        .await?;

    for caller in [alice, bob] {
        let recommendations = store.graph.recommend(caller.user_id, 3).await?;
        let segment = store
            .graph
            .user(caller.user_id)
            .await?
            .map(|node| node.category);
        tracing::info!(
            user_id = %caller.user_id,
            segment = ?segment,
            recommendations = ?recommendations
                .iter()
                .map(|r| r.product_id.as_str())
                .collect::<Vec<_>>(),
            "demo user"
        );
    }
    let analytics = store.catalog.price_analytics(admin, &phone, None).await?;
    tracing::info!(
        product_id = %phone,
        average = %analytics.average_price,
        changes = analytics.volatility.changes,
        "demo price analytics"
    );

    Ok(summary)
}
