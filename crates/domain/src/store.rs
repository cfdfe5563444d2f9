//! Document-store collaborators.

use async_trait::async_trait;
use common::{InvoiceId, OrderId, ProductId, UserId};

use crate::{Invoice, Order, OrderStatus, Product, Result};

/// Catalog persistence.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get(&self, id: &ProductId) -> Result<Option<Product>>;

    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>>;

    async fn list(&self) -> Result<Vec<Product>>;

    /// Inserts a new product. Fails with `DuplicateSku` if the SKU is taken.
    async fn insert(&self, product: Product) -> Result<()>;

    /// Replaces an existing product.
    async fn save(&self, product: Product) -> Result<()>;

    /// Removes a product, returning whether it existed.
    async fn delete(&self, id: &ProductId) -> Result<bool>;

    /// Takes `quantity` units if at least that many are in stock.
    ///
    /// The check and the decrement happen as one step, so two callers can
    /// never both take the last unit. Returns the product after the
    /// decrement.
    async fn decrement_stock(&self, id: &ProductId, quantity: u32) -> Result<Product>;
}

/// Filter applied when listing orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub user_id: Option<UserId>,
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.is_none_or(|u| u == order.user_id)
            && self.status.is_none_or(|s| s == order.status)
    }
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts or replaces an order.
    async fn save(&self, order: Order) -> Result<()>;

    async fn find(&self, id: OrderId) -> Result<Option<Order>>;

    /// Orders matching `filter`, newest first.
    async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>>;
}

/// Invoice persistence.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn count(&self) -> Result<u64>;

    /// Inserts a new invoice. Fails with `InvoiceExists` if the order already
    /// has one and `DuplicateInvoiceNumber` if the number is taken.
    async fn insert(&self, invoice: Invoice) -> Result<()>;

    /// Replaces an existing invoice.
    async fn save(&self, invoice: Invoice) -> Result<()>;

    async fn find(&self, id: InvoiceId) -> Result<Option<Invoice>>;

    async fn find_by_order(&self, order_id: OrderId) -> Result<Option<Invoice>>;
}
