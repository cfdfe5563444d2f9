//! In-memory document-store collaborators for testing and local runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{InvoiceId, OrderId, ProductId};
use tokio::sync::RwLock;

use crate::{
    CatalogStore, DomainError, Invoice, InvoiceStore, Order, OrderFilter, OrderStore, Product,
    Result,
};

fn unavailable(what: &str) -> DomainError {
    DomainError::Unavailable(format!("injected {what} failure"))
}

#[derive(Debug, Default)]
struct CatalogState {
    products: HashMap<ProductId, Product>,
    fail_on_save: bool,
}

/// In-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogStore {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures inserts, saves and stock decrements to fail.
    pub async fn set_fail_on_save(&self, fail: bool) {
        self.state.write().await.fail_on_save = fail;
    }

    /// Returns the current stock of a product.
    pub async fn stock_of(&self, id: &ProductId) -> Option<u32> {
        self.state.read().await.products.get(id).map(|p| p.stock)
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn get(&self, id: &ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(id).cloned())
    }

    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>> {
        Ok(self
            .state
            .read()
            .await
            .products
            .values()
            .find(|p| p.sku == sku)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Product>> {
        let mut products: Vec<Product> =
            self.state.read().await.products.values().cloned().collect();
        products.sort_by(|a, b| a.sku.cmp(&b.sku));
        Ok(products)
    }

    async fn insert(&self, product: Product) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_save {
            return Err(unavailable("catalog insert"));
        }
        if state.products.values().any(|p| p.sku == product.sku) {
            return Err(DomainError::DuplicateSku(product.sku));
        }
        state.products.insert(product.id.clone(), product);
        Ok(())
    }

    async fn save(&self, product: Product) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_save {
            return Err(unavailable("catalog save"));
        }
        if !state.products.contains_key(&product.id) {
            return Err(DomainError::ProductNotFound(product.id));
        }
        state.products.insert(product.id.clone(), product);
        Ok(())
    }

    async fn delete(&self, id: &ProductId) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.fail_on_save {
            return Err(unavailable("catalog delete"));
        }
        Ok(state.products.remove(id).is_some())
    }

    async fn decrement_stock(&self, id: &ProductId, quantity: u32) -> Result<Product> {
        let mut state = self.state.write().await;
        if state.fail_on_save {
            return Err(unavailable("stock decrement"));
        }
        let product = state
            .products
            .get_mut(id)
            .ok_or_else(|| DomainError::ProductNotFound(id.clone()))?;
        if product.stock < quantity {
            return Err(DomainError::InsufficientStock {
                product_id: id.clone(),
                name: product.name.clone(),
                requested: quantity,
                available: product.stock,
            });
        }
        product.stock -= quantity;
        product.updated_at = chrono::Utc::now();
        Ok(product.clone())
    }
}

#[derive(Debug, Default)]
struct OrderState {
    orders: HashMap<OrderId, Order>,
    fail_on_save: bool,
}

/// In-memory order store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<OrderState>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail on save.
    pub async fn set_fail_on_save(&self, fail: bool) {
        self.state.write().await.fail_on_save = fail;
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.orders.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn save(&self, order: Order) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_save {
            return Err(unavailable("order save"));
        }
        state.orders.insert(order.id, order);
        Ok(())
    }

    async fn find(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .state
            .read()
            .await
            .orders
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}

#[derive(Debug, Default)]
struct InvoiceState {
    invoices: HashMap<InvoiceId, Invoice>,
    fail_on_save: bool,
}

/// In-memory invoice store. Enforces one invoice per order and unique numbers.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInvoiceStore {
    state: Arc<RwLock<InvoiceState>>,
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail on insert and save.
    pub async fn set_fail_on_save(&self, fail: bool) {
        self.state.write().await.fail_on_save = fail;
    }
}

#[async_trait]
impl InvoiceStore for InMemoryInvoiceStore {
    async fn count(&self) -> Result<u64> {
        Ok(self.state.read().await.invoices.len() as u64)
    }

    async fn insert(&self, invoice: Invoice) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_save {
            return Err(unavailable("invoice insert"));
        }
        if state
            .invoices
            .values()
            .any(|i| i.order_id == invoice.order_id)
        {
            return Err(DomainError::InvoiceExists(invoice.order_id));
        }
        if state.invoices.values().any(|i| i.number == invoice.number) {
            return Err(DomainError::DuplicateInvoiceNumber(invoice.number.to_string()));
        }
        state.invoices.insert(invoice.id, invoice);
        Ok(())
    }

    async fn save(&self, invoice: Invoice) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_save {
            return Err(unavailable("invoice save"));
        }
        if !state.invoices.contains_key(&invoice.id) {
            return Err(DomainError::InvoiceNotFound(invoice.id));
        }
        state.invoices.insert(invoice.id, invoice);
        Ok(())
    }

    async fn find(&self, id: InvoiceId) -> Result<Option<Invoice>> {
        Ok(self.state.read().await.invoices.get(&id).cloned())
    }

    async fn find_by_order(&self, order_id: OrderId) -> Result<Option<Invoice>> {
        Ok(self
            .state
            .read()
            .await
            .invoices
            .values()
            .find(|i| i.order_id == order_id)
            .cloned())
    }
}
