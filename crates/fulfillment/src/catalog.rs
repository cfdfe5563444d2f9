//! Catalog mutations with price history and change auditing.

use audit_store::{
    AuditStore, ChangeType, PriceRecord, PriceVolatility, ProductChange, ResilientAuditClient,
    TimeWindow,
};
use common::{Caller, Money, ProductId};
use domain::{CatalogStore, DomainError, Product, ProductUpdate};
use graph::{GraphService, InteractionAction, InteractionGraph};
use kv_store::KeyValueStore;
use serde::Serialize;

use crate::{FulfillmentError, Page, Result};

/// Default look-back for price analytics.
pub const DEFAULT_ANALYTICS_DAYS: i64 = 30;

/// A product with its audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetails {
    pub product: Product,
    /// Newest first.
    pub price_history: Vec<PriceRecord>,
    /// Newest first.
    pub changes: Vec<ProductChange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceAnalytics {
    pub product_id: ProductId,
    pub average_price: Money,
    pub volatility: PriceVolatility,
    pub window: TimeWindow,
}

/// Catalog writes that also feed the append-only audit store.
///
/// Audit writes are secondary: when they fail the catalog write still
/// stands and the failure is logged.
pub struct CatalogService<C, A, K, G>
where
    C: CatalogStore,
    A: AuditStore,
    K: KeyValueStore,
    G: InteractionGraph + Clone,
{
    catalog: C,
    audit: ResilientAuditClient<A, K>,
    graph: GraphService<G>,
}

fn snapshot<T: Serialize>(value: &T) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize audit snapshot");
            None
        }
    }
}

impl<C, A, K, G> CatalogService<C, A, K, G>
where
    C: CatalogStore,
    A: AuditStore,
    K: KeyValueStore,
    G: InteractionGraph + Clone,
{
    pub fn new(catalog: C, audit: ResilientAuditClient<A, K>, graph: GraphService<G>) -> Self {
        Self {
            catalog,
            audit,
            graph,
        }
    }

    pub fn audit(&self) -> &ResilientAuditClient<A, K> {
        &self.audit
    }

    fn require_admin(caller: Caller, action: &str) -> Result<()> {
        if caller.is_admin() {
            Ok(())
        } else {
            Err(FulfillmentError::forbidden(action))
        }
    }

    async fn load(&self, id: &ProductId) -> Result<Product> {
        self.catalog
            .get(id)
            .await?
            .ok_or_else(|| FulfillmentError::ProductNotFound(id.clone()))
    }

    /// Inserts a product, then records its first price and a `CREATE` change.
    #[tracing::instrument(skip(self, product), fields(sku = %product.sku))]
    pub async fn create_product(&self, caller: Caller, product: Product) -> Result<Product> {
        Self::require_admin(caller, "create products")?;
        product.validate()?;
        self.catalog.insert(product.clone()).await?;

        let price = self
            .audit
            .record_price_change(PriceRecord::now(product.id.clone(), product.price));
        let change = self.audit.record_product_change(ProductChange::new(
            product.id.clone(),
            ChangeType::Create,
            None,
            snapshot(&product),
        ));
        let (price, change) = tokio::join!(price, change);
        for (record, result) in [("initial price", price), ("create change", change)] {
            if let Err(e) = result {
                tracing::warn!(product_id = %product.id, record, error = %e, "failed to audit product creation");
            }
        }

        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Applies a partial update. A changed price is recorded as a new point.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_product(
        &self,
        caller: Caller,
        id: &ProductId,
        update: ProductUpdate,
    ) -> Result<Product> {
        Self::require_admin(caller, "update products")?;
        let before = self.load(id).await?;
        let mut product = before.clone();
        product.apply(&update)?;

        if let Some(price) = update.price.filter(|p| *p != before.price) {
            if let Err(e) = self
                .audit
                .record_price_change(PriceRecord::now(id.clone(), price))
                .await
            {
                tracing::warn!(product_id = %id, error = %e, "failed to record price change");
            }
        }
        if let Err(e) = self
            .audit
            .record_product_change(ProductChange::new(
                id.clone(),
                ChangeType::Update,
                snapshot(&before),
                snapshot(&update),
            ))
            .await
        {
            tracing::warn!(product_id = %id, error = %e, "failed to record product update");
        }

        self.catalog.save(product.clone()).await?;
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, caller: Caller, id: &ProductId) -> Result<()> {
        Self::require_admin(caller, "delete products")?;
        let product = self.load(id).await?;
        if !self.catalog.delete(id).await? {
            return Err(DomainError::ProductNotFound(id.clone()).into());
        }

        if let Err(e) = self
            .audit
            .record_product_change(ProductChange::new(
                id.clone(),
                ChangeType::Delete,
                snapshot(&product),
                None,
            ))
            .await
        {
            tracing::warn!(product_id = %id, error = %e, "failed to record product deletion");
        }
        Ok(())
    }

    /// The product plus its price history and change log.
    ///
    /// An unreachable audit store yields empty histories rather than an error.
    pub async fn product_details(&self, id: &ProductId) -> Result<ProductDetails> {
        let product = self.load(id).await?;
        let (history, changes) = tokio::join!(
            self.audit.price_history(id, None),
            self.audit.product_changes(id)
        );

        Ok(ProductDetails {
            product,
            price_history: history.unwrap_or_else(|e| {
                tracing::warn!(product_id = %id, error = %e, "price history unavailable");
                Vec::new()
            }),
            changes: changes.unwrap_or_else(|e| {
                tracing::warn!(product_id = %id, error = %e, "change log unavailable");
                Vec::new()
            }),
        })
    }

    /// Products sorted by SKU, optionally within one category.
    pub async fn list_products(
        &self,
        category: Option<&str>,
        page: usize,
        limit: usize,
    ) -> Result<Page<Product>> {
        let products: Vec<Product> = self
            .catalog
            .list()
            .await?
            .into_iter()
            .filter(|p| category.is_none_or(|c| p.category == c))
            .collect();
        Ok(Page::slice(products, page, limit))
    }

    /// Average price and volatility over `window`, the last 30 days by default.
    #[tracing::instrument(skip(self))]
    pub async fn price_analytics(
        &self,
        caller: Caller,
        id: &ProductId,
        window: Option<TimeWindow>,
    ) -> Result<PriceAnalytics> {
        Self::require_admin(caller, "read price analytics")?;
        let window = window.unwrap_or_else(|| TimeWindow::calendar_days(DEFAULT_ANALYTICS_DAYS));
        let (average_price, volatility) = tokio::join!(
            self.audit.average_price(id, Some(window)),
            self.audit.price_volatility(id, Some(window))
        );

        Ok(PriceAnalytics {
            product_id: id.clone(),
            average_price: average_price?,
            volatility: volatility?,
            window,
        })
    }

    /// Records a view or click. The product node is named when the product
    /// is in the catalog.
    #[tracing::instrument(skip(self), fields(user_id = %caller.user_id))]
    pub async fn record_interaction(
        &self,
        caller: Caller,
        id: &ProductId,
        action: InteractionAction,
    ) -> Result<()> {
        let name = self.catalog.get(id).await?.map(|p| p.name);
        self.graph
            .record_interaction(caller.user_id, id, action, name.as_deref())
            .await?;
        Ok(())
    }
}
