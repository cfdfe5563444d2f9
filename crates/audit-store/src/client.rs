//! Retrying, cache-aside access to the audit store.

use std::future::Future;

use common::{InvoiceId, Money, ProductId};
use kv_store::KeyValueStore;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{
    AuditError, AuditStore, CacheAside, InvoiceOperation, PriceRecord, PriceVolatility,
    ProductChange, Result, RetryPolicy, TimeWindow, price_volatility, with_retry,
};

/// Connects to the audit store and prepares its schema.
///
/// Each phase is retried under `policy`: opening the connection, waiting for
/// the namespace to exist, then creating the tables. A namespace that never
/// appears surfaces as [`AuditError::NamespaceNotReady`].
pub async fn connect_with_retry<A, F, Fut>(
    policy: &RetryPolicy,
    namespace: &str,
    mut connector: F,
) -> Result<A>
where
    A: AuditStore,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<A>>,
{
    let store = with_retry(policy, "connect", &mut connector).await?;
    tracing::info!(namespace, "connected to audit store");

    let store_ref = &store;
    with_retry(policy, "namespace_ready", move || async move {
        if store_ref.namespace_ready().await? {
            Ok::<_, AuditError>(())
        } else {
            Err(AuditError::NamespaceNotReady(namespace.to_string()))
        }
    })
    .await?;

    with_retry(policy, "bootstrap_schema", move || store_ref.bootstrap_schema()).await?;
    tracing::info!(namespace, "audit schema ready");
    Ok(store)
}

/// Audit store client with bounded retries and cache-aside reads.
///
/// Writes go straight to the store and invalidate the cached aggregates of
/// the product they touch. Without a cache every read hits the store.
#[derive(Clone)]
pub struct ResilientAuditClient<A, K>
where
    A: AuditStore,
    K: KeyValueStore,
{
    store: A,
    cache: Option<CacheAside<K>>,
    policy: RetryPolicy,
}

fn window_key(window: Option<TimeWindow>) -> String {
    match window {
        Some(w) => format!("{}:{}", w.start.timestamp_millis(), w.end.timestamp_millis()),
        None => "all:all".to_string(),
    }
}

fn price_history_prefix(product_id: &ProductId) -> String {
    format!("price_history:{}:", product_id)
}

fn volatility_prefix(product_id: &ProductId) -> String {
    format!("volatility:{}:", product_id)
}

impl<A, K> ResilientAuditClient<A, K>
where
    A: AuditStore,
    K: KeyValueStore,
{
    pub fn new(store: A, policy: RetryPolicy) -> Self {
        Self {
            store,
            cache: None,
            policy,
        }
    }

    pub fn with_cache(store: A, cache: CacheAside<K>, policy: RetryPolicy) -> Self {
        Self {
            store,
            cache: Some(cache),
            policy,
        }
    }

    pub fn store(&self) -> &A {
        &self.store
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn cached<T, F, Fut>(&self, key: String, load: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match &self.cache {
            Some(cache) => cache.get_or_load(&key, load).await,
            None => load().await,
        }
    }

    async fn invalidate(&self, product_id: &ProductId) {
        if let Some(cache) = &self.cache {
            cache.invalidate_prefix(&price_history_prefix(product_id)).await;
            cache.invalidate_prefix(&volatility_prefix(product_id)).await;
        }
    }

    /// Appends a price point and drops the product's cached aggregates.
    #[tracing::instrument(skip(self, record), fields(product_id = %record.product_id))]
    pub async fn record_price_change(&self, record: PriceRecord) -> Result<()> {
        if record.price.is_negative() {
            return Err(AuditError::InvalidPrice(record.price));
        }
        let store = &self.store;
        let row = &record;
        with_retry(&self.policy, "insert_price", move || store.insert_price(row)).await?;
        self.invalidate(&record.product_id).await;
        tracing::debug!(price = %record.price, "price recorded");
        Ok(())
    }

    #[tracing::instrument(skip(self, change), fields(product_id = %change.product_id, change_type = %change.change_type))]
    pub async fn record_product_change(&self, change: ProductChange) -> Result<()> {
        let store = &self.store;
        let row = &change;
        with_retry(&self.policy, "insert_product_change", move || {
            store.insert_product_change(row)
        })
        .await
    }

    #[tracing::instrument(skip(self, operation), fields(invoice_id = %operation.invoice_id, operation = operation.operation.as_str()))]
    pub async fn record_invoice_operation(&self, operation: InvoiceOperation) -> Result<()> {
        let store = &self.store;
        let row = &operation;
        with_retry(&self.policy, "insert_invoice_operation", move || {
            store.insert_invoice_operation(row)
        })
        .await
    }

    /// Price points for a product, newest first, served from cache when present.
    pub async fn price_history(
        &self,
        product_id: &ProductId,
        window: Option<TimeWindow>,
    ) -> Result<Vec<PriceRecord>> {
        let key = format!("{}{}", price_history_prefix(product_id), window_key(window));
        let store = &self.store;
        let policy = &self.policy;
        self.cached(key, move || {
            with_retry(policy, "price_history", move || {
                store.price_history(product_id, window)
            })
        })
        .await
    }

    /// Price volatility over a window, cached under its own key.
    pub async fn price_volatility(
        &self,
        product_id: &ProductId,
        window: Option<TimeWindow>,
    ) -> Result<PriceVolatility> {
        let key = format!("{}{}", volatility_prefix(product_id), window_key(window));
        let store = &self.store;
        let policy = &self.policy;
        self.cached(key, move || async move {
            let points = with_retry(policy, "price_history", move || {
                store.price_history(product_id, window)
            })
            .await?;
            Ok::<_, AuditError>(price_volatility(&points))
        })
        .await
    }

    pub async fn average_price(
        &self,
        product_id: &ProductId,
        window: Option<TimeWindow>,
    ) -> Result<Money> {
        let store = &self.store;
        with_retry(&self.policy, "average_price", move || {
            store.average_price(product_id, window)
        })
        .await
    }

    pub async fn product_changes(&self, product_id: &ProductId) -> Result<Vec<ProductChange>> {
        let store = &self.store;
        with_retry(&self.policy, "product_changes", move || {
            store.product_changes(product_id)
        })
        .await
    }

    pub async fn invoice_operations(&self, invoice_id: InvoiceId) -> Result<Vec<InvoiceOperation>> {
        let store = &self.store;
        with_retry(&self.policy, "invoice_operations", move || {
            store.invoice_operations(invoice_id)
        })
        .await
    }

    /// Closes the store connection.
    pub async fn shutdown(&self) {
        self.store.close().await;
        tracing::info!("audit store closed");
    }
}
