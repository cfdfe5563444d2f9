use std::sync::Arc;

use async_trait::async_trait;
use common::{InvoiceId, Money, ProductId};

use crate::{InvoiceOperation, PriceRecord, ProductChange, Result, TimeWindow};

/// Core trait for append-only audit store implementations.
///
/// Implementations only ever insert. History reads return rows newest
/// first, the clustering order of the underlying tables.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Returns true once the configured namespace (keyspace/schema) exists.
    async fn namespace_ready(&self) -> Result<bool>;

    /// Creates the tables if they do not exist. Safe to run on every start.
    async fn bootstrap_schema(&self) -> Result<()>;

    async fn insert_price(&self, record: &PriceRecord) -> Result<()>;

    /// Price points for a product, newest first, optionally within a window.
    async fn price_history(
        &self,
        product_id: &ProductId,
        window: Option<TimeWindow>,
    ) -> Result<Vec<PriceRecord>>;

    /// Mean recorded price, zero when there are no points.
    async fn average_price(
        &self,
        product_id: &ProductId,
        window: Option<TimeWindow>,
    ) -> Result<Money>;

    async fn insert_product_change(&self, change: &ProductChange) -> Result<()>;

    /// Catalog mutations for a product, newest first.
    async fn product_changes(&self, product_id: &ProductId) -> Result<Vec<ProductChange>>;

    async fn insert_invoice_operation(&self, operation: &InvoiceOperation) -> Result<()>;

    /// Operations recorded for an invoice, newest first.
    async fn invoice_operations(&self, invoice_id: InvoiceId) -> Result<Vec<InvoiceOperation>>;

    /// Releases the underlying connection.
    async fn close(&self);
}

#[async_trait]
impl<T: AuditStore + ?Sized> AuditStore for Arc<T> {
    async fn namespace_ready(&self) -> Result<bool> {
        (**self).namespace_ready().await
    }

    async fn bootstrap_schema(&self) -> Result<()> {
        (**self).bootstrap_schema().await
    }

    async fn insert_price(&self, record: &PriceRecord) -> Result<()> {
        (**self).insert_price(record).await
    }

    async fn price_history(
        &self,
        product_id: &ProductId,
        window: Option<TimeWindow>,
    ) -> Result<Vec<PriceRecord>> {
        (**self).price_history(product_id, window).await
    }

    async fn average_price(
        &self,
        product_id: &ProductId,
        window: Option<TimeWindow>,
    ) -> Result<Money> {
        (**self).average_price(product_id, window).await
    }

    async fn insert_product_change(&self, change: &ProductChange) -> Result<()> {
        (**self).insert_product_change(change).await
    }

    async fn product_changes(&self, product_id: &ProductId) -> Result<Vec<ProductChange>> {
        (**self).product_changes(product_id).await
    }

    async fn insert_invoice_operation(&self, operation: &InvoiceOperation) -> Result<()> {
        (**self).insert_invoice_operation(operation).await
    }

    async fn invoice_operations(&self, invoice_id: InvoiceId) -> Result<Vec<InvoiceOperation>> {
        (**self).invoice_operations(invoice_id).await
    }

    async fn close(&self) {
        (**self).close().await
    }
}
