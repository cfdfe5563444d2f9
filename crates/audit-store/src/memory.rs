use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use common::{InvoiceId, Money, ProductId};
use tokio::sync::RwLock;

use crate::{
    AuditError, AuditStore, InvoiceOperation, PriceRecord, ProductChange, Result, TimeWindow,
};

#[derive(Default)]
struct Tables {
    price_history: HashMap<ProductId, Vec<PriceRecord>>,
    product_changes: HashMap<ProductId, Vec<ProductChange>>,
    invoice_operations: HashMap<InvoiceId, Vec<InvoiceOperation>>,
}

/// In-memory audit store implementation for testing.
///
/// Provides the same interface as the PostgreSQL implementation, plus
/// knobs to simulate an unreachable store or a missing namespace.
#[derive(Clone)]
pub struct InMemoryAuditStore {
    tables: Arc<RwLock<Tables>>,
    fail_next: Arc<AtomicUsize>,
    namespace_ready: Arc<AtomicBool>,
    bootstraps: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl Default for InMemoryAuditStore {
    fn default() -> Self {
        Self {
            tables: Arc::default(),
            fail_next: Arc::default(),
            namespace_ready: Arc::new(AtomicBool::new(true)),
            bootstraps: Arc::default(),
            reads: Arc::default(),
            closed: Arc::default(),
        }
    }
}

impl InMemoryAuditStore {
    /// Creates a new empty in-memory audit store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` operations fail with `Unavailable`.
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Controls what the readiness probe reports.
    pub fn set_namespace_ready(&self, ready: bool) {
        self.namespace_ready.store(ready, Ordering::SeqCst);
    }

    /// Number of times the schema bootstrap ran.
    pub fn bootstrap_count(&self) -> usize {
        self.bootstraps.load(Ordering::SeqCst)
    }

    /// Number of history reads that reached the store.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Total rows across all tables.
    pub async fn row_count(&self) -> usize {
        let tables = self.tables.read().await;
        tables.price_history.values().map(Vec::len).sum::<usize>()
            + tables.product_changes.values().map(Vec::len).sum::<usize>()
            + tables.invoice_operations.values().map(Vec::len).sum::<usize>()
    }

    fn check_available(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AuditError::Unavailable("store is closed".to_string()));
        }
        let consumed = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if consumed {
            return Err(AuditError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }

    async fn window_prices(
        &self,
        product_id: &ProductId,
        window: Option<TimeWindow>,
    ) -> Vec<PriceRecord> {
        let tables = self.tables.read().await;
        tables
            .price_history
            .get(product_id)
            .map(|rows| {
                rows.iter()
                    .filter(|r| window.is_none_or(|w| w.contains(r.timestamp)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Newest first; rows with equal timestamps keep reverse insertion order.
fn newest_first<T: Clone>(rows: &[T], timestamp: impl Fn(&T) -> chrono::DateTime<chrono::Utc>) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().rev().cloned().collect();
    out.sort_by_key(|r| std::cmp::Reverse(timestamp(r)));
    out
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn namespace_ready(&self) -> Result<bool> {
        self.check_available()?;
        Ok(self.namespace_ready.load(Ordering::SeqCst))
    }

    async fn bootstrap_schema(&self) -> Result<()> {
        self.check_available()?;
        self.bootstraps.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn insert_price(&self, record: &PriceRecord) -> Result<()> {
        self.check_available()?;
        self.tables
            .write()
            .await
            .price_history
            .entry(record.product_id.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn price_history(
        &self,
        product_id: &ProductId,
        window: Option<TimeWindow>,
    ) -> Result<Vec<PriceRecord>> {
        self.check_available()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        let rows = self.window_prices(product_id, window).await;
        Ok(newest_first(&rows, |r| r.timestamp))
    }

    async fn average_price(
        &self,
        product_id: &ProductId,
        window: Option<TimeWindow>,
    ) -> Result<Money> {
        self.check_available()?;
        let rows = self.window_prices(product_id, window).await;
        if rows.is_empty() {
            return Ok(Money::zero());
        }
        let sum: i64 = rows.iter().map(|r| r.price.cents()).sum();
        let mean = sum as f64 / rows.len() as f64;
        Ok(Money::from_cents(mean.round() as i64))
    }

    async fn insert_product_change(&self, change: &ProductChange) -> Result<()> {
        self.check_available()?;
        self.tables
            .write()
            .await
            .product_changes
            .entry(change.product_id.clone())
            .or_default()
            .push(change.clone());
        Ok(())
    }

    async fn product_changes(&self, product_id: &ProductId) -> Result<Vec<ProductChange>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .product_changes
            .get(product_id)
            .map(|rows| newest_first(rows, |r| r.timestamp))
            .unwrap_or_default())
    }

    async fn insert_invoice_operation(&self, operation: &InvoiceOperation) -> Result<()> {
        self.check_available()?;
        self.tables
            .write()
            .await
            .invoice_operations
            .entry(operation.invoice_id)
            .or_default()
            .push(operation.clone());
        Ok(())
    }

    async fn invoice_operations(&self, invoice_id: InvoiceId) -> Result<Vec<InvoiceOperation>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .invoice_operations
            .get(&invoice_id)
            .map(|rows| newest_first(rows, |r| r.timestamp))
            .unwrap_or_default())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
