//! Invoice generation and status changes, with audit trail.

use audit_store::{AuditStore, InvoiceOperation, InvoiceOperationKind, ResilientAuditClient};
use chrono::Utc;
use common::{Caller, InvoiceId, OrderId};
use domain::{DomainError, Invoice, InvoiceNumber, InvoiceStatus, InvoiceStore, OrderStore};
use graph::{GraphService, InteractionGraph};
use kv_store::KeyValueStore;

use crate::{FulfillmentError, Result};

/// How many sequence numbers to try before giving up on a numbering clash.
const INVOICE_NUMBER_ATTEMPTS: u64 = 5;

/// Derives invoices from orders and appends every invoice operation to the
/// audit store.
pub struct InvoiceRecorder<O, I, A, K, G>
where
    O: OrderStore,
    I: InvoiceStore,
    A: AuditStore,
    K: KeyValueStore,
    G: InteractionGraph + Clone,
{
    orders: O,
    invoices: I,
    audit: ResilientAuditClient<A, K>,
    graph: GraphService<G>,
}

fn operation(invoice: &Invoice, caller: Caller, kind: InvoiceOperationKind) -> InvoiceOperation {
    InvoiceOperation {
        invoice_id: invoice.id,
        order_id: invoice.order_id,
        user_id: caller.user_id,
        operation: kind,
        amount: invoice.total(),
        status: invoice.status.as_str().to_string(),
        timestamp: Utc::now(),
    }
}

impl<O, I, A, K, G> InvoiceRecorder<O, I, A, K, G>
where
    O: OrderStore,
    I: InvoiceStore,
    A: AuditStore,
    K: KeyValueStore,
    G: InteractionGraph + Clone,
{
    pub fn new(
        orders: O,
        invoices: I,
        audit: ResilientAuditClient<A, K>,
        graph: GraphService<G>,
    ) -> Self {
        Self {
            orders,
            invoices,
            audit,
            graph,
        }
    }

    /// Creates the invoice for an order.
    ///
    /// Fails with `InvoiceExists` if the order already has one. The caller
    /// must own the order or be an admin. Numbers come from the invoice
    /// count; a number taken by a concurrent insert moves on to the next one.
    #[tracing::instrument(skip(self), fields(user_id = %caller.user_id))]
    pub async fn create_invoice(&self, caller: Caller, order_id: OrderId) -> Result<Invoice> {
        if self.invoices.find_by_order(order_id).await?.is_some() {
            return Err(FulfillmentError::InvoiceExists(order_id));
        }
        let order = self
            .orders
            .find(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))?;
        if !caller.can_access(order.user_id) {
            return Err(FulfillmentError::forbidden("invoice this order"));
        }

        let mut attempt = 0;
        let invoice = loop {
            let sequence = self.invoices.count().await? + 1 + attempt;
            let invoice =
                Invoice::for_order(&order, InvoiceNumber::sequential(Utc::now(), sequence));
            match self.invoices.insert(invoice.clone()).await {
                Ok(()) => break invoice,
                Err(DomainError::DuplicateInvoiceNumber(number))
                    if attempt + 1 < INVOICE_NUMBER_ATTEMPTS =>
                {
                    tracing::debug!(%number, attempt, "invoice number taken, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };
        metrics::counter!("invoices_created_total").increment(1);

        let edge = self
            .graph
            .record_invoice(order.user_id, invoice.id, invoice.total());
        let audit = self
            .audit
            .record_invoice_operation(operation(&invoice, caller, InvoiceOperationKind::Create));
        let (edge, audit) = tokio::join!(edge, audit);
        if let Err(e) = edge {
            tracing::warn!(invoice_id = %invoice.id, error = %e, "failed to record invoice edge");
        }
        if let Err(e) = audit {
            tracing::warn!(invoice_id = %invoice.id, error = %e, "failed to audit invoice creation");
        }

        tracing::info!(
            invoice_id = %invoice.id,
            number = %invoice.number,
            total = %invoice.total(),
            "invoice created"
        );
        Ok(invoice)
    }

    pub async fn invoice(&self, caller: Caller, id: InvoiceId) -> Result<Invoice> {
        let invoice = self
            .invoices
            .find(id)
            .await?
            .ok_or(FulfillmentError::InvoiceNotFound(id))?;
        if !caller.can_access(invoice.user_id) {
            return Err(FulfillmentError::forbidden("read this invoice"));
        }
        Ok(invoice)
    }

    pub async fn invoice_for_order(&self, caller: Caller, order_id: OrderId) -> Result<Option<Invoice>> {
        match self.invoices.find_by_order(order_id).await? {
            Some(invoice) if !caller.can_access(invoice.user_id) => {
                Err(FulfillmentError::forbidden("read this invoice"))
            }
            found => Ok(found),
        }
    }

    /// Sets an invoice's status. Admin only.
    #[tracing::instrument(skip(self), fields(user_id = %caller.user_id))]
    pub async fn update_invoice_status(
        &self,
        caller: Caller,
        id: InvoiceId,
        status: InvoiceStatus,
    ) -> Result<Invoice> {
        if !caller.is_admin() {
            return Err(FulfillmentError::forbidden("change invoice status"));
        }
        let mut invoice = self
            .invoices
            .find(id)
            .await?
            .ok_or(FulfillmentError::InvoiceNotFound(id))?;
        invoice.set_status(status);
        self.invoices.save(invoice.clone()).await?;

        if let Err(e) = self
            .audit
            .record_invoice_operation(operation(&invoice, caller, InvoiceOperationKind::UpdateStatus))
            .await
        {
            tracing::warn!(invoice_id = %id, error = %e, "failed to audit invoice status change");
        }
        Ok(invoice)
    }

    /// Audit trail of an invoice, newest first.
    pub async fn invoice_history(&self, caller: Caller, id: InvoiceId) -> Result<Vec<InvoiceOperation>> {
        self.invoice(caller, id).await?;
        Ok(self.audit.invoice_operations(id).await?)
    }
}
