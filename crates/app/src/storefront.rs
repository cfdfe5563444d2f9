//! Service graph construction and teardown.

use std::sync::Arc;

use audit_store::{
    AuditStore, CacheAside, InMemoryAuditStore, PostgresAuditStore, ResilientAuditClient,
    connect_with_retry, validate_namespace,
};
use cart::{CartStore, SessionStore};
use domain::{InMemoryCatalogStore, InMemoryInvoiceStore, InMemoryOrderStore};
use fulfillment::{CartCoordinator, CatalogService, CheckoutCoordinator, InvoiceRecorder, OrderDesk};
use graph::{GraphService, InMemoryInteractionGraph};
use kv_store::InMemoryKeyValueStore;

use crate::config::Config;
use crate::error::AppError;

/// Shared handle to whichever audit store backend was configured.
pub type AuditHandle = Arc<dyn AuditStore>;

type Kv = InMemoryKeyValueStore;
type Graph = InMemoryInteractionGraph;

/// Every storefront service, wired to one set of store handles.
pub struct Storefront {
    pub catalog: CatalogService<InMemoryCatalogStore, AuditHandle, Kv, Graph>,
    pub carts: CartCoordinator<InMemoryCatalogStore, Kv, Graph>,
    pub checkout: CheckoutCoordinator<InMemoryCatalogStore, InMemoryOrderStore, Kv, Graph>,
    pub invoices: InvoiceRecorder<InMemoryOrderStore, InMemoryInvoiceStore, AuditHandle, Kv, Graph>,
    pub orders: OrderDesk<InMemoryOrderStore>,
    pub graph: GraphService<Graph>,
    pub sessions: SessionStore<Kv>,
    audit: ResilientAuditClient<AuditHandle, Kv>,
}

impl Storefront {
    /// Connects the audit store and builds every service.
    ///
    /// With `AUDIT_DATABASE_URL` set the PostgreSQL store is used, otherwise
    /// an in-memory one. Either way the connection, readiness probe and
    /// schema bootstrap run under the configured retry policy.
    #[tracing::instrument(skip(config), fields(namespace = %config.audit_namespace))]
    pub async fn init(config: &Config) -> Result<Self, AppError> {
        validate_namespace(&config.audit_namespace)?;
        let policy = config.retry_policy();
        let namespace = config.audit_namespace.as_str();

        let audit: AuditHandle = match config.audit_database_url.as_deref() {
            Some(url) => {
                let max_connections = config.audit_max_connections;
                let store = connect_with_retry(&policy, namespace, move || {
                    PostgresAuditStore::connect(url, namespace, max_connections)
                })
                .await?;
                tracing::info!("using PostgreSQL audit store");
                Arc::new(store)
            }
            None => {
                let store = connect_with_retry(&policy, namespace, || async {
                    Ok(InMemoryAuditStore::new())
                })
                .await?;
                tracing::warn!("AUDIT_DATABASE_URL not set, audit records are kept in memory");
                Arc::new(store)
            }
        };

        Ok(Self::with_audit_store(config, audit))
    }

    /// Builds the services around an already prepared audit store.
    pub fn with_audit_store(config: &Config, audit: AuditHandle) -> Self {
        let kv = InMemoryKeyValueStore::new();
        let catalog = InMemoryCatalogStore::new();
        let orders = InMemoryOrderStore::new();
        let graph = GraphService::new(InMemoryInteractionGraph::new());
        let carts = CartStore::with_history_limit(kv.clone(), config.cart_history_limit);
        let audit = ResilientAuditClient::with_cache(
            audit,
            CacheAside::with_ttl(kv.clone(), config.audit_cache_ttl),
            config.retry_policy(),
        );

        Self {
            catalog: CatalogService::new(catalog.clone(), audit.clone(), graph.clone()),
            carts: CartCoordinator::new(catalog.clone(), carts.clone(), graph.clone()),
            checkout: CheckoutCoordinator::new(catalog, orders.clone(), carts, graph.clone()),
            invoices: InvoiceRecorder::new(
                orders.clone(),
                InMemoryInvoiceStore::new(),
                audit.clone(),
                graph.clone(),
            ),
            orders: OrderDesk::new(orders),
            sessions: SessionStore::new(kv, config.session_ttl),
            graph,
            audit,
        }
    }

    /// Closes the audit store connection.
    pub async fn shutdown(&self) {
        self.audit.shutdown().await;
        tracing::info!("storefront shut down");
    }
}
