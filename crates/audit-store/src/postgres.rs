use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{InvoiceId, Money, OrderId, ProductId, UserId};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    AuditError, AuditStore, InvoiceOperation, PriceRecord, ProductChange, Result, TimeWindow,
};

/// PostgreSQL-backed append-only audit store.
///
/// Each table is keyed by the entity id followed by the timestamp and a row
/// id, with a descending index on the timestamp, the relational equivalent
/// of a partition key clustered by time.
#[derive(Clone)]
pub struct PostgresAuditStore {
    pool: PgPool,
    namespace: String,
}

impl PostgresAuditStore {
    /// Wraps an existing pool. `namespace` is the schema holding the tables.
    pub fn new(pool: PgPool, namespace: impl Into<String>) -> Result<Self> {
        let namespace = namespace.into();
        validate_namespace(&namespace)?;
        Ok(Self { pool, namespace })
    }

    /// Opens a connection pool to `url`.
    pub async fn connect(url: &str, namespace: &str, max_connections: u32) -> Result<Self> {
        validate_namespace(namespace)?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(60))
            .connect(url)
            .await?;
        Ok(Self {
            pool,
            namespace: namespace.to_string(),
        })
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn table(&self, name: &str) -> String {
        format!("{}.{}", self.namespace, name)
    }

    fn row_to_price(row: PgRow) -> Result<PriceRecord> {
        Ok(PriceRecord {
            product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
            timestamp: row.try_get("recorded_at")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            currency: row.try_get("currency")?,
        })
    }

    fn row_to_change(row: PgRow) -> Result<ProductChange> {
        let change_type: String = row.try_get("change_type")?;
        Ok(ProductChange {
            product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
            timestamp: row.try_get("changed_at")?,
            change_type: change_type.parse()?,
            old_value: row.try_get("old_value")?,
            new_value: row.try_get("new_value")?,
        })
    }

    fn row_to_invoice_operation(row: PgRow) -> Result<InvoiceOperation> {
        let operation: String = row.try_get("operation")?;
        Ok(InvoiceOperation {
            invoice_id: InvoiceId::from_uuid(row.try_get::<Uuid, _>("invoice_id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            operation: operation.parse()?,
            amount: Money::from_cents(row.try_get("amount_cents")?),
            status: row.try_get("status")?,
            timestamp: row.try_get("recorded_at")?,
        })
    }
}

/// Namespaces are spliced into SQL text, so only plain identifiers pass.
pub fn validate_namespace(namespace: &str) -> Result<()> {
    let mut chars = namespace.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && namespace.len() <= 63;
    if valid {
        Ok(())
    } else {
        Err(AuditError::InvalidNamespace(namespace.to_string()))
    }
}

fn window_bounds(window: Option<TimeWindow>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    match window {
        Some(w) => (Some(w.start), Some(w.end)),
        None => (None, None),
    }
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    async fn namespace_ready(&self) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.schemata WHERE schema_name = $1)",
        )
        .bind(&self.namespace)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn bootstrap_schema(&self) -> Result<()> {
        let statements = [
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id UUID NOT NULL,
                    product_id TEXT NOT NULL,
                    recorded_at TIMESTAMPTZ NOT NULL,
                    price_cents BIGINT NOT NULL,
                    currency TEXT NOT NULL DEFAULT 'USD',
                    PRIMARY KEY (product_id, recorded_at, id)
                )
                "#,
                self.table("price_history")
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS price_history_recent ON {} (product_id, recorded_at DESC)",
                self.table("price_history")
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id UUID NOT NULL,
                    product_id TEXT NOT NULL,
                    changed_at TIMESTAMPTZ NOT NULL,
                    change_type TEXT NOT NULL,
                    old_value TEXT NOT NULL,
                    new_value TEXT NOT NULL,
                    PRIMARY KEY (product_id, changed_at, id)
                )
                "#,
                self.table("product_changes")
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS product_changes_recent ON {} (product_id, changed_at DESC)",
                self.table("product_changes")
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id UUID NOT NULL,
                    invoice_id UUID NOT NULL,
                    recorded_at TIMESTAMPTZ NOT NULL,
                    order_id UUID NOT NULL,
                    user_id UUID NOT NULL,
                    operation TEXT NOT NULL,
                    amount_cents BIGINT NOT NULL,
                    status TEXT NOT NULL,
                    PRIMARY KEY (invoice_id, recorded_at, id)
                )
                "#,
                self.table("invoice_operations")
            ),
        ];

        for statement in &statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!(namespace = %self.namespace, "audit tables created or already exist");
        Ok(())
    }

    async fn insert_price(&self, record: &PriceRecord) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO {} (id, product_id, recorded_at, price_cents, currency) VALUES ($1, $2, $3, $4, $5)",
            self.table("price_history")
        ))
        .bind(Uuid::new_v4())
        .bind(record.product_id.as_str())
        .bind(record.timestamp)
        .bind(record.price.cents())
        .bind(&record.currency)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn price_history(
        &self,
        product_id: &ProductId,
        window: Option<TimeWindow>,
    ) -> Result<Vec<PriceRecord>> {
        let (start, end) = window_bounds(window);
        let rows = sqlx::query(&format!(
            r#"
            SELECT product_id, recorded_at, price_cents, currency
            FROM {}
            WHERE product_id = $1
              AND ($2::TIMESTAMPTZ IS NULL OR recorded_at >= $2)
              AND ($3::TIMESTAMPTZ IS NULL OR recorded_at <= $3)
            ORDER BY recorded_at DESC
            "#,
            self.table("price_history")
        ))
        .bind(product_id.as_str())
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_price).collect()
    }

    async fn average_price(
        &self,
        product_id: &ProductId,
        window: Option<TimeWindow>,
    ) -> Result<Money> {
        let (start, end) = window_bounds(window);
        let avg: i64 = sqlx::query_scalar(&format!(
            r#"
            SELECT COALESCE(ROUND(AVG(price_cents)), 0)::BIGINT
            FROM {}
            WHERE product_id = $1
              AND ($2::TIMESTAMPTZ IS NULL OR recorded_at >= $2)
              AND ($3::TIMESTAMPTZ IS NULL OR recorded_at <= $3)
            "#,
            self.table("price_history")
        ))
        .bind(product_id.as_str())
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_cents(avg))
    }

    async fn insert_product_change(&self, change: &ProductChange) -> Result<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO {} (id, product_id, changed_at, change_type, old_value, new_value)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
            self.table("product_changes")
        ))
        .bind(Uuid::new_v4())
        .bind(change.product_id.as_str())
        .bind(change.timestamp)
        .bind(change.change_type.as_str())
        .bind(&change.old_value)
        .bind(&change.new_value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn product_changes(&self, product_id: &ProductId) -> Result<Vec<ProductChange>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT product_id, changed_at, change_type, old_value, new_value
            FROM {}
            WHERE product_id = $1
            ORDER BY changed_at DESC
            "#,
            self.table("product_changes")
        ))
        .bind(product_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_change).collect()
    }

    async fn insert_invoice_operation(&self, operation: &InvoiceOperation) -> Result<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO {} (id, invoice_id, recorded_at, order_id, user_id, operation, amount_cents, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
            self.table("invoice_operations")
        ))
        .bind(Uuid::new_v4())
        .bind(operation.invoice_id.as_uuid())
        .bind(operation.timestamp)
        .bind(operation.order_id.as_uuid())
        .bind(operation.user_id.as_uuid())
        .bind(operation.operation.as_str())
        .bind(operation.amount.cents())
        .bind(&operation.status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn invoice_operations(&self, invoice_id: InvoiceId) -> Result<Vec<InvoiceOperation>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT invoice_id, recorded_at, order_id, user_id, operation, amount_cents, status
            FROM {}
            WHERE invoice_id = $1
            ORDER BY recorded_at DESC
            "#,
            self.table("invoice_operations")
        ))
        .bind(invoice_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_invoice_operation).collect()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
