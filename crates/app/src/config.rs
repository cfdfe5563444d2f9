//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use audit_store::RetryPolicy;

fn parse<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

/// Process configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `AUDIT_DATABASE_URL`: PostgreSQL URL for the audit store. When unset an
///   in-memory audit store is used.
/// - `AUDIT_NAMESPACE`: schema holding the audit tables (default: `"public"`)
/// - `AUDIT_MAX_CONNECTIONS` (default: `5`)
/// - `AUDIT_RETRY_ATTEMPTS` (default: `30`)
/// - `AUDIT_RETRY_DELAY_MS` (default: `5000`)
/// - `AUDIT_RETRY_BACKOFF`: delay multiplier, `1.0` keeps it fixed (default: `1.0`)
/// - `AUDIT_CACHE_TTL_SECS` (default: `3600`)
/// - `CART_HISTORY_LIMIT` (default: `10`)
/// - `SESSION_TTL_SECS` (default: `3600`)
/// - `METRICS_ADDR`: Prometheus listener (default: `"0.0.0.0:9000"`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `"json"` for JSON lines, anything else for text
/// - `SEED_DEMO_DATA` (default: `true`)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub audit_database_url: Option<String>,
    pub audit_namespace: String,
    pub audit_max_connections: u32,
    pub audit_retry_attempts: u32,
    pub audit_retry_delay: Duration,
    pub audit_retry_backoff: f64,
    pub audit_cache_ttl: Duration,
    pub cart_history_limit: usize,
    pub session_ttl: Duration,
    pub metrics_addr: String,
    pub log_level: String,
    pub json_logs: bool,
    pub seed_demo_data: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// Values that fail to parse fall back to their default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            audit_database_url: lookup("AUDIT_DATABASE_URL").filter(|url| !url.is_empty()),
            audit_namespace: lookup("AUDIT_NAMESPACE").unwrap_or(defaults.audit_namespace),
            audit_max_connections: parse(lookup("AUDIT_MAX_CONNECTIONS"))
                .unwrap_or(defaults.audit_max_connections),
            audit_retry_attempts: parse(lookup("AUDIT_RETRY_ATTEMPTS"))
                .unwrap_or(defaults.audit_retry_attempts),
            audit_retry_delay: parse(lookup("AUDIT_RETRY_DELAY_MS"))
                .map(Duration::from_millis)
                .unwrap_or(defaults.audit_retry_delay),
            audit_retry_backoff: parse(lookup("AUDIT_RETRY_BACKOFF"))
                .unwrap_or(defaults.audit_retry_backoff),
            audit_cache_ttl: parse(lookup("AUDIT_CACHE_TTL_SECS"))
                .map(Duration::from_secs)
                .unwrap_or(defaults.audit_cache_ttl),
            cart_history_limit: parse(lookup("CART_HISTORY_LIMIT")).unwrap_or(defaults.cart_history_limit),
            session_ttl: parse(lookup("SESSION_TTL_SECS"))
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_ttl),
            metrics_addr: lookup("METRICS_ADDR").unwrap_or(defaults.metrics_addr),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            json_logs: lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            seed_demo_data: lookup("SEED_DEMO_DATA")
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no"))
                .unwrap_or(defaults.seed_demo_data),
        }
    }

    /// Retry policy for audit store calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        if self.audit_retry_backoff > 1.0 {
            RetryPolicy::exponential(
                self.audit_retry_attempts,
                self.audit_retry_delay,
                self.audit_retry_backoff,
                self.audit_retry_delay * 12,
            )
        } else {
            RetryPolicy::fixed(self.audit_retry_attempts, self.audit_retry_delay)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audit_database_url: None,
            audit_namespace: "public".to_string(),
            audit_max_connections: 5,
            audit_retry_attempts: RetryPolicy::DEFAULT_MAX_ATTEMPTS,
            audit_retry_delay: RetryPolicy::DEFAULT_DELAY,
            audit_retry_backoff: 1.0,
            audit_cache_ttl: Duration::from_secs(3600),
            cart_history_limit: cart::DEFAULT_HISTORY_LIMIT,
            session_ttl: Duration::from_secs(3600),
            metrics_addr: "0.0.0.0:9000".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            seed_demo_data: true,
        }
    }
}
