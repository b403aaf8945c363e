//! External query-client contract

use async_trait::async_trait;

use crate::query::QuerySpec;

/// One result row. Column order is preserved as returned by the client.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Row limit assumed when the client does not report the one it applied.
pub const DEFAULT_QUERY_LIMIT: u64 = 10_000;

/// Rows plus the limit the client actually applied, if any.
#[derive(Debug, Clone, Default)]
pub struct QueryResponse {
    pub rows: Vec<Row>,
    pub applied_limit: Option<u64>,
}

/// Trait for query clients.
///
/// Transport, auth, and caching are the implementor's concern; the core
/// only requires this async request/response contract.
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Execute one query spec and return its rows.
    async fn query(&self, spec: &QuerySpec) -> anyhow::Result<QueryResponse>;
}
