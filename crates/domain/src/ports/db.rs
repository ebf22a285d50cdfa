use serde::Serialize;
use thiserror::Error;

use super::BoxFuture;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("document store unreachable: {0}")]
    Unreachable(String),
    #[error("document store misconfigured: {0}")]
    Misconfigured(String),
}

#[derive(Clone, Debug, Serialize)]
pub struct StoreHealth {
    pub backend: &'static str,
    pub namespace: Option<String>,
    pub latency_ms: u64,
}

/// Liveness probe for whichever document store backs the repositories.
pub trait DocumentStoreProbe: Send + Sync {
    fn backend(&self) -> &'static str;
    fn probe(&self) -> BoxFuture<'_, Result<StoreHealth, DbError>>;
}
