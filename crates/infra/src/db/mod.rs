use forum_domain::ports::BoxFuture;
use forum_domain::ports::db::{DbError, DocumentStoreProbe, StoreHealth};
use std::sync::Arc;
use std::time::{Duration, Instant};
use surrealdb::{
    Surreal,
    engine::remote::ws::{Client, Ws, Wss},
    opt::auth::Root,
};
use tokio::net::TcpStream;
use tokio::time::timeout;
use url::Url;

use crate::config::AppConfig;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl DbConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            endpoint: config.surreal_endpoint.clone(),
            namespace: config.surreal_ns.clone(),
            database: config.surreal_db.clone(),
            username: config.surreal_user.clone(),
            password: config.surreal_pass.clone(),
        }
    }
}

/// Opens one authenticated client shared by every Surreal repository.
pub async fn connect(db_config: &DbConfig) -> anyhow::Result<Arc<Surreal<Client>>> {
    let db = Surreal::<Client>::init();
    match db_config.endpoint.strip_prefix("wss://") {
        Some(address) => db.connect::<Wss>(address).await?,
        None => {
            db.connect::<Ws>(db_config.endpoint.trim_start_matches("ws://"))
                .await?
        }
    }
    db.signin(Root {
        username: &db_config.username,
        password: &db_config.password,
    })
    .await?;
    db.use_ns(&db_config.namespace)
        .use_db(&db_config.database)
        .await?;
    tracing::info!(
        endpoint = %db_config.endpoint,
        namespace = %db_config.namespace,
        database = %db_config.database,
        "connected to document store"
    );
    Ok(Arc::new(db))
}

#[derive(Debug, Clone)]
pub struct SurrealProbe {
    config: DbConfig,
}

impl SurrealProbe {
    pub fn new(config: DbConfig) -> Self {
        Self { config }
    }
}

impl DocumentStoreProbe for SurrealProbe {
    fn backend(&self) -> &'static str {
        "surrealdb"
    }

    fn probe(&self) -> BoxFuture<'_, Result<StoreHealth, DbError>> {
        let endpoint = self.config.endpoint.clone();
        let namespace = self.config.namespace.clone();

        Box::pin(async move {
            let address = parse_socket_address(&endpoint)?;
            let started = Instant::now();
            let connect = timeout(PROBE_TIMEOUT, TcpStream::connect(address))
                .await
                .map_err(|_| DbError::Unreachable("surreal endpoint connect timed out".into()))?;
            connect.map_err(|err| {
                DbError::Unreachable(format!("surreal endpoint connect failed: {err}"))
            })?;

            let latency_ms = started.elapsed().as_millis() as u64;
            tracing::debug!(endpoint, latency_ms, "surreal probe succeeded");
            Ok(StoreHealth {
                backend: "surrealdb",
                namespace: Some(namespace),
                latency_ms,
            })
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryProbe;

impl DocumentStoreProbe for MemoryProbe {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn probe(&self) -> BoxFuture<'_, Result<StoreHealth, DbError>> {
        Box::pin(async {
            Ok(StoreHealth {
                backend: "memory",
                namespace: None,
                latency_ms: 0,
            })
        })
    }
}

fn parse_socket_address(endpoint: &str) -> Result<String, DbError> {
    let normalized = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("ws://{endpoint}")
    };
    let parsed = Url::parse(&normalized).map_err(|err| {
        DbError::Misconfigured(format!("invalid surreal endpoint '{endpoint}': {err}"))
    })?;

    let host = parsed.host_str().ok_or_else(|| {
        DbError::Misconfigured(format!("missing surreal host in endpoint '{endpoint}'"))
    })?;
    let port = match parsed.scheme() {
        "wss" | "https" => parsed.port().unwrap_or(443),
        _ => parsed.port().unwrap_or(8000),
    };
    Ok(format!("{host}:{port}"))
}
