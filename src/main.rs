//! Live Classroom Session Engine
//!
//! Realtime teaching sessions over WebSocket:
//! - Question push with auto-close and result aggregation
//! - Per-student concept mastery scoring
//! - Class engagement index and trends
//! - Background reaper and low-engagement notifications

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState, ContentClient};
use classroom_core::{ContentStore, LearningStore};
use clickhouse_client::{ClickHouseClient, ClickHouseConfig, ClickHouseLearningStore};
use session_engine::{InMemoryStore, SessionConfig, SessionController};
use telemetry::{health, init_tracing_from_env};
use worker::{WorkerConfig, WorkerScheduler};

/// Where mastery records and engagement logs live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StoreBackend {
    Memory,
    Clickhouse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreConfig {
    #[serde(default = "default_store_backend")]
    backend: StoreBackend,
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Memory
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
        }
    }
}

/// Question content source: an HTTP content service, or `memory` with an
/// optional JSON seed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContentConfig {
    #[serde(default = "default_content_url")]
    url: String,
    #[serde(default = "default_content_timeout_ms")]
    timeout_ms: u64,
    seed_path: Option<String>,
}

fn default_content_url() -> String {
    "memory".to_string()
}

fn default_content_timeout_ms() -> u64 {
    5_000
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            url: default_content_url(),
            timeout_ms: default_content_timeout_ms(),
            seed_path: None,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    #[serde(default)]
    session: SessionConfig,

    #[serde(default)]
    store: StoreConfig,

    #[serde(default)]
    clickhouse: ClickHouseConfig,

    #[serde(default)]
    content: ContentConfig,

    #[serde(default)]
    worker: WorkerConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            session: SessionConfig::default(),
            store: StoreConfig::default(),
            clickhouse: ClickHouseConfig::default(),
            content: ContentConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Classroom Engine v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    info!(
        store = ?config.store.backend,
        content = %config.content.url,
        "Loaded configuration"
    );

    let learning = build_learning_store(&config).await?;
    let content = build_content_store(&config.content)?;

    let controller = SessionController::new(config.session.clone(), content, learning);

    match controller.ping_store().await {
        Ok(()) => {
            health().learning_store.set_healthy();
            info!("Learning store: healthy");
        }
        Err(e) => {
            health().learning_store.set_unhealthy(e.to_string());
            error!(error = %e, "Learning store: unhealthy");
        }
    }

    let worker_scheduler = Arc::new(WorkerScheduler::new(
        config.worker.clone(),
        controller.clone(),
    ));
    let worker_handles = worker_scheduler.start();

    let app = router(AppState::new(controller.clone()));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down...");

    for handle in worker_handles {
        handle.abort();
    }

    // End live sessions so clients get `session:ended`.
    for snapshot in controller.list().await {
        controller.end(&snapshot.id).await;
    }

    info!("Shutdown complete");
    Ok(())
}

async fn build_learning_store(config: &Config) -> Result<Arc<dyn LearningStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            warn!("Using in-memory learning store; mastery and engagement logs are not persisted");
            Ok(Arc::new(InMemoryStore::new()))
        }
        StoreBackend::Clickhouse => {
            let client = ClickHouseClient::new(config.clickhouse.clone());

            if config.clickhouse.init_schema {
                if let Err(e) = clickhouse_client::init_schema(&client).await {
                    // Schema might already exist; readiness reports the outcome.
                    error!("Failed to initialize ClickHouse schema: {}", e);
                }
            }

            Ok(Arc::new(ClickHouseLearningStore::new(client)))
        }
    }
}

fn build_content_store(config: &ContentConfig) -> Result<Arc<dyn ContentStore>> {
    if config.url == "memory" {
        let store = match &config.seed_path {
            Some(path) => InMemoryStore::from_seed_file(path)
                .with_context(|| format!("Failed to load question seed file {path}"))?,
            None => InMemoryStore::new(),
        };
        health().content.set_healthy();
        info!(seed = ?config.seed_path, "Using in-memory question content");
        return Ok(Arc::new(store));
    }

    let client = ContentClient::new(&config.url, Duration::from_millis(config.timeout_ms))
        .context("Failed to create content client")?;
    Ok(Arc::new(client))
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables, e.g. CLASSROOM__STORE__BACKEND
        .add_source(
            config::Environment::with_prefix("CLASSROOM")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
