//! API Server
//!
//! Wires configuration, storage, the VRF engine and the spin processor into
//! an axum application and serves it until a shutdown signal arrives.

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, metrics_middleware, request_id_middleware},
    routes::create_router,
};
use crate::accounts::{AccountStore, InMemoryAccountStore, RocksAccountStore};
use crate::config::{RoyaleConfig, ServerConfig, StorageBackend};
use crate::errors::{RoyaleError, RoyaleResult, StorageError};
use crate::games::processor::GameProcessor;
use crate::games::rng::{NumberSource, VrfSource};
use crate::games::vrf_engine::VRFGameEngine;
use crate::metrics::MetricsRegistry;
use crate::storage::OptimizedStorage;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Build shared state for the configured storage backend
pub async fn build_state(config: &RoyaleConfig) -> RoyaleResult<Arc<AppState>> {
    let metrics = Arc::new(MetricsRegistry::new());

    let storage = match config.storage.backend {
        StorageBackend::Rocksdb => {
            info!("📂 Opening account database: {}", config.storage.data_directory);
            let storage = OptimizedStorage::new_with_config(&config.storage)
                .map_err(|e| RoyaleError::Storage(StorageError::DatabaseOpenFailed(e.to_string())))?;
            Some(Arc::new(storage))
        }
        StorageBackend::Memory => None,
    };

    let engine = match (&config.game.vrf_seed_hex, &storage) {
        (Some(seed_hex), _) => VRFGameEngine::from_seed_hex(seed_hex)?,
        (None, Some(storage)) => VRFGameEngine::load_or_create(storage)?,
        (None, None) => {
            warn!("No VRF seed configured and no database; public key changes on restart");
            VRFGameEngine::new_random()
        }
    };
    let engine = Arc::new(engine);
    let vrf_public_key = engine.public_key_hex();
    info!("🔑 VRF public key: {}", vrf_public_key);

    let store: Arc<dyn AccountStore> = match storage {
        Some(storage) => Arc::new(RocksAccountStore::new(storage)),
        None => Arc::new(InMemoryAccountStore::new()),
    };
    metrics.set_active_accounts(store.count().await? as u64);

    let source: Arc<dyn NumberSource> = Arc::new(VrfSource::new(engine));
    let rng_source = source.name().to_string();
    let processor = GameProcessor::new(store, source, config.game.clone(), metrics.clone())?;

    Ok(Arc::new(AppState {
        processor: Arc::new(processor),
        metrics,
        node_id: config.server.node_id.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        rng_source,
        vrf_public_key: Some(vrf_public_key),
        metrics_enabled: config.monitoring.enable_metrics,
    }))
}

/// Router plus the middleware stack
pub fn build_app(state: Arc<AppState>, config: &ServerConfig) -> axum::Router {
    create_router(state.clone())
        .layer(axum::middleware::from_fn_with_state(state, metrics_middleware))
        // Request ID middleware (first for tracing)
        .layer(axum::middleware::from_fn(request_id_middleware))
        // CORS layer (before timeout to handle preflight)
        .layer(create_cors_layer(config.allowed_origins.clone()))
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
}

pub struct ApiServer {
    config: RoyaleConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(config: RoyaleConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let app = build_app(self.state.clone(), &self.config.server);
        let addr = self.get_socket_addr()?;

        info!("🎰 Starting Roulette Royale API Server (HTTP)");
        info!("   Listen: http://{}", addr);
        self.log_server_info();

        let listener = tokio::net::TcpListener::bind(addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("🛑 API Server stopped gracefully");
        Ok(())
    }

    fn get_socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        Ok(SocketAddr::from((
            self.config.server.host.parse::<std::net::IpAddr>()?,
            self.config.server.port,
        )))
    }

    fn log_server_info(&self) {
        info!("📋 Server Configuration:");
        info!("   Node ID: {}", self.config.server.node_id);
        info!("   CORS: {:?}", self.config.server.allowed_origins);
        info!("   Request timeout: {}s", self.config.server.request_timeout_secs);
        info!("   Storage: {:?}", self.config.storage.backend);
        info!("   RNG source: {} (timeout {}ms)", self.state.rng_source, self.config.game.rng_timeout_ms);

        info!("📊 Available endpoints:");
        info!("   GET  /health                              - Health check");
        info!("   GET  /metrics                             - Prometheus metrics");
        info!("   GET  /api/paytable                        - Bet kinds and payout ratios");
        info!("   GET  /api/wheel                           - Pocket order and colours");
        info!("   POST /api/players                         - Open an account");
        info!("   GET  /api/players/:id                     - Account details");
        info!("   GET  /api/players/:id/history             - Recent rounds");
        info!("   POST /api/players/:id/daily-bonus         - Claim daily bonus");
        info!("   POST /api/players/:id/spin                - Place wagers and spin");
        info!("   GET  /api/leaderboard?type=               - Top players");
        info!("   POST /api/verify/spin                     - Verify a VRF spin");
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
