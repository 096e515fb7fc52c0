use crate::config::{CatalogConfig, EventBackend};
use crate::events::{EventChannel, EventHandler, InMemoryEventChannel, RedisEventChannel, Subscription};
use crate::handlers;
use crate::lifecycle::{ScanLifecycle, SCAN_QUEUE_GROUP, STREAM_SCAN_REQUEST_SUBJECT};
use crate::security::SchemaRegistry;
use crate::services::{DocumentStore, MongoDb};
use crate::workers::StalenessJob;
use axum::{
    middleware::from_fn,
    routing::{get, put},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{make_request_span, request_id_middleware},
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub registry: Arc<SchemaRegistry>,
    pub events: Arc<dyn EventChannel>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, events: Arc<dyn EventChannel>) -> Self {
        Self {
            store,
            registry: Arc::new(SchemaRegistry::canonical()),
            events,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/sources", get(handlers::list_sources))
        .route("/source/:key", get(handlers::get_source))
        .route("/source/:key/streams", get(handlers::list_source_streams))
        .route("/streams/stale", get(handlers::list_stale_streams))
        .route("/stream/:key", put(handlers::update_stream))
        .route("/stream/:key/items", get(handlers::list_stream_items))
        .route("/item/:key", get(handlers::get_item))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<axum::body::Body>))
        .layer(from_fn(request_id_middleware))
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
    subscription: Subscription,
    job_token: CancellationToken,
}

impl Application {
    pub async fn build(config: CatalogConfig) -> Result<Self, AppError> {
        let db = MongoDb::connect(config.mongodb.uri.expose_secret(), &config.mongodb.database)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to MongoDB: {}", e);
                e
            })?;
        db.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let events: Arc<dyn EventChannel> = match config.events.backend {
            EventBackend::Redis => Arc::new(
                RedisEventChannel::new(
                    config.events.redis_url.expose_secret(),
                    config.events.instance_id.clone(),
                    config.events.block_ms,
                )
                .await
                .map_err(|e| {
                    tracing::error!("Failed to connect to Redis event channel: {}", e);
                    e
                })?,
            ),
            EventBackend::Memory => {
                tracing::warn!("Using in-memory event channel; events do not leave this process");
                Arc::new(InMemoryEventChannel::new())
            }
        };

        let state = AppState::new(Arc::new(db), events);

        let handler: Arc<dyn EventHandler> = Arc::new(ScanLifecycle::new(
            state.store.clone(),
            state.registry.clone(),
        ));
        let subscription = state
            .events
            .subscribe(STREAM_SCAN_REQUEST_SUBJECT, SCAN_QUEUE_GROUP, handler)
            .await?;

        let job = StalenessJob::new(
            config.staleness.clone(),
            state.store.clone(),
            state.registry.clone(),
            state.events.clone(),
        );
        let job_token = job.shutdown_token();
        tokio::spawn(job.start());

        let app = router(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
            subscription,
            job_token,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until a shutdown signal, then stop background work.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let result = self.server.await;

        tracing::info!("Stopping background workers");
        self.job_token.cancel();
        self.subscription.shutdown().await;

        result
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
