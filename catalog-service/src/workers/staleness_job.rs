//! Periodic re-scan scheduling.
//!
//! On every tick the job asks the store for stale streams and publishes one
//! scan request per candidate. It runs with system privileges so protected
//! streams are scheduled like any other.

use crate::config::StalenessConfig;
use crate::events::EventChannel;
use crate::lifecycle::{ScanRequestEvent, STREAM_SCAN_REQUEST_SUBJECT};
use crate::security::{AccessContext, SchemaRegistry, SecuredStore};
use crate::services::metrics::STALE_STREAMS;
use crate::services::store::DocumentStore;
use crate::services::streams;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub struct StalenessJob {
    config: StalenessConfig,
    store: SecuredStore,
    events: Arc<dyn EventChannel>,
    shutdown_token: CancellationToken,
}

impl StalenessJob {
    pub fn new(
        config: StalenessConfig,
        store: Arc<dyn DocumentStore>,
        registry: Arc<SchemaRegistry>,
        events: Arc<dyn EventChannel>,
    ) -> Self {
        Self {
            config,
            store: SecuredStore::new(store, registry, AccessContext::system()),
            events,
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Publish a scan request for every stream stale as of `now`.
    /// Returns how many were published.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let stale = streams::find_stale(&self.store, now).await?;
        metrics::gauge!(STALE_STREAMS).set(stale.len() as f64);

        let mut published = 0;
        for stream in &stale {
            let event = serde_json::to_value(ScanRequestEvent::new(&stream.name))?;
            match self.events.publish(STREAM_SCAN_REQUEST_SUBJECT, &event).await {
                Ok(()) => published += 1,
                Err(e) => tracing::error!(
                    stream = %stream.name,
                    error = %e,
                    "Failed to publish scan request"
                ),
            }
        }

        tracing::info!(candidates = stale.len(), published, "Staleness scan finished");
        Ok(published)
    }

    pub async fn start(self) {
        if !self.config.enabled {
            tracing::info!("Staleness job disabled by configuration");
            return;
        }

        tracing::info!(
            interval_secs = self.config.interval().as_secs(),
            "Starting staleness job"
        );

        let mut ticker = tokio::time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let shutdown = self.shutdown_token.clone();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Staleness job shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once(Utc::now()).await {
                        tracing::error!(error = %e, "Staleness scan failed");
                    }
                }
            }
        }
    }
}
