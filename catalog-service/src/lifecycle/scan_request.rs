//! Consumer side of scan requests.
//!
//! A scan request names a stream; consuming it moves the stream to
//! `SCAN_QUEUED`. The transition is idempotent, and a request naming an
//! unknown stream changes nothing.

use crate::events::EventHandler;
use crate::models::{Stream, StreamUpdate};
use crate::security::{AccessContext, SchemaRegistry, SecuredStore};
use crate::services::store::DocumentStore;
use crate::services::streams;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service_core::error::AppError;
use std::sync::Arc;

pub const STREAM_SCAN_REQUEST_SUBJECT: &str = "work.stream_scan_request";
pub const SCAN_QUEUE_GROUP: &str = "catalog-service";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequestEvent {
    #[serde(alias = "name", alias = "stream")]
    pub stream_name: String,
}

impl ScanRequestEvent {
    pub fn new(stream_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
        }
    }
}

pub struct ScanLifecycle {
    store: SecuredStore,
}

impl ScanLifecycle {
    pub fn new(store: Arc<dyn DocumentStore>, registry: Arc<SchemaRegistry>) -> Self {
        Self {
            store: SecuredStore::new(store, registry, AccessContext::system()),
        }
    }

    /// Mark the named stream `SCAN_QUEUED`. Returns the stream when it exists.
    pub async fn handle_scan_request(
        &self,
        event: &ScanRequestEvent,
    ) -> Result<Option<Stream>, AppError> {
        let updated = streams::update(
            &self.store,
            &event.stream_name,
            &StreamUpdate::queued(),
            Utc::now(),
        )
        .await?;

        if updated.is_none() {
            tracing::warn!(stream = %event.stream_name, "Scan requested for unknown stream");
        }
        Ok(updated)
    }
}

#[async_trait]
impl EventHandler for ScanLifecycle {
    async fn handle(&self, payload: Value) -> Result<(), AppError> {
        let event: ScanRequestEvent = serde_json::from_value(payload).map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Malformed scan request: {}", e))
        })?;
        tracing::info!(stream = %event.stream_name, "Received scan request");
        self.handle_scan_request(&event).await?;
        Ok(())
    }
}
