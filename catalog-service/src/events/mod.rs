//! Event channel abstraction.
//!
//! Subjects carry JSON payloads. Subscribers join a named group: within a
//! group each event is delivered to exactly one member, and every group sees
//! every event. Handler failures are logged and never stop a subscription.

pub mod memory;
pub mod redis;

use crate::services::metrics::{EVENTS_FAILED, EVENTS_HANDLED};
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use service_core::error::AppError;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use memory::InMemoryEventChannel;
pub use self::redis::RedisEventChannel;

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, payload: Value) -> Result<(), AppError>;
}

#[async_trait]
pub trait EventChannel: Send + Sync {
    async fn publish(&self, subject: &str, payload: &Value) -> Result<(), AppError>;

    /// Start consuming `subject` as a member of `group`.
    async fn subscribe(
        &self,
        subject: &str,
        group: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<Subscription, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

/// A running consumer loop. Dropping it leaves the loop running.
pub struct Subscription {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn new(token: CancellationToken, task: JoinHandle<()>) -> Self {
        Self { token, task }
    }

    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Subscription task ended abnormally");
        }
    }
}

/// Run one handler invocation, containing errors and panics.
///
/// Returns whether the handler succeeded. Either way the event counts as
/// consumed.
pub(crate) async fn dispatch(handler: &dyn EventHandler, subject: &str, payload: Value) -> bool {
    let outcome = AssertUnwindSafe(handler.handle(payload)).catch_unwind().await;

    match outcome {
        Ok(Ok(())) => {
            metrics::counter!(EVENTS_HANDLED, "subject" => subject.to_string()).increment(1);
            true
        }
        Ok(Err(e)) => {
            metrics::counter!(EVENTS_FAILED, "subject" => subject.to_string()).increment(1);
            tracing::error!(subject = %subject, error = %e, "Event handler failed");
            false
        }
        Err(_) => {
            metrics::counter!(EVENTS_FAILED, "subject" => subject.to_string()).increment(1);
            tracing::error!(subject = %subject, "Event handler panicked");
            false
        }
    }
}
