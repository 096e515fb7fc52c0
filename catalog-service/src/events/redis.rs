//! Event channel on Redis Streams.
//!
//! Each subject is a stream key and each subscription group a consumer
//! group. Entries are acknowledged after the handler returns, whatever the
//! outcome, so a crash mid-handler leaves the entry pending for this
//! consumer. Pending entries are replayed when the consumer starts and after
//! every read or acknowledge failure.

use crate::events::{dispatch, EventChannel, EventHandler, Subscription};
use crate::services::metrics::EVENTS_PUBLISHED;
use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::streams::StreamReadReply;
use redis::{Client, RedisError};
use serde_json::Value;
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const PAYLOAD_FIELD: &str = "payload";
const STREAM_MAX_LEN: usize = 10_000;
const READ_COUNT: usize = 16;

#[derive(Clone)]
pub struct RedisEventChannel {
    client: Client,
    manager: ConnectionManager,
    consumer: String,
    block_ms: u64,
}

impl RedisEventChannel {
    pub async fn new(url: &str, consumer: impl Into<String>, block_ms: u64) -> Result<Self, AppError> {
        tracing::info!("Connecting to Redis event channel");
        let client = Client::open(url)?;

        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            AppError::from(e)
        })?;

        tracing::info!("Successfully connected to Redis event channel");

        Ok(Self {
            client,
            manager,
            consumer: consumer.into(),
            block_ms,
        })
    }

    async fn ensure_group(&self, subject: &str, group: &str) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        let created: Result<(), RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(subject)
            .arg(group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match created {
            Ok(()) => {
                tracing::info!(subject = %subject, group = %group, "Created consumer group");
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl EventChannel for RedisEventChannel {
    async fn publish(&self, subject: &str, payload: &Value) -> Result<(), AppError> {
        let body = serde_json::to_string(payload)?;
        let mut conn = self.manager.clone();

        let id: String = redis::cmd("XADD")
            .arg(subject)
            .arg("MAXLEN")
            .arg("~")
            .arg(STREAM_MAX_LEN)
            .arg("*")
            .arg(PAYLOAD_FIELD)
            .arg(body)
            .query_async(&mut conn)
            .await?;

        metrics::counter!(EVENTS_PUBLISHED, "subject" => subject.to_string()).increment(1);
        tracing::debug!(subject = %subject, entry_id = %id, "Published event");
        Ok(())
    }

    async fn subscribe(
        &self,
        subject: &str,
        group: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<Subscription, AppError> {
        self.ensure_group(subject, group).await?;

        let token = CancellationToken::new();
        let consumer = GroupConsumer {
            client: self.client.clone(),
            subject: subject.to_string(),
            group: group.to_string(),
            consumer: self.consumer.clone(),
            block_ms: self.block_ms,
            handler,
        };

        tracing::info!(
            subject = %subject,
            group = %group,
            consumer = %self.consumer,
            "Subscribed to subject"
        );

        let task = tokio::spawn(consumer.run(token.clone()));
        Ok(Subscription::new(token, task))
    }

    async fn health_check(&self) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| {
                tracing::error!("Redis health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }
}

/// Where the next `XREADGROUP` starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadFrom {
    /// Entries delivered to this consumer but never acknowledged.
    Pending,
    /// Entries not yet delivered to any consumer of the group.
    New,
}

impl ReadFrom {
    fn id(self) -> &'static str {
        match self {
            ReadFrom::Pending => "0",
            ReadFrom::New => ">",
        }
    }

    fn after_batch(self, count: usize) -> Self {
        match (self, count) {
            (ReadFrom::Pending, 0) => ReadFrom::New,
            (from, _) => from,
        }
    }

    /// A failed read or acknowledge may leave part of a batch pending.
    fn after_error(self) -> Self {
        ReadFrom::Pending
    }
}

struct GroupConsumer {
    client: Client,
    subject: String,
    group: String,
    consumer: String,
    block_ms: u64,
    handler: Arc<dyn EventHandler>,
}

impl GroupConsumer {
    async fn run(self, cancel: CancellationToken) {
        let mut backoff = ExponentialBackoff {
            max_elapsed_time: None,
            max_interval: Duration::from_secs(30),
            ..Default::default()
        };
        let mut conn: Option<MultiplexedConnection> = None;
        let mut from = ReadFrom::Pending;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.poll(&mut conn, from) => result,
            };

            match result {
                Ok(count) => {
                    let next = from.after_batch(count);
                    if next != from {
                        tracing::debug!(subject = %self.subject, "Pending entries replayed");
                    }
                    from = next;
                    backoff.reset();
                }
                Err(e) => {
                    conn = None;
                    from = from.after_error();
                    let delay = backoff.next_backoff().unwrap_or(backoff.max_interval);
                    tracing::warn!(
                        subject = %self.subject,
                        group = %self.group,
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "Event read failed"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        tracing::info!(subject = %self.subject, group = %self.group, "Subscription stopped");
    }

    /// Read one batch, dispatch and acknowledge it. Returns the batch size.
    async fn poll(
        &self,
        conn: &mut Option<MultiplexedConnection>,
        from: ReadFrom,
    ) -> Result<usize, RedisError> {
        if conn.is_none() {
            *conn = Some(self.client.get_multiplexed_async_connection().await?);
        }
        let Some(conn) = conn.as_mut() else {
            return Ok(0);
        };

        let mut read = redis::cmd("XREADGROUP");
        read.arg("GROUP")
            .arg(&self.group)
            .arg(&self.consumer)
            .arg("COUNT")
            .arg(READ_COUNT);
        if from == ReadFrom::New {
            read.arg("BLOCK").arg(self.block_ms);
        }
        read.arg("STREAMS").arg(&self.subject).arg(from.id());

        let reply: Option<StreamReadReply> = read.query_async(conn).await?;
        let entries: Vec<_> = reply
            .map(|r| r.keys.into_iter().flat_map(|k| k.ids).collect())
            .unwrap_or_default();
        let count = entries.len();

        for entry in entries {
            match entry.get::<String>(PAYLOAD_FIELD) {
                Some(body) => match serde_json::from_str::<Value>(&body) {
                    Ok(payload) => {
                        dispatch(self.handler.as_ref(), &self.subject, payload).await;
                    }
                    Err(e) => tracing::error!(
                        subject = %self.subject,
                        entry_id = %entry.id,
                        error = %e,
                        "Dropping event with malformed payload"
                    ),
                },
                None => tracing::error!(
                    subject = %self.subject,
                    entry_id = %entry.id,
                    "Dropping event without payload"
                ),
            }

            redis::cmd("XACK")
                .arg(&self.subject)
                .arg(&self.group)
                .arg(&entry.id)
                .query_async::<_, i64>(conn)
                .await?;
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(AtomicUsize);

    #[async_trait]
    impl EventHandler for Counting {
        async fn handle(&self, _payload: Value) -> Result<(), AppError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_read_moves_to_new_entries_once_pending_is_drained() {
        assert_eq!(ReadFrom::Pending.id(), "0");
        assert_eq!(ReadFrom::Pending.after_batch(3), ReadFrom::Pending);
        assert_eq!(ReadFrom::Pending.after_batch(0), ReadFrom::New);
        assert_eq!(ReadFrom::New.after_batch(0), ReadFrom::New);
        assert_eq!(ReadFrom::New.id(), ">");
    }

    #[test]
    fn test_failure_returns_to_pending_replay() {
        assert_eq!(ReadFrom::New.after_error(), ReadFrom::Pending);
        assert_eq!(ReadFrom::Pending.after_error(), ReadFrom::Pending);
    }

    #[tokio::test]
    #[ignore] // Requires running Redis
    async fn test_publish_and_consume() {
        let channel = RedisEventChannel::new("redis://127.0.0.1:6379", "test-consumer", 100)
            .await
            .unwrap();
        let handler = Arc::new(Counting(AtomicUsize::new(0)));
        let subject = format!("work.test.{}", uuid::Uuid::new_v4());

        let sub = channel
            .subscribe(&subject, "catalog-service", handler.clone())
            .await
            .unwrap();
        channel.publish(&subject, &json!({ "streamName": "a" })).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(handler.0.load(Ordering::SeqCst), 1);
        sub.shutdown().await;
    }
}
