//! In-process event channel.
//!
//! Events published before any group exists on a subject are retained and
//! handed to the first group that subscribes, mirroring a work-queue stream.
//! The backlog is capped; once full, the oldest events are dropped.

use crate::events::{dispatch, EventChannel, EventHandler, Subscription};
use crate::services::metrics::EVENTS_PUBLISHED;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use service_core::error::AppError;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_BACKLOG_LIMIT: usize = 10_000;

type SharedReceiver = Arc<Mutex<mpsc::UnboundedReceiver<Value>>>;

struct Group {
    sender: mpsc::UnboundedSender<Value>,
    receiver: SharedReceiver,
}

#[derive(Default)]
struct Topic {
    groups: HashMap<String, Group>,
    backlog: VecDeque<Value>,
}

pub struct InMemoryEventChannel {
    topics: DashMap<String, Topic>,
    backlog_limit: usize,
}

impl Default for InMemoryEventChannel {
    fn default() -> Self {
        Self::with_backlog_limit(DEFAULT_BACKLOG_LIMIT)
    }
}

impl InMemoryEventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backlog_limit(backlog_limit: usize) -> Self {
        Self {
            topics: DashMap::new(),
            backlog_limit: backlog_limit.max(1),
        }
    }

    /// Events waiting for a first subscriber on `subject`.
    pub fn backlog_len(&self, subject: &str) -> usize {
        self.topics.get(subject).map_or(0, |t| t.backlog.len())
    }
}

#[async_trait]
impl EventChannel for InMemoryEventChannel {
    async fn publish(&self, subject: &str, payload: &Value) -> Result<(), AppError> {
        let mut topic = self.topics.entry(subject.to_string()).or_default();
        if topic.groups.is_empty() {
            if topic.backlog.len() >= self.backlog_limit {
                topic.backlog.pop_front();
                tracing::warn!(
                    subject = %subject,
                    limit = self.backlog_limit,
                    "Backlog full, dropping oldest event"
                );
            }
            topic.backlog.push_back(payload.clone());
        } else {
            for (name, group) in &topic.groups {
                if group.sender.send(payload.clone()).is_err() {
                    tracing::warn!(subject = %subject, group = %name, "Dropping event for closed group");
                }
            }
        }
        metrics::counter!(EVENTS_PUBLISHED, "subject" => subject.to_string()).increment(1);
        tracing::debug!(subject = %subject, "Published event");
        Ok(())
    }

    async fn subscribe(
        &self,
        subject: &str,
        group: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<Subscription, AppError> {
        let receiver = {
            let mut topic = self.topics.entry(subject.to_string()).or_default();
            let first_group = topic.groups.is_empty();
            let backlog = std::mem::take(&mut topic.backlog);

            let group = topic.groups.entry(group.to_string()).or_insert_with(|| {
                let (sender, receiver) = mpsc::unbounded_channel();
                Group {
                    sender,
                    receiver: Arc::new(Mutex::new(receiver)),
                }
            });
            if first_group {
                for payload in backlog {
                    let _ = group.sender.send(payload);
                }
            }
            group.receiver.clone()
        };

        tracing::info!(subject = %subject, group = %group, "Subscribed to subject");

        let token = CancellationToken::new();
        let cancel = token.clone();
        let subject = subject.to_string();
        let task = tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    _ = cancel.cancelled() => None,
                    payload = async { receiver.lock().await.recv().await } => payload,
                };
                match next {
                    Some(payload) => {
                        dispatch(handler.as_ref(), &subject, payload).await;
                    }
                    None => break,
                }
            }
            tracing::info!(subject = %subject, "Subscription stopped");
        });

        Ok(Subscription::new(token, task))
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
