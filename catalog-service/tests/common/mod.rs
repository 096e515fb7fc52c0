#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use catalog_service::events::{EventChannel, EventHandler, InMemoryEventChannel, Subscription};
use catalog_service::lifecycle::{ScanLifecycle, SCAN_QUEUE_GROUP, STREAM_SCAN_REQUEST_SUBJECT};
use catalog_service::models::{
    AssetType, ContentItem, PreviewAsset, ScanState, SecurityDescriptor, Source, Stream, User,
};
use catalog_service::security::{Entity, USER_HEADER};
use catalog_service::services::{DocumentStore, MemoryStore};
use catalog_service::startup::{router, AppState};
use chrono::{Duration, TimeZone, Utc};
use mongodb::bson;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const ADMIN: &str = "Admin";
pub const JOE: &str = "Joe";

pub const ALPHA_ITEM_ID: &str = "item-alpha-breaking";
pub const GAMMA_ITEM_ID: &str = "item-gamma-episode";
pub const GAMMA_HIDDEN_ITEM_ID: &str = "item-gamma-hidden";

pub struct TestResponse {
    pub status: StatusCode,
    pub request_id: Option<String>,
    pub body: Value,
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub events: Arc<InMemoryEventChannel>,
    pub state: AppState,
    router: Router,
    subscription: Option<Subscription>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let store = Arc::new(MemoryStore::new());
        seed(&store).await;

        let events = Arc::new(InMemoryEventChannel::new());
        let state = AppState::new(store.clone(), events.clone());

        let handler: Arc<dyn EventHandler> = Arc::new(ScanLifecycle::new(
            state.store.clone(),
            state.registry.clone(),
        ));
        let subscription = events
            .subscribe(STREAM_SCAN_REQUEST_SUBJECT, SCAN_QUEUE_GROUP, handler)
            .await
            .expect("Failed to subscribe scan lifecycle");

        Self {
            router: router(state.clone()),
            store,
            events,
            state,
            subscription: Some(subscription),
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_HEADER, user);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            request_id,
            body,
        }
    }

    pub async fn get(&self, uri: &str, user: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, user, None).await
    }

    pub async fn put(&self, uri: &str, user: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, user, Some(body)).await
    }

    pub async fn stream_row(&self, name: &str) -> bson::Document {
        self.store
            .find_one(
                Stream::COLLECTION,
                &catalog_service::services::streams::by_name(name),
            )
            .await
            .expect("Failed to read stream")
            .expect("Stream missing")
    }

    pub async fn shutdown(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.shutdown().await;
        }
    }
}

pub fn names(body: &Value) -> Vec<String> {
    body.as_array()
        .expect("Expected a JSON array")
        .iter()
        .map(|v| v["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

async fn insert<E: Entity>(store: &MemoryStore, entity: &E) {
    store
        .insert_one(E::COLLECTION, bson::to_document(entity).expect("Failed to encode"))
        .await
        .expect("Failed to seed");
}

/// Users `Admin` (privileged) and `Joe`; a protected source `com.alpha`,
/// public sources `com.beta` and `com.gamma`.
async fn seed(store: &MemoryStore) {
    insert(store, &User::new(ADMIN, true)).await;
    insert(store, &User::new(JOE, false)).await;

    let long_ago = bson::DateTime::from_chrono(Utc.with_ymd_and_hms(2022, 1, 12, 21, 12, 5).unwrap());

    let alpha = Source::new("com.alpha", SecurityDescriptor::protected());
    let beta = Source::new("com.beta", SecurityDescriptor::public());
    let gamma = Source::new("com.gamma", SecurityDescriptor::public());
    for source in [&alpha, &beta, &gamma] {
        insert(store, source).await;
    }

    let mut news = Stream::new(&alpha.id, "com.alpha-News", SecurityDescriptor::protected());
    news.external_type = Some("CHANNEL".to_string());
    news.external_id = Some("News".to_string());
    news.display_name = Some("Alpha News".to_string());
    insert(store, &news).await;

    let cooking = Stream::new(&beta.id, "com.beta-Cooking", SecurityDescriptor::public());
    insert(store, &cooking).await;

    let mut secret = Stream::new(&beta.id, "com.beta-Secret", SecurityDescriptor::protected());
    secret.state = Some(ScanState::ScanComplete);
    secret.scanned_at = Some(long_ago);
    insert(store, &secret).await;

    let mut fresh = Stream::new(&beta.id, "com.beta-Fresh", SecurityDescriptor::public());
    fresh.state = Some(ScanState::ScanComplete);
    fresh.scanned_at = Some(bson::DateTime::from_chrono(Utc::now() - Duration::hours(1)));
    insert(store, &fresh).await;

    let mut live = Stream::new(&gamma.id, "com.gamma-Live", SecurityDescriptor::public());
    live.state = Some(ScanState::ScanComplete);
    live.scanned_at = Some(long_ago);
    insert(store, &live).await;

    let mut queued = Stream::new(&gamma.id, "com.gamma-Queued", SecurityDescriptor::public());
    queued.state = Some(ScanState::ScanQueued);
    insert(store, &queued).await;

    let mut breaking = ContentItem::new(&news.id, "Breaking", SecurityDescriptor::protected());
    breaking.id = ALPHA_ITEM_ID.to_string();
    insert(store, &breaking).await;

    let mut episode = ContentItem::new(&live.id, "Episode 1", SecurityDescriptor::public());
    episode.id = GAMMA_ITEM_ID.to_string();
    episode.external_ref = Some("ep-1".to_string());
    episode.preview_assets = vec![PreviewAsset {
        kind: AssetType::Image,
        external_ref: "https://cdn.example.com/ep-1.jpg".to_string(),
    }];
    insert(store, &episode).await;

    let mut hidden = ContentItem::new(&live.id, "Director's Cut", SecurityDescriptor::protected());
    hidden.id = GAMMA_HIDDEN_ITEM_ID.to_string();
    insert(store, &hidden).await;
}
