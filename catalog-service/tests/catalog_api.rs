mod common;

use axum::http::StatusCode;
use common::{names, TestApp, ADMIN, ALPHA_ITEM_ID, GAMMA_HIDDEN_ITEM_ID, GAMMA_ITEM_ID, JOE};
use serde_json::json;

#[tokio::test]
async fn non_privileged_user_does_not_see_protected_sources() {
    let app = TestApp::spawn().await;

    let response = app.get("/sources", Some(JOE)).await;

    assert_eq!(response.status, StatusCode::OK);
    let sources = names(&response.body);
    assert!(!sources.contains(&"com.alpha".to_string()));
    assert!(sources.contains(&"com.beta".to_string()));
    assert!(sources.contains(&"com.gamma".to_string()));

    app.shutdown().await;
}

#[tokio::test]
async fn privileged_user_sees_every_source() {
    let app = TestApp::spawn().await;

    let response = app.get("/sources", Some(ADMIN)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(names(&response.body).len(), 3);

    app.shutdown().await;
}

#[tokio::test]
async fn privileged_user_reads_protected_source() {
    let app = TestApp::spawn().await;

    let response = app.get("/source/com.alpha", Some(ADMIN)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["name"], "com.alpha");
    assert_eq!(response.body["security"]["protected"], true);
    assert!(response.body["id"].is_string());

    app.shutdown().await;
}

#[tokio::test]
async fn protected_source_is_not_found_for_non_privileged_user() {
    let app = TestApp::spawn().await;

    let hidden = app.get("/source/com.alpha", Some(JOE)).await;
    let missing = app.get("/source/com.nope", Some(JOE)).await;

    assert_eq!(hidden.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(hidden.body, missing.body);
    assert_eq!(hidden.body["error"], "Source not found");

    app.shutdown().await;
}

#[tokio::test]
async fn missing_user_header_is_unauthenticated() {
    let app = TestApp::spawn().await;

    let response = app.get("/sources", None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "No user specified");
    assert!(response.request_id.is_some());

    app.shutdown().await;
}

#[tokio::test]
async fn unknown_user_is_unauthenticated() {
    let app = TestApp::spawn().await;

    let response = app.get("/streams/stale", Some("Mallory")).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "User not found");

    app.shutdown().await;
}

#[tokio::test]
async fn source_streams_are_filtered() {
    let app = TestApp::spawn().await;

    let joe = app.get("/source/com.beta/streams", Some(JOE)).await;
    assert_eq!(joe.status, StatusCode::OK);
    let mut visible = names(&joe.body);
    visible.sort();
    assert_eq!(visible, vec!["com.beta-Cooking", "com.beta-Fresh"]);

    let admin = app.get("/source/com.beta/streams", Some(ADMIN)).await;
    assert_eq!(names(&admin.body).len(), 3);

    let hidden_source = app.get("/source/com.alpha/streams", Some(JOE)).await;
    assert_eq!(hidden_source.status, StatusCode::NOT_FOUND);

    app.shutdown().await;
}

#[tokio::test]
async fn stale_streams_respect_access_context() {
    let app = TestApp::spawn().await;

    let joe = app.get("/streams/stale", Some(JOE)).await;
    assert_eq!(joe.status, StatusCode::OK);
    let mut stale = names(&joe.body);
    stale.sort();
    assert_eq!(stale, vec!["com.beta-Cooking", "com.gamma-Live"]);

    let admin = app.get("/streams/stale", Some(ADMIN)).await;
    let mut stale = names(&admin.body);
    stale.sort();
    assert_eq!(
        stale,
        vec![
            "com.alpha-News",
            "com.beta-Cooking",
            "com.beta-Secret",
            "com.gamma-Live"
        ]
    );

    app.shutdown().await;
}

#[tokio::test]
async fn partial_update_touches_only_supplied_fields() {
    let app = TestApp::spawn().await;
    let before = app.stream_row("com.alpha-News").await;

    let response = app
        .put(
            "/stream/com.alpha-News",
            Some(ADMIN),
            json!({ "state": "SCAN_COMPLETE", "scannedAt": "2022-01-12T21:12:05Z" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["state"], "SCAN_COMPLETE");
    assert_eq!(response.body["scannedAt"], "2022-01-12T21:12:05+00:00");
    assert_eq!(response.body["externalId"], "News");
    assert_eq!(response.body["externalType"], "CHANNEL");
    assert_eq!(response.body["displayName"], "Alpha News");
    assert_eq!(response.body["enabled"], true);

    let after = app.stream_row("com.alpha-News").await;
    for field in ["externalId", "externalType", "displayName", "enabled", "deleted", "sourceId"] {
        assert_eq!(after.get(field), before.get(field), "{} changed", field);
    }
    assert!(after.get_datetime("updatedAt").unwrap() >= before.get_datetime("updatedAt").unwrap());
    assert_eq!(app.store.write_count(), 1);

    app.shutdown().await;
}

#[tokio::test]
async fn explicit_null_clears_a_column() {
    let app = TestApp::spawn().await;

    let response = app
        .put("/stream/com.alpha-News", Some(ADMIN), json!({ "externalId": null }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["externalId"].is_null());
    assert!(!app.stream_row("com.alpha-News").await.contains_key("externalId"));

    app.shutdown().await;
}

#[tokio::test]
async fn invalid_update_bodies_are_rejected() {
    let app = TestApp::spawn().await;

    let null_enabled = app
        .put("/stream/com.beta-Cooking", Some(ADMIN), json!({ "enabled": null }))
        .await;
    assert_eq!(null_enabled.status, StatusCode::BAD_REQUEST);

    let empty_text = app
        .put("/stream/com.beta-Cooking", Some(ADMIN), json!({ "scanCursor": "" }))
        .await;
    assert_eq!(empty_text.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(empty_text.body["error"], "Validation error");

    assert_eq!(app.store.write_count(), 0);

    app.shutdown().await;
}

#[tokio::test]
async fn updating_unknown_stream_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app
        .put("/stream/com.nope", Some(ADMIN), json!({ "state": "SCAN_REQUESTED" }))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Stream not found");

    app.shutdown().await;
}

#[tokio::test]
async fn updating_hidden_stream_does_not_reveal_it() {
    let app = TestApp::spawn().await;

    let items = app.get("/stream/com.alpha-News/items", Some(JOE)).await;
    assert_eq!(items.status, StatusCode::NOT_FOUND);

    let response = app
        .put("/stream/com.alpha-News", Some(JOE), json!({ "scanCursor": "page-2" }))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Stream not found");
    assert!(response.body.get("externalId").is_none());
    assert!(response.body.get("security").is_none());

    // The write is not filtered.
    assert_eq!(
        app.stream_row("com.alpha-News").await.get_str("scanCursor").unwrap(),
        "page-2"
    );

    let public = app
        .put("/stream/com.beta-Cooking", Some(JOE), json!({ "scanCursor": "page-2" }))
        .await;
    assert_eq!(public.status, StatusCode::OK);
    assert_eq!(public.body["scanCursor"], "page-2");

    app.shutdown().await;
}

#[tokio::test]
async fn stream_items_are_filtered() {
    let app = TestApp::spawn().await;

    let joe = app.get("/stream/com.gamma-Live/items", Some(JOE)).await;
    assert_eq!(joe.status, StatusCode::OK);
    assert_eq!(names(&joe.body), vec!["Episode 1"]);
    assert_eq!(joe.body[0]["previewAssets"][0]["type"], "IMAGE");

    let admin = app.get("/stream/com.gamma-Live/items", Some(ADMIN)).await;
    assert_eq!(names(&admin.body).len(), 2);

    let hidden_stream = app.get("/stream/com.alpha-News/items", Some(JOE)).await;
    assert_eq!(hidden_stream.status, StatusCode::NOT_FOUND);

    app.shutdown().await;
}

#[tokio::test]
async fn single_item_is_filtered() {
    let app = TestApp::spawn().await;

    let visible = app.get(&format!("/item/{}", GAMMA_ITEM_ID), Some(JOE)).await;
    assert_eq!(visible.status, StatusCode::OK);
    assert_eq!(visible.body["externalRef"], "ep-1");

    for id in [GAMMA_HIDDEN_ITEM_ID, ALPHA_ITEM_ID, "item-missing"] {
        let response = app.get(&format!("/item/{}", id), Some(JOE)).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{}", id);
        assert_eq!(response.body["error"], "ContentItem not found");
    }

    let admin = app.get(&format!("/item/{}", ALPHA_ITEM_ID), Some(ADMIN)).await;
    assert_eq!(admin.status, StatusCode::OK);

    app.shutdown().await;
}

#[tokio::test]
async fn health_is_unauthenticated_and_echoes_request_id() {
    let app = TestApp::spawn().await;

    let response = app.get("/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["service"], "catalog-service");
    assert!(response.request_id.is_some());

    let ready = app.get("/ready", None).await;
    assert_eq!(ready.status, StatusCode::OK);

    app.shutdown().await;
}
