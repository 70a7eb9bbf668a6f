//! HTTP-level tests: the router is driven in-process with `oneshot`.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use casper_recorder::api::{routes::create_router, state::AppState};

fn app() -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::default());
    (create_router(Arc::clone(&state)), state)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn start(app: &Router) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/recording/start",
        Some(json!({ "start_url": "http://shop.test/" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "recording");
    body["session_id"].as_str().unwrap().to_string()
}

const PAGE: &str = r#"<html><head><title>Shop</title></head><body>
    <form id="search"><input name="q"><button type="submit">Go</button></form>
    <p id="result">Found</p>
</body></html>"#;

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["recording"], false);
}

#[tokio::test]
async fn test_record_and_stop() {
    let (app, _) = app();
    let id = start(&app).await;

    for value in ["sho", "shoes"] {
        let (status, _) = call(
            &app,
            Method::POST,
            &format!("/recording/{}/events", id),
            Some(json!({ "type": "input", "target": "#search [name=\"q\"]", "value": value })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, body) = call(
        &app,
        Method::POST,
        &format!("/recording/{}/events", id),
        Some(json!({ "type": "doClick", "target": "#go" })),
    )
    .await;
    assert_eq!(body["events"].as_array().unwrap().len(), 3);
    assert_eq!(body["events"][1]["value"], "shoes");

    let (status, body) = call(&app, Method::GET, &format!("/recording/{}/status", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event_count"], 3);
    assert_eq!(body["start_url"], "http://shop.test/");

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/recording/{}/stop", id),
        Some(json!({ "title": "Search" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event_count"], 3);
    let script = body["script"].as_str().unwrap();
    assert!(script.contains("casper.test.begin('Search', function (test) {"));
    assert!(script.contains("'shoes', {reset: true}"));
    assert!(script.contains("this.click('#go');"));

    // The session is gone once stopped
    let (status, body) = call(&app, Method::GET, &format!("/recording/{}/status", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn test_replace_events() {
    let (app, _) = app();
    let id = start(&app).await;

    let events = json!([
        { "type": "start", "url": "http://shop.test/" },
        { "type": "addComment", "value": "from the page" }
    ]);
    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/recording/{}/events", id),
        Some(json!({ "events": events })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events"][1], json!({ "type": "comment", "text": "from the page" }));

    let (_, body) = call(&app, Method::GET, &format!("/recording/{}/events", id), None).await;
    assert_eq!(body["active"], true);
    assert_eq!(body["events"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let (app, _) = app();
    start(&app).await;
    let (status, _) = call(&app, Method::POST, "/recording/missing/cancel", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_event_is_rejected() {
    let (app, _) = app();
    let id = start(&app).await;
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/recording/{}/events", id),
        Some(json!({ "type": "hover", "target": "#x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad Request");
}

#[tokio::test]
async fn test_capture_and_context() {
    let (app, _) = app();
    let id = start(&app).await;

    // body > form > input
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/recording/{}/capture", id),
        Some(json!({ "html": PAGE, "path": [1, 0, 0], "event": "input", "value": "boots" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["events"][1],
        json!({ "type": "input", "target": "#search [name=\"q\"]", "value": "boots" })
    );

    let (_, body) = call(
        &app,
        Method::POST,
        &format!("/recording/{}/context", id),
        Some(json!({
            "html": PAGE,
            "path": [1, 1],
            "action": "checkText",
            "text": "Found"
        })),
    )
    .await;
    assert_eq!(
        body["events"][2],
        json!({ "type": "checkText", "target": "#result", "text": "Found" })
    );

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/recording/{}/capture", id),
        Some(json!({ "html": PAGE, "path": [9, 9], "event": "click" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_messages_contract() {
    let (app, _) = app();

    let (_, body) = call(&app, Method::POST, "/messages", Some(json!({ "action": "get_events" }))).await;
    assert_eq!(body, json!({ "reply": "events", "events": [], "active": false }));

    let (_, body) = call(
        &app,
        Method::POST,
        "/messages",
        Some(json!({ "action": "start", "url": "http://x/" })),
    )
    .await;
    assert_eq!(body["reply"], "started");
    let session_id = body["session_id"].clone();

    let (_, body) = call(
        &app,
        Method::POST,
        "/messages",
        Some(json!({ "action": "open", "url": "http://x/next" })),
    )
    .await;
    assert_eq!(body, json!({ "reply": "ack" }));

    let (_, body) = call(&app, Method::POST, "/messages", Some(json!({ "action": "get_events" }))).await;
    assert_eq!(body["session_id"], session_id);
    assert_eq!(body["events"][1], json!({ "type": "openUrl", "url": "http://x/next" }));

    let (status, _) = call(
        &app,
        Method::POST,
        "/messages",
        Some(json!({ "action": "events", "session_id": "gone", "events": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = call(&app, Method::POST, "/messages", Some(json!({ "action": "stop" }))).await;
    assert_eq!(body["reply"], "script");
    assert!(body["script"]
        .as_str()
        .unwrap()
        .contains("casper.test.begin('Recorded test'"));

    let (status, _) = call(&app, Method::POST, "/messages", Some(json!({ "action": "stop" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_render_is_stateless() {
    let (app, state) = app();
    let request = json!({
        "events": [
            { "type": "start", "url": "http://x/" },
            { "type": "checkPageTitle", "title": "Shop" }
        ],
        "title": "Title check",
        "format": "html"
    });

    let (status, body) = call(&app, Method::POST, "/render", Some(request)).await;
    assert_eq!(status, StatusCode::OK);
    let script = body["script"].as_str().unwrap();
    assert!(script.starts_with("<pre>"));
    assert!(script.contains("test.assertTitle('Shop');"));
    assert!(!state.coordinator.events().await.1);
}

#[tokio::test]
async fn test_render_skips_malformed_events() {
    let (app, _) = app();
    let request = json!({
        "events": [
            { "type": "start", "url": "http://x/" },
            { "type": "click" },
            { "type": "checkElement", "target": "#ok" }
        ]
    });

    let (status, body) = call(&app, Method::POST, "/render", Some(request)).await;
    assert_eq!(status, StatusCode::OK);
    let script = body["script"].as_str().unwrap();
    assert!(script.contains("test.assertExists('#ok');"));
}

#[tokio::test]
async fn test_replace_events_coalesces_and_skips_malformed() {
    let (app, _) = app();
    let id = start(&app).await;

    let events = json!([
        { "type": "start", "url": "http://shop.test/" },
        { "type": "input", "target": "#q", "value": "a" },
        { "type": "input", "target": "#q", "value": "ab" },
        42
    ]);
    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/recording/{}/events", id),
        Some(json!({ "events": events })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[1], json!({ "type": "input", "target": "#q", "value": "ab" }));
}

#[tokio::test]
async fn test_resolve_selector() {
    let (app, _) = app();
    let (status, body) = call(
        &app,
        Method::POST,
        "/selector",
        Some(json!({ "html": PAGE, "path": [1, 0, 1] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "selector": "button[type=\"submit\"]", "unique": true }));
}
