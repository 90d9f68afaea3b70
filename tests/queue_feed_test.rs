//! Queue feed integration tests: poll-only operation, WebSocket takeover,
//! malformed-frame degradation and fallback to polling on disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use futures_util::SinkExt;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use totem_gateway::config::TotemConfig;
use totem_gateway::providers::vendor::VendorApi;
use totem_gateway::queue::QueueFeed;

async fn login_handler() -> impl IntoResponse {
    Json(json!({ "accessToken": "tok-1", "expiresIn": 3600 }))
}

async fn queue_handler() -> impl IntoResponse {
    Json(json!([{ "senha": "P010", "guiche": "01" }]))
}

/// Vendor REST mock: login plus a static queue snapshot.
async fn spawn_vendor_mock() -> String {
    let app = Router::new()
        .route("/login/externo", post(login_handler))
        .route("/queue/panel", get(queue_handler));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// One-shot panel WebSocket server: frames pushed through the channel are
/// forwarded to the first client; dropping the sender closes the socket.
async fn spawn_panel_ws() -> (String, mpsc::Sender<Message>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (frame_tx, mut frame_rx) = mpsc::channel::<Message>(8);

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(frame) = frame_rx.recv().await {
            if ws.send(frame).await.is_err() {
                break;
            }
        }
        let _ = ws.close(None).await;
    });

    (format!("ws://{}", addr), frame_tx)
}

fn test_config(base_url: String, panel_ws_url: Option<String>) -> TotemConfig {
    TotemConfig {
        api_base_url: base_url,
        api_timeout: Duration::from_secs(5),
        username: "totem01".to_string(),
        password: "secret".to_string(),
        empresa: "1".to_string(),
        panel_ws_url,
        poll_interval: Duration::from_millis(100),
        host: "127.0.0.1".to_string(),
        port: 0,
    }
}

#[tokio::test]
async fn zero_poll_interval_does_not_kill_the_feed() {
    // A zero period would panic tokio's interval timer inside the poll
    // task; the feed clamps it, so a snapshot still arrives.
    let base_url = spawn_vendor_mock().await;
    let vendor = Arc::new(VendorApi::new(&test_config(base_url, None)).unwrap());
    let feed = QueueFeed::spawn(vendor, Duration::ZERO, None);

    let mut rx = feed.subscribe();
    timeout(Duration::from_secs(5), rx.wait_for(|s| !s.entries.is_empty()))
        .await
        .expect("poll task should survive a zero interval")
        .unwrap();
}

#[tokio::test]
async fn poll_only_feed_populates_entries() {
    let base_url = spawn_vendor_mock().await;
    let vendor = Arc::new(VendorApi::new(&test_config(base_url, None)).unwrap());
    let feed = QueueFeed::spawn(vendor, Duration::from_millis(100), None);

    let mut rx = feed.subscribe();
    timeout(Duration::from_secs(5), rx.wait_for(|s| !s.entries.is_empty()))
        .await
        .expect("first poll within deadline")
        .unwrap();

    let state = feed.state();
    assert_eq!(state.entries[0].senha, "P010");
    assert!(!state.realtime, "poll-only feed never claims realtime");
    assert!(state.last_error.is_none());
    assert!(state.updated_at.is_some());
}

#[tokio::test]
async fn websocket_takes_over_and_survives_malformed_frames() {
    let base_url = spawn_vendor_mock().await;
    let (ws_url, frame_tx) = spawn_panel_ws().await;

    let vendor = Arc::new(VendorApi::new(&test_config(base_url, None)).unwrap());
    // Long poll interval so the push path does the work after the first tick
    let feed = QueueFeed::spawn(vendor, Duration::from_secs(30), Some(ws_url));
    let mut rx = feed.subscribe();

    // Realtime flag flips on connect
    timeout(Duration::from_secs(5), rx.wait_for(|s| s.realtime))
        .await
        .expect("websocket connects")
        .unwrap();

    // A valid push replaces the entry list
    frame_tx
        .send(Message::Text(
            json!([{ "senha": "A042", "guiche": "03" }, { "senha": "A043" }]).to_string(),
        ))
        .await
        .unwrap();
    timeout(Duration::from_secs(5), rx.wait_for(|s| s.entries.len() == 2))
        .await
        .expect("pushed entries applied")
        .unwrap();

    // A malformed frame sets the error but keeps entries and the connection
    frame_tx
        .send(Message::Text("{this is not json".to_string()))
        .await
        .unwrap();
    timeout(Duration::from_secs(5), rx.wait_for(|s| s.last_error.is_some()))
        .await
        .expect("error surfaced")
        .unwrap();

    let state = feed.state();
    assert_eq!(state.entries.len(), 2, "entries retained past the bad frame");
    assert!(state.realtime, "subscription still up");

    // The connection is genuinely alive: another valid frame still applies
    frame_tx
        .send(Message::Text(json!([{ "senha": "A044" }]).to_string()))
        .await
        .unwrap();
    timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| s.entries.len() == 1 && s.last_error.is_none()),
    )
    .await
    .expect("feed recovers after bad frame")
    .unwrap();

    // Server goes away: realtime drops, polling carries the panel
    drop(frame_tx);
    timeout(Duration::from_secs(5), rx.wait_for(|s| !s.realtime))
        .await
        .expect("disconnect detected")
        .unwrap();
}

#[tokio::test]
async fn poll_failure_surfaces_error_and_keeps_entries() {
    // Vendor mock whose queue endpoint can be flipped into failure
    let failing = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let failing_route = failing.clone();

    let app = Router::new()
        .route("/login/externo", post(login_handler))
        .route(
            "/queue/panel",
            get(move || {
                let failing = failing_route.clone();
                async move {
                    if failing.load(std::sync::atomic::Ordering::SeqCst) {
                        axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
                    } else {
                        Json(json!([{ "senha": "P010", "guiche": "01" }])).into_response()
                    }
                }
            }),
        );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let vendor = Arc::new(VendorApi::new(&test_config(base_url, None)).unwrap());
    let feed = QueueFeed::spawn(vendor, Duration::from_millis(100), None);
    let mut rx = feed.subscribe();

    timeout(Duration::from_secs(5), rx.wait_for(|s| !s.entries.is_empty()))
        .await
        .expect("first poll")
        .unwrap();

    // Break the endpoint: the error is surfaced, the stale entries stay up
    failing.store(true, std::sync::atomic::Ordering::SeqCst);
    timeout(Duration::from_secs(5), rx.wait_for(|s| s.last_error.is_some()))
        .await
        .expect("poll failure surfaced")
        .unwrap();

    let state = feed.state();
    assert_eq!(state.entries[0].senha, "P010", "entries retained during outage");

    // Restore the endpoint: the next good poll clears the error
    failing.store(false, std::sync::atomic::Ordering::SeqCst);
    timeout(Duration::from_secs(5), rx.wait_for(|s| s.last_error.is_none()))
        .await
        .expect("feed recovers")
        .unwrap();
}
