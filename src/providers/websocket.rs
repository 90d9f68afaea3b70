//! Queue panel WebSocket subscription
//!
//! The panel push endpoint delivers JSON arrays of queue entries. The
//! subscription runs in its own task, reconnects with capped exponential
//! backoff plus jitter, and reports everything over an mpsc channel:
//! connect, validated entry lists, validation failures, disconnects. A
//! malformed frame never tears the connection down — the feed marks the
//! error and keeps the previously loaded entries on screen.

use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::models::errors::{AppError, ErrorCode};
use crate::models::types::QueueEntry;
use crate::utils::constants::{
    WS_MAX_RECONNECT_ATTEMPTS, WS_RECONNECT_BASE_MS, WS_RECONNECT_JITTER_PERCENT,
    WS_RECONNECT_MAX_MS,
};
use crate::utils::redact::redact;

/// Events emitted by the panel subscription
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    /// Socket established; the panel is realtime until the next disconnect
    Connected,
    /// A validated entry list replacing the previous one
    Entries(Vec<QueueEntry>),
    /// Payload failed schema validation; entries are left untouched
    Invalid(String),
    /// Socket closed or errored; the poll loop carries the panel
    Disconnected,
}

/// Panel WebSocket client
pub struct PanelWsClient {
    url: String,
}

impl PanelWsClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Spawn the subscription task. Dropping the receiver stops it.
    pub fn subscribe(&self) -> (mpsc::Receiver<PanelEvent>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(64);
        let url = self.url.clone();
        let handle = tokio::spawn(run_subscription(url, tx));
        (rx, handle)
    }
}

/// Connection loop with reconnection logic
async fn run_subscription(url: String, tx: mpsc::Sender<PanelEvent>) {
    let mut reconnect_attempts = 0u32;
    let mut reconnect_delay = WS_RECONNECT_BASE_MS;

    loop {
        match connect_async(&url).await {
            Ok((ws_stream, _)) => {
                info!("🔌 Panel WebSocket connected");
                reconnect_attempts = 0;
                reconnect_delay = WS_RECONNECT_BASE_MS;

                if tx.send(PanelEvent::Connected).await.is_err() {
                    return;
                }

                let (mut write, mut read) = ws_stream.split();

                while let Some(msg_result) = read.next().await {
                    match msg_result {
                        Ok(Message::Text(text)) => {
                            debug!(len = text.len(), "📨 Panel frame received");
                            if tx.send(parse_panel_frame(&text)).await.is_err() {
                                return;
                            }
                        }
                        Ok(Message::Ping(data)) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Ok(Message::Close(_)) => {
                            warn!("🔌 Panel WebSocket closed by server");
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "Panel WebSocket error");
                            break;
                        }
                        _ => {}
                    }
                }

                if tx.send(PanelEvent::Disconnected).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, "Panel WebSocket connection failed");
                if tx.send(PanelEvent::Disconnected).await.is_err() {
                    return;
                }
            }
        }

        reconnect_attempts += 1;
        if reconnect_attempts >= WS_MAX_RECONNECT_ATTEMPTS {
            error!(
                code = ErrorCode::WsReconnectExhausted.as_str(),
                attempts = reconnect_attempts,
                "❌ Panel WebSocket reconnect budget exhausted; panel stays on polling"
            );
            return;
        }

        let delay = jittered(reconnect_delay);
        warn!(
            delay_ms = delay,
            attempt = reconnect_attempts,
            max = WS_MAX_RECONNECT_ATTEMPTS,
            "🔄 Reconnecting panel WebSocket"
        );
        tokio::time::sleep(std::time::Duration::from_millis(delay)).await;

        reconnect_delay = (reconnect_delay * 2).min(WS_RECONNECT_MAX_MS);
    }
}

/// Apply ±jitter to a reconnect delay to avoid synchronized panels
/// hammering the backend after an outage.
fn jittered(delay_ms: u64) -> u64 {
    let jitter_range = (delay_ms * WS_RECONNECT_JITTER_PERCENT) / 100;
    if jitter_range == 0 {
        return delay_ms;
    }
    let jitter: i64 =
        rand::thread_rng().gen_range(-(jitter_range as i64)..=(jitter_range as i64));
    (delay_ms as i64 + jitter).max(100) as u64
}

/// Parse and validate one panel frame.
///
/// The wire format is a JSON array of queue entries. Entries are also
/// validated past serde: a row with a blank call ticket marks the whole
/// frame invalid, because the panel would render nonsense.
pub fn parse_panel_frame(text: &str) -> PanelEvent {
    match serde_json::from_str::<Vec<QueueEntry>>(text) {
        Ok(entries) => {
            if let Some(bad) = entries.iter().find(|e| !e.is_valid()) {
                PanelEvent::Invalid(
                    AppError::invalid_payload(format!(
                        "panel entry with blank ticket (guiche: {})",
                        bad.guiche.as_deref().unwrap_or("?")
                    ))
                    .to_string(),
                )
            } else {
                PanelEvent::Entries(entries)
            }
        }
        Err(e) => {
            let excerpt: String = text.chars().take(120).collect();
            PanelEvent::Invalid(
                AppError::invalid_payload(format!(
                    "malformed panel payload: {} (frame: {})",
                    e,
                    redact(&excerpt)
                ))
                .to_string(),
            )
        }
    }
}
