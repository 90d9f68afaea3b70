//! Live queue feed: poll + push fan-in
//!
//! Two producers feed one consumer over an mpsc channel: a fixed-interval
//! poll loop against the vendor queue endpoint, and (when configured) the
//! panel WebSocket subscription. The consumer folds events into a
//! `watch`-published `QueueState` that the gateway API reads.
//!
//! Degradation rules:
//! - WebSocket up: pushed entry lists win; poll snapshots are ignored so a
//!   response that was in flight when the socket came up cannot clobber
//!   fresher data.
//! - WebSocket down (or never configured): poll snapshots drive the panel.
//! - Validation or transport failures set a user-visible error while the
//!   previously loaded entries stay on screen.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::models::types::QueueEntry;
use crate::providers::vendor::VendorApi;
use crate::providers::websocket::{PanelEvent, PanelWsClient};

/// Published feed state, snapshot-readable and watch-subscribable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueState {
    pub entries: Vec<QueueEntry>,
    /// True while the WebSocket is delivering; false means periodic refresh
    pub realtime: bool,
    /// User-visible error, cleared by the next good update
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Internal fan-in events
#[derive(Debug)]
pub enum QueueEvent {
    /// Poll loop fetched a snapshot
    Snapshot(Vec<QueueEntry>),
    /// Poll loop failed (transport or decode)
    PollFailed(String),
    /// Anything from the WebSocket subscription
    Ws(PanelEvent),
}

/// Pure transition function; all feed semantics live here.
pub fn apply_event(state: &mut QueueState, event: QueueEvent) {
    match event {
        QueueEvent::Snapshot(entries) => {
            if !state.realtime {
                state.entries = entries;
                state.last_error = None;
                state.updated_at = Some(Utc::now());
            }
        }
        QueueEvent::PollFailed(message) => {
            // Entries are retained; the panel shows stale data plus the error
            if !state.realtime {
                state.last_error = Some(message);
            }
        }
        QueueEvent::Ws(PanelEvent::Connected) => {
            state.realtime = true;
            state.last_error = None;
        }
        QueueEvent::Ws(PanelEvent::Entries(entries)) => {
            state.entries = entries;
            state.last_error = None;
            state.updated_at = Some(Utc::now());
        }
        QueueEvent::Ws(PanelEvent::Invalid(message)) => {
            state.last_error = Some(message);
        }
        QueueEvent::Ws(PanelEvent::Disconnected) => {
            state.realtime = false;
        }
    }
}

/// Handle to the running feed. Dropping it aborts the producer and consumer
/// tasks (poll timer and socket teardown).
pub struct QueueFeed {
    state_rx: watch::Receiver<QueueState>,
    tasks: Vec<JoinHandle<()>>,
}

impl QueueFeed {
    /// Spawn the poll loop, the optional WebSocket subscription and the
    /// fan-in consumer.
    pub fn spawn(
        vendor: Arc<VendorApi>,
        poll_interval: Duration,
        panel_ws_url: Option<String>,
    ) -> Self {
        // `tokio::time::interval` panics on a zero period, which would kill
        // the poll task without tearing down the feed. Config rejects zero
        // upstream; this keeps the task alive for callers that bypass it.
        let poll_interval = poll_interval.max(Duration::from_millis(1));

        let (event_tx, mut event_rx) = mpsc::channel::<QueueEvent>(64);
        let (state_tx, state_rx) = watch::channel(QueueState::default());
        let mut tasks = Vec::new();

        // Poll producer: first tick fires immediately
        let poll_tx = event_tx.clone();
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let event = match vendor.fetch_queue().await {
                    Ok(entries) => QueueEvent::Snapshot(entries),
                    Err(e) => {
                        warn!(code = e.code_str(), error = %e, "Queue poll failed");
                        QueueEvent::PollFailed(e.to_string())
                    }
                };
                if poll_tx.send(event).await.is_err() {
                    break;
                }
            }
        }));

        // Push producer
        if let Some(url) = panel_ws_url {
            info!(url = %url, "📡 Panel WebSocket subscription enabled");
            let ws_tx = event_tx.clone();
            let (mut panel_rx, ws_task) = PanelWsClient::new(url).subscribe();
            tasks.push(ws_task);
            tasks.push(tokio::spawn(async move {
                while let Some(event) = panel_rx.recv().await {
                    if ws_tx.send(QueueEvent::Ws(event)).await.is_err() {
                        break;
                    }
                }
            }));
        } else {
            info!("📡 No PANEL_WS_URL configured; queue feed is poll-only");
        }
        drop(event_tx);

        // Fan-in consumer
        tasks.push(tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                state_tx.send_modify(|state| apply_event(state, event));
            }
        }));

        Self { state_rx, tasks }
    }

    /// Current snapshot.
    pub fn state(&self) -> QueueState {
        self.state_rx.borrow().clone()
    }

    /// Watch subscription for callers that want change notifications.
    pub fn subscribe(&self) -> watch::Receiver<QueueState> {
        self.state_rx.clone()
    }
}

impl Drop for QueueFeed {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
