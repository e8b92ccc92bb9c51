// WebSocket: push histogram views, receive bucket clicks and granularity selections

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::models::Granularity;
use crate::widget::WidgetHandle;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Frames a rendering surface may send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    DrillDown { timestamp: i64 },
    SelectGranularity { granularity: String },
}

pub(super) async fn ws_histogram(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let widget = state.widget.clone();
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = stream_histogram(socket, widget).await {
            tracing::info!("Histogram stream error: {}", e);
        }
    })
}

/// Sends with a timeout; false when the client is gone or too slow.
async fn send_timed(sender: &mut SplitSink<WebSocket, Message>, msg: Message) -> bool {
    matches!(timeout(WS_SEND_TIMEOUT, sender.send(msg)).await, Ok(Ok(())))
}

async fn stream_histogram(socket: WebSocket, widget: WidgetHandle) -> anyhow::Result<()> {
    tracing::info!("Client connected to histogram stream");
    let (mut sender, mut receiver) = socket.split();
    let mut views = widget.subscribe_views();

    let current = views.borrow_and_update().clone();
    let json = serde_json::to_string(&current)?;
    if !send_timed(&mut sender, Message::Text(json.into())).await {
        return Ok(());
    }

    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    // Widget task stopped.
                    break;
                }
                let view = views.borrow_and_update().clone();
                let json = serde_json::to_string(&view)?;
                if !send_timed(&mut sender, Message::Text(json.into())).await {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&widget, text.as_str()).await?;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "histogram socket receive failed");
                        break;
                    }
                }
            }
            _ = ping_interval.tick() => {
                if !send_timed(&mut sender, Message::Ping(Bytes::new())).await {
                    break;
                }
            }
        }
    }
    tracing::info!("Client disconnected from histogram stream");
    Ok(())
}

/// Malformed frames are logged and skipped; only a stopped widget is an error.
async fn handle_client_message(widget: &WidgetHandle, text: &str) -> anyhow::Result<()> {
    let msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed client frame");
            return Ok(());
        }
    };
    match msg {
        ClientMessage::DrillDown { timestamp } => {
            let applied = widget.drill_down(timestamp).await?;
            tracing::debug!(timestamp, applied, "client drill-down");
        }
        ClientMessage::SelectGranularity { granularity } => {
            match granularity.parse::<Granularity>() {
                Ok(g) => widget.select_granularity(g).await?,
                Err(e) => tracing::debug!(error = %e, "ignoring client granularity"),
            }
        }
    }
    Ok(())
}
