//! WebSocket session lifecycle: one upgraded socket from open to teardown.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use wattlink_core::ConnectionId;

use crate::config::SessionConfig;
use crate::relay::Relay;

use super::connection::ClientConnection;
use super::lifecycle::Role;
use super::router::RouteOutcome;

/// Run a WebSocket session for a classified connection.
///
/// 1. Registers the connection and sends its acknowledgment
/// 2. Routes inbound frames in arrival order
/// 3. Drains the outbound queue and sends periodic Ping frames
/// 4. Closes connections silent for longer than the heartbeat timeout
/// 5. Deregisters on any exit path (peer close, error, timeout, shutdown)
#[instrument(skip_all, fields(conn_id = %conn_id, role = role.label()))]
pub async fn run_ws_session(
    ws: WebSocket,
    conn_id: ConnectionId,
    role: Role,
    relay: Arc<Relay>,
    config: SessionConfig,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (send_tx, mut send_rx) = mpsc::channel::<String>(config.max_send_queue);
    let connection = Arc::new(ClientConnection::new(conn_id, send_tx));

    relay.lifecycle().open(&connection, &role);

    // Cancelled by the writer on exit so the reader loop stops too.
    let session = shutdown.child_token();

    let writer_conn = connection.clone();
    let writer_session = session.clone();
    let writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(config.heartbeat_interval);
        // Skip the immediate first tick
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    let silent = writer_conn.last_seen_elapsed();
                    if silent > config.heartbeat_timeout {
                        warn!(silent_secs = silent.as_secs(), "connection unresponsive, closing");
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
                () = writer_session.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
        writer_session.cancel();
    });

    loop {
        let msg = tokio::select! {
            msg = ws_rx.next() => msg,
            () = session.cancelled() => break,
        };
        let msg = match msg {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                debug!(error = %e, "transport error");
                break;
            }
            None => break,
        };
        connection.mark_alive();

        let text = match msg {
            Message::Text(t) => t.to_string(),
            Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                Ok(s) => s,
                Err(_) => {
                    debug!(len = data.len(), "ignoring non-UTF8 binary frame");
                    continue;
                }
            },
            Message::Close(_) => {
                debug!("peer sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        if let RouteOutcome::Ignored { message_type } =
            relay.router().route(&connection, &role, &text)
        {
            debug!(message_type, "frame ignored");
        }
    }

    let _ = relay.lifecycle().close(&connection, &role);
    session.cancel();
    if writer.await.is_err() {
        warn!("writer task panicked");
    }
    info!(
        dropped = connection.drop_count(),
        age_secs = connection.age().as_secs(),
        "session ended"
    );
}
