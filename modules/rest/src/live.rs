// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::RestCtx;
use module_core::{EventKind, EventKindType, LiveTelemetry, Request, payload_ref};
use rand::{Rng, distr::Alphanumeric, rng};
use rocket::{State, futures::{StreamExt, TryStreamExt}, get};
use rocket_ws::Message;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

#[derive(Serialize)]
struct LiveMessage<'a, T: Serialize + ?Sized> {
    event: &'a str,
    data: &'a T,
}

/// Serializes `{"event": <event>, "data": <data>}` to a JSON string.
fn serialize_live_message<T: Serialize + ?Sized>(event: &str, data: &T) -> String {
    match serde_json::to_string(&LiveMessage { event, data }) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize {event} message: {e}");
            "{}".to_string()
        }
    }
}

/// WebSocket handler that streams the live session to clients.
///
/// Route: GET /v1/live
///
/// A new connection first gets the current read model as `telemetry` message.
/// After that every admitted sample is sent as `sample` and every completed lap
/// as `lap_completed`. The stream ends on QuitEvent, client close or errors.
#[get("/v1/live")]
pub(crate) fn ws_live_handler(
    ws: rocket_ws::WebSocket,
    ctx: &State<Arc<Mutex<RestCtx>>>,
) -> rocket_ws::Stream!['static] {
    let ctx = ctx.inner().clone();
    rocket_ws::Stream! { ws =>
        let mut stream_ws = ws.into_stream();
        let connection_id = generate_connection_id();

        let mut event_receiver = {
            let mut guard = ctx.lock().await;
            guard.register_connection(&connection_id);
            guard.subscribe()
        };
        info!("WebSocket \"/v1/live\" connection {connection_id} established");

        match request_snapshot(&ctx).await {
            Ok(snapshot) => {
                yield Message::Text(serialize_live_message("telemetry", snapshot.as_ref()));
                ctx.lock().await.set_connection_synced(&connection_id, true);
            }
            Err(e) => {
                error!("No initial telemetry for connection {connection_id}: {e:?}");
            }
        }

        loop {
            tokio::select! {
                event = event_receiver.recv() => {
                    match event {
                        Ok(event) => match event.kind {
                            EventKind::QuitEvent => {
                                info!("Closing WebSocket connection {connection_id} on quit");
                                break;
                            }
                            EventKind::SampleProcessedEvent(sample) => {
                                if ctx.lock().await.is_connection_synced(&connection_id) {
                                    yield Message::Text(serialize_live_message("sample", sample.as_ref()));
                                }
                            }
                            EventKind::LapCompletedEvent(lap) => {
                                if ctx.lock().await.is_connection_synced(&connection_id) {
                                    yield Message::Text(serialize_live_message("lap_completed", lap.as_ref()));
                                } else if let Ok(snapshot) = request_snapshot(&ctx).await {
                                    yield Message::Text(serialize_live_message("telemetry", snapshot.as_ref()));
                                    ctx.lock().await.set_connection_synced(&connection_id, true);
                                }
                            }
                            _ => {}
                        },
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            error!("WebSocket connection {connection_id} lagged, {skipped} events lost");
                        }
                        Err(e) => {
                            error!("Error receiving event for WebSocket connection {connection_id}: {e}");
                            break;
                        }
                    }
                }

                Some(msg) = stream_ws.next() => {
                    match msg {
                        Ok(Message::Close(_)) => {
                            info!("WebSocket client {connection_id} disconnected");
                            break;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("WebSocket error on connection {connection_id}: {e}");
                            break;
                        }
                    }
                }
            }
        }
        ctx.lock().await.unregister_connection(&connection_id);
    }
}

/// Random alphanumeric id of length 16 for a WebSocket connection.
pub(crate) fn generate_connection_id() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

async fn request_snapshot(
    ctx: &Arc<Mutex<RestCtx>>,
) -> Result<Arc<LiveTelemetry>, rocket::http::Status> {
    let event = ctx
        .lock()
        .await
        .request(
            |id, addr| {
                EventKind::TelemetrySnapshotRequestEvent(Request::empty_request(id, addr))
            },
            EventKindType::TelemetrySnapshotResponseEvent,
        )
        .await?;
    payload_ref!(event.kind, EventKind::TelemetrySnapshotResponseEvent)
        .map(|response| response.data.clone())
        .ok_or(rocket::http::Status::InternalServerError)
}
