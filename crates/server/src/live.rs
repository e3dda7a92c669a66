// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! WebSocket endpoints for live tracking.
//!
//! - `/orders/{id}/track` streams tracking messages for one order: a
//!   snapshot on connect, periodic snapshots while technicians move, and a
//!   final `closed` message before the server closes the socket.
//! - `/technicians/{id}/report` accepts `{latitude, longitude}` frames from a
//!   technician's device and answers each with an `accepted` or `rejected`
//!   frame.

use crate::{AppState, HttpError};
use axum::{
    extract::{
        Path, State as AxumState, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use fieldops::{Dispatcher, LocationUpdate, SubscriberId, TrackingHub, TrackingMessage};
use fieldops_domain::{Coordinate, OrderId, TechnicianId};
use futures::{Sink, SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Reply sent for every frame on the technician report socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportReply {
    /// The position was recorded.
    Accepted {
        /// What the update amounted to (`cached`, `moving`, `arrived`, `all_arrived`).
        outcome: String,
    },
    /// The frame was not a usable position, or the technician is not on an order.
    Rejected {
        /// Why.
        message: String,
    },
}

/// Upgrades to a tracking stream for one order.
///
/// The order must exist; otherwise the request is answered with 404 and no
/// upgrade happens.
pub async fn track_order_handler(
    ws: WebSocketUpgrade,
    Path(order_id): Path<OrderId>,
    AxumState(app_state): AxumState<AppState>,
) -> Result<Response, HttpError> {
    app_state.dispatcher.order(order_id).await?;
    let hub: TrackingHub = app_state.dispatcher.hub().clone();
    Ok(ws.on_upgrade(move |socket| track_order(socket, hub, order_id)))
}

async fn track_order(socket: WebSocket, hub: TrackingHub, order_id: OrderId) {
    let (sender, mut receiver) = socket.split();
    let (tx, rx) = mpsc::channel::<TrackingMessage>(hub.config().subscriber_buffer.max(1));
    let subscriber: SubscriberId = hub.subscribe(order_id, tx);
    info!(%order_id, %subscriber, "Client connected to tracking stream");

    let mut send_task = tokio::spawn(forward_tracking(sender, rx));

    // Clients have nothing to say; we only watch for the close.
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(_) | Message::Binary(_)) => {
                    warn!("Received unexpected message from tracking client, ignoring");
                }
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Err(e) => {
                    error!(?e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            debug!("Send task completed");
            recv_task.abort();
        }
        _ = &mut recv_task => {
            debug!("Receive task completed");
            send_task.abort();
        }
    }

    hub.unsubscribe(order_id, subscriber);
    info!(%order_id, %subscriber, "Client disconnected from tracking stream");
}

/// Writes tracking messages to `sink` until the hub drops the subscriber,
/// then sends a close frame.
async fn forward_tracking<S>(mut sink: S, mut rx: mpsc::Receiver<TrackingMessage>)
where
    S: Sink<Message> + Unpin,
{
    while let Some(message) = rx.recv().await {
        let json: String = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                error!(?e, "Failed to serialize tracking message");
                continue;
            }
        };
        if sink.send(Message::Text(json.into())).await.is_err() {
            // Client disconnected
            return;
        }
        if matches!(message, TrackingMessage::Closed { .. }) {
            break;
        }
    }
    let _ = sink.send(Message::Close(None)).await;
}

/// Upgrades to a position report stream for one technician.
pub async fn technician_report_handler(
    ws: WebSocketUpgrade,
    Path(technician_id): Path<TechnicianId>,
    AxumState(app_state): AxumState<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| technician_report(socket, app_state.dispatcher, technician_id))
}

async fn technician_report(socket: WebSocket, dispatcher: Dispatcher, technician_id: TechnicianId) {
    info!(%technician_id, "Technician connected to report stream");
    let (mut sender, mut receiver) = socket.split();

    while let Some(msg) = receiver.next().await {
        let reply: ReportReply = match msg {
            Ok(Message::Text(text)) => {
                report_position(&dispatcher, technician_id, text.as_str()).await
            }
            Ok(Message::Binary(_)) => ReportReply::Rejected {
                message: String::from("Binary frames are not supported"),
            },
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => break,
            Err(e) => {
                error!(?e, "WebSocket receive error");
                break;
            }
        };

        let Ok(json) = serde_json::to_string(&reply) else {
            continue;
        };
        if sender.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }

    info!(%technician_id, "Technician disconnected from report stream");
}

/// Applies one position frame.
async fn report_position(
    dispatcher: &Dispatcher,
    technician_id: TechnicianId,
    frame: &str,
) -> ReportReply {
    let coordinate: Coordinate = match serde_json::from_str(frame) {
        Ok(coordinate) => coordinate,
        Err(e) => {
            return ReportReply::Rejected {
                message: format!("Invalid position: {e}"),
            };
        }
    };

    match dispatcher.update_location(technician_id, coordinate).await {
        Ok(update) => {
            if update != LocationUpdate::Moving {
                info!(%technician_id, outcome = update.as_str(), "Position reported");
            }
            ReportReply::Accepted {
                outcome: update.as_str().to_string(),
            }
        }
        Err(e) => {
            warn!(%technician_id, error = %e, "Position report rejected");
            ReportReply::Rejected {
                message: e.to_string(),
            }
        }
    }
}
