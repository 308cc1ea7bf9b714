use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use server_api::{snapshot_and_subscribe, ApiContext};
use shared::{
    error::{ApiError, FieldError},
    protocol::{
        parse_payload, ChangeStatusRequest, ClientFrame, CreateOrderRequest, ErrorEvent,
        ServerEvent, EVENT_CHANGE_STATUS, EVENT_CREATE_ORDER, EVENT_UNKNOWN,
    },
};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app_state::AppState;

pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket))
}

async fn ws_connection(state: Arc<AppState>, socket: WebSocket) {
    let connection_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();

    let (snapshot, mut events_rx) = snapshot_and_subscribe(&state.api).await;
    info!(%connection_id, orders = snapshot.len(), "client connected");
    if send_event(&mut sender, &ServerEvent::InitialOrders(snapshot))
        .await
        .is_err()
    {
        info!(%connection_id, "client left before receiving the order snapshot");
        return;
    }

    // Replies meant for this connection only (validation and not-found errors).
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<ServerEvent>();

    let mut send_task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                Some(reply) = reply_rx.recv() => reply,
                received = events_rx.recv() => match received {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%connection_id, skipped, "client fell behind the order feed; closing");
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                    Err(RecvError::Closed) => break,
                },
            };
            if send_event(&mut sender, &event).await.is_err() {
                break;
            }
        }
    });

    let api = state.api.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            let reply = match message {
                Message::Text(text) => handle_client_message(&api, connection_id, &text).await,
                Message::Binary(_) => Some(error_event(
                    EVENT_UNKNOWN,
                    ApiError::validation(vec![FieldError::new(
                        "frame",
                        "binary frames are not supported",
                    )]),
                )),
                Message::Close(_) => break,
                Message::Ping(_) | Message::Pong(_) => None,
            };
            if let Some(reply) = reply {
                if reply_tx.send(reply).is_err() {
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!(%connection_id, "client disconnected");
}

/// Applies one inbound text frame. Successful mutations reach every client
/// (this one included) through the order feed, so only failures produce a
/// reply here.
pub(crate) async fn handle_client_message(
    api: &ApiContext,
    connection_id: Uuid,
    text: &str,
) -> Option<ServerEvent> {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            warn!(%connection_id, error = %err, "unreadable client frame");
            return Some(error_event(
                EVENT_UNKNOWN,
                ApiError::validation(vec![FieldError::new("event", err.to_string())]),
            ));
        }
    };
    debug!(%connection_id, event = %frame.event, "client event");

    let outcome = match frame.event.as_str() {
        EVENT_CREATE_ORDER => create_order(api, frame.data).await,
        EVENT_CHANGE_STATUS => change_status(api, frame.data).await,
        other => Err(ApiError::validation(vec![FieldError::new(
            "event",
            format!("unknown event '{other}'"),
        )])),
    };

    match outcome {
        Ok(()) => None,
        Err(err) => {
            warn!(
                %connection_id,
                event = %frame.event,
                message = %err.message,
                details = ?err.details,
                "client event rejected"
            );
            Some(error_event(frame.event, err))
        }
    }
}

async fn create_order(api: &ApiContext, data: serde_json::Value) -> Result<(), ApiError> {
    let request: CreateOrderRequest = parse_payload(data)?;
    server_api::create_order(api, request.into()).await;
    Ok(())
}

async fn change_status(api: &ApiContext, data: serde_json::Value) -> Result<(), ApiError> {
    let request: ChangeStatusRequest = parse_payload(data)?;
    let (order_id, new_status) = request.into_parts()?;
    server_api::change_status(api, order_id, new_status).await?;
    Ok(())
}

fn error_event(event: impl Into<String>, err: ApiError) -> ServerEvent {
    ServerEvent::Error(ErrorEvent::from_api_error(event, err))
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(err) => {
            warn!(error = %err, "failed to encode server event");
            return Ok(());
        }
    };
    sender.send(Message::Text(text)).await
}

#[cfg(test)]
#[path = "tests/ws_tests.rs"]
mod tests;
