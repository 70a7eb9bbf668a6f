use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use super::state::{AppState, WsEvent};
use crate::models::Event;
use crate::recording::SessionUpdate;

#[derive(Debug, Deserialize)]
struct WsIncoming {
    #[serde(rename = "type")]
    msg_type: String,
}

#[derive(Debug, Serialize)]
struct WsOutgoing {
    #[serde(rename = "type")]
    msg_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<Vec<Event>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl WsOutgoing {
    fn new(msg_type: &'static str) -> Self {
        Self {
            msg_type,
            session_id: None,
            events: None,
            event_count: None,
            error: None,
        }
    }
}

impl From<WsEvent> for WsOutgoing {
    fn from(event: WsEvent) -> Self {
        match event {
            WsEvent::RecordingEvent { session_id, events } => WsOutgoing {
                session_id: Some(session_id),
                events: Some(events),
                ..WsOutgoing::new("recording_event")
            },
            WsEvent::RecordingStopped {
                session_id,
                event_count,
            } => WsOutgoing {
                session_id: Some(session_id),
                event_count: Some(event_count),
                ..WsOutgoing::new("recording_stopped")
            },
            WsEvent::Error { session_id, error } => WsOutgoing {
                session_id: Some(session_id),
                error: Some(error),
                ..WsOutgoing::new("error")
            },
            WsEvent::Pong => WsOutgoing::new("pong"),
        }
    }
}

/// Session updates worth telling clients about. Session starts are visible
/// through the first `recording_event`.
fn from_update(update: SessionUpdate) -> Option<WsEvent> {
    match update {
        SessionUpdate::Started { .. } => None,
        SessionUpdate::LogChanged { session_id, events } => {
            Some(WsEvent::RecordingEvent { session_id, events })
        }
        SessionUpdate::Stopped {
            session_id,
            event_count,
        } => Some(WsEvent::RecordingStopped {
            session_id,
            event_count,
        }),
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(client_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request from client: {}", client_id);
    ws.on_upgrade(move |socket| handle_socket(socket, client_id, state))
}

async fn handle_socket(socket: WebSocket, client_id: String, state: Arc<AppState>) {
    tracing::info!("WebSocket connected: {}", client_id);
    state.client_connected(&client_id);

    let (mut sender, mut receiver) = socket.split();

    let mut rx = state.subscribe();
    let mut updates = state.coordinator.subscribe();

    // Task to forward session updates and broadcast events to this client
    let send_task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                update = updates.recv() => match update {
                    Ok(update) => match from_update(update) {
                        Some(event) => event,
                        None => continue,
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("WebSocket client lagged, {} updates skipped", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                event = rx.recv() => match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
            };

            let json = match serde_json::to_string(&WsOutgoing::from(event)) {
                Ok(j) => j,
                Err(_) => continue,
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Task to handle incoming messages (ping/pong)
    let state_clone = state.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(incoming) = serde_json::from_str::<WsIncoming>(&text) {
                    if incoming.msg_type == "ping" {
                        state_clone.broadcast(WsEvent::Pong);
                    }
                }
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    state.client_disconnected(&client_id).await;
    tracing::info!("WebSocket disconnected: {}", client_id);
}
