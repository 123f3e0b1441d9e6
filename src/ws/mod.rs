pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::api::ApiError;
use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::state::AppState;
use crate::types::{PlayerName, RoomCode};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub room: String,
    pub name: String,
}

/// Who is on the other end of a socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub room_code: RoomCode,
    pub name: PlayerName,
}

/// WebSocket upgrade handler. Joins (or rejoins) before upgrading so a bad
/// room or a full lobby is reported as a plain HTTP error.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    tracing::info!(
        "WebSocket connection request: room={}, name={}",
        params.room,
        params.name
    );

    let player = match state.join_room(&params.room, &params.name).await {
        Ok(player) => player,
        Err(e) => return ApiError(e).into_response(),
    };
    let session = Session {
        room_code: player.room_code,
        name: player.name,
    };

    ws.on_upgrade(move |socket| handle_socket(socket, session, state))
}

async fn send(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            true
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, session: Session, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the welcome so no change slips between the two
    let mut room_rx = state.subscribe();

    let welcome = match state
        .room_view(&session.room_code, Some(session.name.as_str()))
        .await
    {
        Ok(room) => ServerMessage::Welcome {
            protocol: PROTOCOL_VERSION.to_string(),
            you: session.name.clone(),
            room,
            server_now: chrono::Utc::now().to_rfc3339(),
        },
        Err(e) => e.into(),
    };
    if !send(&mut sender, &welcome).await {
        tracing::error!("Failed to send welcome message");
        return;
    }

    loop {
        tokio::select! {
            event = room_rx.recv() => {
                match event {
                    Ok(event) if event.room_code != session.room_code => continue,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(
                            "{} lagged {} room events, resending state",
                            session.name,
                            skipped
                        );
                    }
                    Err(RecvError::Closed) => break,
                }
                let msg = handlers::state_message(&state, &session)
                    .await
                    .unwrap_or_else(ServerMessage::from);
                if !send(&mut sender, &msg).await {
                    break;
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message from {}: {}", session.name, text);

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handlers::handle_message(client_msg, &session, &state).await
                            }
                            Err(e) => {
                                tracing::error!("Failed to parse client message: {}", e);
                                ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                }
                            }
                        };
                        if !send(&mut sender, &response).await {
                            tracing::error!("Failed to send response");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    // Leaving only drops the socket; the seat and the ledger stay
    tracing::info!(
        "WebSocket connection closed for {} in room {}",
        session.name,
        session.room_code
    );
}
