//! WebSocket endpoint — 实时事件推送
//!
//! GET /ws?token=<JWT>
//! Auth: JWT 通过 query parameter 传递（浏览器 WebSocket 不支持自定义 headers）
//!
//! 协议:
//! - Server → client: LiveEvent (new_order, order_status_updated, ...)
//! - Client → server: ClientCommand (join / leave / ping)

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use shared::{AppError, ClientCommand, LiveEvent, LiveEventKind};
use tokio::time::Duration;

use super::{ConnectionId, JoinError};
use crate::auth::CurrentUser;
use crate::core::ServerState;

#[derive(Deserialize)]
pub struct WsAuthQuery {
    token: String,
}

pub fn router() -> Router<ServerState> {
    Router::new().route("/ws", get(handle_ws))
}

/// GET /ws?token=<JWT>
pub async fn handle_ws(
    State(state): State<ServerState>,
    Query(query): Query<WsAuthQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    // 手动验证 JWT
    let claims = state
        .get_jwt_service()
        .validate_token(&query.token)
        .map_err(|e| {
            tracing::debug!("WS JWT validation failed: {e}");
            AppError::invalid_token(e.to_string())
        })?;
    let user = CurrentUser::from(claims);

    Ok(ws.on_upgrade(move |socket| ws_session(socket, state, user)))
}

async fn ws_session(socket: WebSocket, state: ServerState, user: CurrentUser) {
    let (mut sink, mut stream) = socket.split();
    let sessions = state.sessions.clone();
    let (connection_id, mut events) = sessions.register(&user.id, user.is_admin());

    tracing::info!(user_id = %user.id, connection_id, "WS connected");

    let mut ping_interval = tokio::time::interval(Duration::from_secs(30));
    ping_interval.tick().await; // skip immediate

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }

            event = events.recv() => {
                match event {
                    Some(event) => {
                        if send_event(&mut sink, &event).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientCommand>(&text) {
                            Ok(cmd) => handle_command(&state, connection_id, cmd),
                            Err(e) => LiveEvent::error(format!("Invalid command: {e}")),
                        };
                        if send_event(&mut sink, &reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    sessions.unregister(connection_id);
    tracing::info!(user_id = %user.id, connection_id, "WS disconnected");
}

fn handle_command(state: &ServerState, connection_id: ConnectionId, cmd: ClientCommand) -> LiveEvent {
    match cmd {
        ClientCommand::Join { user_id } => match state.sessions.join(connection_id, &user_id) {
            Ok(()) => LiveEvent::new(LiveEventKind::Joined, serde_json::json!({ "user_id": user_id })),
            Err(JoinError::Forbidden(other)) => {
                crate::security_log!(
                    "WARN",
                    "ws_join_denied",
                    connection_id = connection_id,
                    channel = other.as_str()
                );
                LiveEvent::error(format!("Cannot join channel {other}"))
            }
            Err(e) => LiveEvent::error(e.to_string()),
        },
        ClientCommand::Leave { user_id } => {
            state.sessions.leave(connection_id, &user_id);
            LiveEvent::new(LiveEventKind::Left, serde_json::json!({ "user_id": user_id }))
        }
        ClientCommand::Ping => LiveEvent::pong(),
    }
}

async fn send_event<S>(sink: &mut S, event: &LiveEvent) -> Result<(), ()>
where
    S: futures::Sink<Message, Error = axum::Error> + Unpin,
{
    let json = serde_json::to_string(event).map_err(|_| ())?;
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}
