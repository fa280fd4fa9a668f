use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State as AxumState;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use plinko_types::{ClientRequest, ServerMessage};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::engine::{unix_ms, Engine, JoinOutcome};
use crate::moderation::AdminRequest;
use crate::registry::send_frame;

/// Shared handle to the single-writer engine.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Mutex<Engine>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    AxumState(state): AxumState<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let write_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if sender.send(message).await.is_err() || closing {
                break;
            }
        }
    });

    let mut player_id: Option<Uuid> = None;

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientRequest>(&text) {
                Ok(request) => {
                    if handle_request(request, &state, &tx, &mut player_id) {
                        break;
                    }
                }
                Err(err) => {
                    warn!(?err, "dropping malformed frame");
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    if let Some(player_id) = player_id {
        let mut engine = state.engine.lock().unwrap();
        engine.handle_leave(&player_id);
    }

    // Let the writer drain whatever the engine queued before the socket
    // goes away.
    drop(tx);
    let _ = write_task.await;
}

/// Dispatch one frame. Returns true when the connection should stop
/// reading (banned join).
fn handle_request(
    request: ClientRequest,
    state: &AppState,
    tx: &mpsc::UnboundedSender<Message>,
    player_id: &mut Option<Uuid>,
) -> bool {
    match (*player_id, request) {
        (None, ClientRequest::Join { name, token }) => {
            let mut engine = state.engine.lock().unwrap();
            match engine.handle_join(&name, token.as_deref(), tx, unix_ms()) {
                JoinOutcome::Joined { player_id: id } => {
                    *player_id = Some(id);
                    false
                }
                JoinOutcome::Banned { .. } => true,
            }
        }
        (None, _) => {
            send_frame(
                tx,
                &ServerMessage::Error {
                    message: "Join first".to_string(),
                },
            );
            false
        }
        (Some(session_id), request) => {
            let mut engine = state.engine.lock().unwrap();
            match request {
                // A second join on a live session is ignored.
                ClientRequest::Join { .. } => {}
                ClientRequest::Bet { amount, request_id } => {
                    engine.handle_bet(&session_id, amount, request_id);
                }
                ClientRequest::Win { record } => {
                    engine.handle_win(&session_id, record);
                }
                ClientRequest::Reset { request_id } => {
                    engine.handle_reset(&session_id, request_id);
                }
                ClientRequest::Chat { text } => {
                    engine.handle_chat(&session_id, &text, unix_ms());
                }
                ClientRequest::Rename { name } => {
                    engine.handle_rename(&session_id, &name);
                }
                ClientRequest::AdminAuth {
                    password,
                    request_id,
                } => {
                    engine.handle_admin_auth(&session_id, &password, request_id);
                }
                ClientRequest::AdminAction {
                    action,
                    password,
                    request_id,
                    player_id: target,
                    name,
                    balance,
                    minutes,
                } => {
                    engine.handle_admin_action(
                        &session_id,
                        AdminRequest {
                            action,
                            password,
                            request_id,
                            player_id: target,
                            name,
                            balance,
                            minutes,
                        },
                        unix_ms(),
                    );
                }
            }
            false
        }
    }
}

async fn healthz() -> &'static str {
    "ok"
}
