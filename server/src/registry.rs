use std::borrow::Cow;
use std::collections::HashMap;

use axum::extract::ws::{CloseFrame, Message};
use plinko_types::ServerMessage;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Write handle for one connected session.
#[derive(Debug)]
pub struct SessionHandle {
    pub tx: mpsc::UnboundedSender<Message>,
    /// Set once the session has presented the moderation secret.
    pub is_admin: bool,
}

/// Writer queues of all live sessions, keyed by player id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<Uuid, SessionHandle>,
}

impl SessionRegistry {
    pub fn insert(&mut self, player_id: Uuid, tx: mpsc::UnboundedSender<Message>) {
        self.sessions.insert(
            player_id,
            SessionHandle {
                tx,
                is_admin: false,
            },
        );
    }

    pub fn remove(&mut self, player_id: &Uuid) -> Option<SessionHandle> {
        self.sessions.remove(player_id)
    }

    pub fn is_admin(&self, player_id: &Uuid) -> bool {
        self.sessions
            .get(player_id)
            .map(|session| session.is_admin)
            .unwrap_or(false)
    }

    pub fn set_admin(&mut self, player_id: &Uuid, is_admin: bool) {
        if let Some(session) = self.sessions.get_mut(player_id) {
            session.is_admin = is_admin;
        }
    }

    /// Queue a frame for one session, if it is still connected.
    pub fn send(&self, player_id: &Uuid, message: &ServerMessage) {
        if let Some(session) = self.sessions.get(player_id) {
            send_frame(&session.tx, message);
        }
    }

    /// Queue a frame for every live session.
    pub fn broadcast(&self, message: &ServerMessage) {
        if let Ok(payload) = serde_json::to_string(message) {
            for session in self.sessions.values() {
                let _ = session.tx.send(Message::Text(payload.clone()));
            }
        }
    }

    /// Queue a close frame for one session.
    pub fn close(&self, player_id: &Uuid, code: u16, reason: &'static str) {
        if let Some(session) = self.sessions.get(player_id) {
            let _ = session.tx.send(close_frame(code, reason));
        }
    }
}

/// Queue a frame on a session writer, dropping it if the writer is gone.
pub fn send_frame(tx: &mpsc::UnboundedSender<Message>, message: &ServerMessage) {
    if let Ok(payload) = serde_json::to_string(message) {
        let _ = tx.send(Message::Text(payload));
    }
}

pub fn close_frame(code: u16, reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: Cow::Borrowed(reason),
    }))
}
