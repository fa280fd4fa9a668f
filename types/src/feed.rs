use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::WinRecord;

/// Append to a bounded feed, evicting the oldest entries once `max` is
/// exceeded.
pub fn push_bounded<T>(feed: &mut Vec<T>, entry: T, max: usize) {
    feed.push(entry);
    if feed.len() > max {
        let excess = feed.len() - max;
        feed.drain(..excess);
    }
}

/// A win worth showing to the whole table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinFeedEntry {
    pub player_id: Uuid,
    /// Display name at the time of the win.
    pub player_name: String,
    /// Whether the player held moderation rights at the time of the win.
    #[serde(default)]
    pub is_admin: bool,
    pub record: WinRecord,
}

/// A single table chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub player_id: Uuid,
    /// Display name at the time the message was sent.
    pub player_name: String,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}
