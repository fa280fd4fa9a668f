use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ChatMessage, Money, PlayerView, WinFeedEntry, WinRecord};

/// Frames a game client sends to the table service.
///
/// Unknown fields are ignored so older or richer clients stay compatible;
/// frames that do not parse at all are dropped by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    #[serde(rename = "join")]
    Join {
        #[serde(default)]
        name: String,
        /// Resume token from a previous session, if the client has one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
    #[serde(rename = "bet")]
    Bet {
        amount: f64,
        #[serde(rename = "requestId")]
        request_id: String,
    },
    #[serde(rename = "win")]
    Win { record: WinRecord },
    #[serde(rename = "reset")]
    Reset {
        #[serde(rename = "requestId")]
        request_id: String,
    },
    #[serde(rename = "chat")]
    Chat { text: String },
    #[serde(rename = "rename")]
    Rename { name: String },
    #[serde(rename = "admin_auth")]
    AdminAuth {
        #[serde(default)]
        password: String,
        #[serde(rename = "requestId")]
        request_id: String,
    },
    #[serde(rename = "admin_action")]
    AdminAction {
        action: String,
        #[serde(default)]
        password: String,
        #[serde(rename = "requestId")]
        request_id: String,
        #[serde(rename = "playerId", default, skip_serializing_if = "Option::is_none")]
        player_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        balance: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minutes: Option<u64>,
    },
}

/// Frames the table service sends to game clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Join reply, sent once per successful `join`.
    #[serde(rename = "welcome")]
    Welcome {
        #[serde(rename = "playerId")]
        player_id: Uuid,
        players: Vec<PlayerView>,
        #[serde(rename = "winFeed")]
        win_feed: Vec<WinFeedEntry>,
        #[serde(rename = "chatFeed")]
        chat_feed: Vec<ChatMessage>,
        /// Resume token for reconnecting with the same identity.
        token: String,
    },
    /// Full-state push broadcast after every mutation.
    #[serde(rename = "players")]
    Players {
        players: Vec<PlayerView>,
        #[serde(rename = "winFeed")]
        win_feed: Vec<WinFeedEntry>,
        #[serde(rename = "chatFeed")]
        chat_feed: Vec<ChatMessage>,
    },
    #[serde(rename = "bet_result")]
    BetResult {
        #[serde(rename = "requestId")]
        request_id: String,
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[serde(rename = "reset_result")]
    ResetResult {
        #[serde(rename = "requestId")]
        request_id: String,
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        balance: Option<Money>,
    },
    #[serde(rename = "rename_result")]
    RenameResult { ok: bool, name: String },
    /// A single new chat message; the full feed still rides on roster pushes.
    #[serde(rename = "chat_message")]
    ChatBroadcast { message: ChatMessage },
    #[serde(rename = "chat_feed")]
    ChatFeed {
        #[serde(rename = "chatFeed")]
        chat_feed: Vec<ChatMessage>,
    },
    #[serde(rename = "admin_auth_result")]
    AdminAuthResult {
        #[serde(rename = "requestId")]
        request_id: String,
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[serde(rename = "admin_action_result")]
    AdminActionResult {
        #[serde(rename = "requestId")]
        request_id: String,
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        action: String,
        /// Directory snapshot, present for `list_players` results.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        players: Option<Vec<PlayerView>>,
    },
    /// Sent to a banned client just before its connection is closed.
    #[serde(rename = "banned")]
    Banned {
        /// Ban expiry in milliseconds since the Unix epoch.
        until: u64,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

/// Moderation actions recognized by the table service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    RenamePlayer,
    SetBalance,
    ResetPlayer,
    RemovePlayer,
    BanPlayer,
    ListPlayers,
    ClearChat,
}

impl AdminAction {
    /// Parse a wire action name; unknown names yield `None`.
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "rename_player" => Some(Self::RenamePlayer),
            "set_balance" => Some(Self::SetBalance),
            "reset_player" => Some(Self::ResetPlayer),
            "remove_player" => Some(Self::RemovePlayer),
            "ban_player" => Some(Self::BanPlayer),
            "list_players" => Some(Self::ListPlayers),
            "clear_chat" => Some(Self::ClearChat),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RenamePlayer => "rename_player",
            Self::SetBalance => "set_balance",
            Self::ResetPlayer => "reset_player",
            Self::RemovePlayer => "remove_player",
            Self::BanPlayer => "ban_player",
            Self::ListPlayers => "list_players",
            Self::ClearChat => "clear_chat",
        }
    }
}
