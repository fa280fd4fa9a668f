use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::ws::Message;
use plinko_types::{
    push_bounded, resolve_unique, truncate_chars, ChatMessage, Money, Player, PlayerView,
    ServerMessage, WinFeedEntry, WinRecord, CLOSE_CODE_BANNED, MAX_CHAT_FEED, MAX_CHAT_LENGTH,
    MAX_WIN_FEED,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::directory::PlayerDirectory;
use crate::registry::{close_frame, send_frame, SessionRegistry};
use crate::vault::{BanLedger, TokenVault};

/// Reasons a request is refused. The display strings go over the wire.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("Invalid bet")]
    InvalidBet,
    #[error("Not enough balance")]
    NotEnoughBalance,
    #[error("Player not found")]
    PlayerNotFound,
    #[error("Invalid password")]
    InvalidPassword,
    #[error("Invalid balance value")]
    InvalidBalanceValue,
    #[error("Unknown admin action")]
    UnknownAdminAction,
    #[error("Name is required")]
    NameRequired,
}

/// Result of a join attempt.
#[derive(Debug)]
pub enum JoinOutcome {
    /// The session is registered and its welcome frame is queued.
    Joined { player_id: Uuid },
    /// The presented token is banned; a notice and close frame are queued
    /// and the connection should stop reading.
    Banned { until: u64 },
}

/// Authoritative state of one table: directory, vault, ban ledger, feeds,
/// and the writer queues of every live session.
///
/// Handlers take `now_ms` from the caller so time-dependent behavior stays
/// testable.
pub struct Engine {
    pub(crate) config: ServerConfig,
    pub(crate) directory: PlayerDirectory,
    pub(crate) vault: TokenVault,
    pub(crate) bans: BanLedger,
    pub(crate) registry: SessionRegistry,
    pub(crate) win_feed: Vec<WinFeedEntry>,
    pub(crate) chat_feed: Vec<ChatMessage>,
}

impl Engine {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            directory: PlayerDirectory::default(),
            vault: TokenVault::default(),
            bans: BanLedger::default(),
            registry: SessionRegistry::default(),
            win_feed: Vec::new(),
            chat_feed: Vec::new(),
        }
    }

    /// Admit a connection: restore a vaulted identity when the token allows
    /// it, mint a fresh one otherwise, then welcome the session and sync
    /// everyone.
    pub fn handle_join(
        &mut self,
        name: &str,
        token: Option<&str>,
        tx: &mpsc::UnboundedSender<Message>,
        now_ms: u64,
    ) -> JoinOutcome {
        if let Some(token) = token {
            if let Some(until) = self.bans.active_until(token, now_ms) {
                send_frame(tx, &ServerMessage::Banned { until });
                let _ = tx.send(close_frame(CLOSE_CODE_BANNED, "banned"));
                info!(until, "rejected banned token");
                return JoinOutcome::Banned { until };
            }
        }

        let restored = token.and_then(|token| self.vault.take(token));
        let (player, resumed) = match restored {
            Some(mut snapshot) if !self.directory.contains(&snapshot.id) => {
                let taken = self.directory.names_excluding(Some(&snapshot.id));
                snapshot.name = resolve_unique(&snapshot.name, &taken);
                (snapshot, true)
            }
            other => {
                // A token whose player is still online keeps its snapshot;
                // the new connection gets a fresh identity.
                if let Some(snapshot) = other {
                    self.vault.store(snapshot);
                }
                let taken = self.directory.names_excluding(None);
                let display = resolve_unique(name, &taken);
                let player = Player::new(
                    Uuid::new_v4(),
                    display,
                    self.config.starting_balance,
                    Uuid::new_v4().to_string(),
                );
                (player, false)
            }
        };

        let player_id = player.id;
        let token = player.token.clone();
        info!(%player_id, name = %player.name, resumed, "player joined");

        self.directory.insert(player);
        self.registry.insert(player_id, tx.clone());
        send_frame(
            tx,
            &ServerMessage::Welcome {
                player_id,
                players: self.roster(),
                win_feed: self.win_feed.clone(),
                chat_feed: self.chat_feed.clone(),
                token,
            },
        );
        self.broadcast();

        JoinOutcome::Joined { player_id }
    }

    /// Tear down a session: persist its snapshot for later reconnects and
    /// sync the remaining players.
    pub fn handle_leave(&mut self, player_id: &Uuid) {
        self.registry.remove(player_id);
        if let Some(player) = self.directory.remove(player_id) {
            info!(%player_id, name = %player.name, "player left");
            self.vault.store(player);
        }
        self.broadcast();
    }

    pub fn handle_bet(&mut self, player_id: &Uuid, amount: f64, request_id: String) {
        match self.place_bet(player_id, amount) {
            Ok(()) => {
                self.registry.send(
                    player_id,
                    &ServerMessage::BetResult {
                        request_id,
                        ok: true,
                        reason: None,
                    },
                );
                self.broadcast();
            }
            Err(rejection) => {
                self.registry.send(
                    player_id,
                    &ServerMessage::BetResult {
                        request_id,
                        ok: false,
                        reason: Some(rejection.to_string()),
                    },
                );
            }
        }
    }

    fn place_bet(&mut self, player_id: &Uuid, amount: f64) -> Result<(), Rejection> {
        let wager = Money::try_from_f64(amount).map_err(|_| Rejection::InvalidBet)?;
        if !wager.is_positive() {
            return Err(Rejection::InvalidBet);
        }
        let player = self
            .directory
            .get_mut(player_id)
            .ok_or(Rejection::PlayerNotFound)?;
        if player.balance < wager {
            return Err(Rejection::NotEnoughBalance);
        }
        player.balance -= wager;
        Ok(())
    }

    /// Settle a reported win. Unknown reporters are dropped without a reply.
    pub fn handle_win(&mut self, player_id: &Uuid, record: WinRecord) {
        let is_admin = self.registry.is_admin(player_id);
        let Some(player) = self.directory.get_mut(player_id) else {
            return;
        };
        player.apply_win(record.clone());
        let entry = WinFeedEntry {
            player_id: player.id,
            player_name: player.name.clone(),
            is_admin,
            record,
        };
        push_bounded(&mut self.win_feed, entry, MAX_WIN_FEED);
        self.broadcast();
    }

    pub fn handle_reset(&mut self, player_id: &Uuid, request_id: String) {
        match self.directory.get_mut(player_id) {
            Some(player) => {
                player.reset(self.config.starting_balance);
                let balance = player.balance;
                self.registry.send(
                    player_id,
                    &ServerMessage::ResetResult {
                        request_id,
                        ok: true,
                        reason: None,
                        balance: Some(balance),
                    },
                );
                self.broadcast();
            }
            None => {
                self.registry.send(
                    player_id,
                    &ServerMessage::ResetResult {
                        request_id,
                        ok: false,
                        reason: Some(Rejection::PlayerNotFound.to_string()),
                        balance: None,
                    },
                );
            }
        }
    }

    /// Append a chat message and fan out just that message; the full feed
    /// still rides on every roster push. Empty text is dropped silently.
    pub fn handle_chat(&mut self, player_id: &Uuid, text: &str, now_ms: u64) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        let Some(player) = self.directory.get(player_id) else {
            return;
        };
        let message = ChatMessage {
            id: Uuid::new_v4(),
            player_id: player.id,
            player_name: player.name.clone(),
            text: truncate_chars(trimmed, MAX_CHAT_LENGTH),
            timestamp: now_ms,
        };
        push_bounded(&mut self.chat_feed, message.clone(), MAX_CHAT_FEED);
        self.registry
            .broadcast(&ServerMessage::ChatBroadcast { message });
    }

    /// Rename the requesting player. Empty names and stale sessions are
    /// ignored without a reply.
    pub fn handle_rename(&mut self, player_id: &Uuid, name: &str) {
        if name.trim().is_empty() || !self.directory.contains(player_id) {
            return;
        }
        let taken = self.directory.names_excluding(Some(player_id));
        let next = resolve_unique(name, &taken);
        if let Some(player) = self.directory.get_mut(player_id) {
            player.name = next.clone();
        }
        self.registry.send(
            player_id,
            &ServerMessage::RenameResult {
                ok: true,
                name: next,
            },
        );
        self.broadcast();
    }

    /// Refresh every live snapshot in the vault, then push the full state to
    /// all sessions.
    pub fn broadcast(&mut self) {
        for player in self.directory.iter() {
            self.vault.store(player.clone());
        }
        let message = ServerMessage::Players {
            players: self.roster(),
            win_feed: self.win_feed.clone(),
            chat_feed: self.chat_feed.clone(),
        };
        self.registry.broadcast(&message);
    }

    pub(crate) fn roster(&self) -> Vec<PlayerView> {
        self.directory
            .iter()
            .map(|player| player.view(self.registry.is_admin(&player.id)))
            .collect()
    }

    pub(crate) fn password_matches(&self, password: &str) -> bool {
        !self.config.admin_password.is_empty() && password == self.config.admin_password
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
