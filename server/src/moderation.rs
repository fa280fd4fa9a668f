use plinko_types::{
    resolve_unique, AdminAction, Money, PlayerView, ServerMessage, CLOSE_CODE_BANNED,
    CLOSE_CODE_REMOVED, DEFAULT_BAN_MINUTES,
};
use tracing::info;
use uuid::Uuid;

use crate::engine::{Engine, Rejection};

/// A moderation request as received off the wire.
#[derive(Debug)]
pub struct AdminRequest {
    pub action: String,
    pub password: String,
    pub request_id: String,
    pub player_id: Option<String>,
    pub name: Option<String>,
    pub balance: Option<f64>,
    pub minutes: Option<u64>,
}

/// What a successful action owes beyond its direct reply.
enum ActionOutcome {
    /// State changed; push the full state to everyone.
    Mutated,
    /// Read-only directory snapshot for the requester.
    Listing(Vec<PlayerView>),
    /// Chat feed emptied; fan out the now-empty feed.
    ChatCleared,
}

impl Engine {
    /// Check the shared secret and mark the session privileged on success.
    pub fn handle_admin_auth(&mut self, player_id: &Uuid, password: &str, request_id: String) {
        if self.password_matches(password) {
            self.registry.set_admin(player_id, true);
            info!(%player_id, "session authorized for moderation");
            self.registry.send(
                player_id,
                &ServerMessage::AdminAuthResult {
                    request_id,
                    ok: true,
                    reason: None,
                },
            );
            self.broadcast();
        } else {
            self.registry.send(
                player_id,
                &ServerMessage::AdminAuthResult {
                    request_id,
                    ok: false,
                    reason: Some(Rejection::InvalidPassword.to_string()),
                },
            );
        }
    }

    pub fn handle_admin_action(&mut self, session_id: &Uuid, request: AdminRequest, now_ms: u64) {
        let action = request.action.clone();
        let request_id = request.request_id.clone();
        match self.apply_admin_action(session_id, &request, now_ms) {
            Ok(outcome) => {
                let players = match &outcome {
                    ActionOutcome::Listing(players) => Some(players.clone()),
                    _ => None,
                };
                self.registry.send(
                    session_id,
                    &ServerMessage::AdminActionResult {
                        request_id,
                        ok: true,
                        reason: None,
                        action,
                        players,
                    },
                );
                match outcome {
                    ActionOutcome::Mutated => self.broadcast(),
                    ActionOutcome::ChatCleared => {
                        let chat_feed = self.chat_feed.clone();
                        self.registry
                            .broadcast(&ServerMessage::ChatFeed { chat_feed });
                    }
                    ActionOutcome::Listing(_) => {}
                }
            }
            Err(rejection) => {
                self.registry.send(
                    session_id,
                    &ServerMessage::AdminActionResult {
                        request_id,
                        ok: false,
                        reason: Some(rejection.to_string()),
                        action,
                        players: None,
                    },
                );
            }
        }
    }

    fn apply_admin_action(
        &mut self,
        session_id: &Uuid,
        request: &AdminRequest,
        now_ms: u64,
    ) -> Result<ActionOutcome, Rejection> {
        if !self.password_matches(&request.password) {
            return Err(Rejection::InvalidPassword);
        }
        self.registry.set_admin(session_id, true);
        let action = AdminAction::parse(&request.action).ok_or(Rejection::UnknownAdminAction)?;
        match action {
            AdminAction::ListPlayers => Ok(ActionOutcome::Listing(self.roster())),
            AdminAction::ClearChat => {
                self.chat_feed.clear();
                info!(by = %session_id, "chat feed cleared");
                Ok(ActionOutcome::ChatCleared)
            }
            AdminAction::RenamePlayer => {
                let target = self.lookup_target(request.player_id.as_deref())?;
                self.admin_rename(&target, request.name.as_deref())
            }
            AdminAction::SetBalance => {
                let target = self.lookup_target(request.player_id.as_deref())?;
                self.admin_set_balance(&target, request.balance)
            }
            AdminAction::ResetPlayer => {
                let target = self.lookup_target(request.player_id.as_deref())?;
                self.admin_reset(&target)
            }
            AdminAction::RemovePlayer => {
                let target = self.lookup_target(request.player_id.as_deref())?;
                self.admin_remove(&target)
            }
            AdminAction::BanPlayer => {
                let target = self.lookup_target(request.player_id.as_deref())?;
                self.admin_ban(&target, request.minutes, now_ms)
            }
        }
    }

    fn lookup_target(&self, raw: Option<&str>) -> Result<Uuid, Rejection> {
        let id = raw
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or(Rejection::PlayerNotFound)?;
        if self.directory.contains(&id) {
            Ok(id)
        } else {
            Err(Rejection::PlayerNotFound)
        }
    }

    fn admin_rename(
        &mut self,
        target: &Uuid,
        name: Option<&str>,
    ) -> Result<ActionOutcome, Rejection> {
        let requested = name.map(str::trim).unwrap_or_default();
        if requested.is_empty() {
            return Err(Rejection::NameRequired);
        }
        let taken = self.directory.names_excluding(Some(target));
        let next = resolve_unique(requested, &taken);
        if let Some(player) = self.directory.get_mut(target) {
            info!(%target, from = %player.name, to = %next, "player renamed by moderator");
            player.name = next;
        }
        Ok(ActionOutcome::Mutated)
    }

    fn admin_set_balance(
        &mut self,
        target: &Uuid,
        balance: Option<f64>,
    ) -> Result<ActionOutcome, Rejection> {
        let raw = balance.ok_or(Rejection::InvalidBalanceValue)?;
        let value = Money::try_from_f64(raw).map_err(|_| Rejection::InvalidBalanceValue)?;
        if let Some(player) = self.directory.get_mut(target) {
            info!(%target, %value, "balance set by moderator");
            player.balance = value;
        }
        Ok(ActionOutcome::Mutated)
    }

    fn admin_reset(&mut self, target: &Uuid) -> Result<ActionOutcome, Rejection> {
        let starting_balance = self.config.starting_balance;
        if let Some(player) = self.directory.get_mut(target) {
            info!(%target, "player reset by moderator");
            player.reset(starting_balance);
        }
        Ok(ActionOutcome::Mutated)
    }

    /// Evict the player and its token, then force-close its connection.
    fn admin_remove(&mut self, target: &Uuid) -> Result<ActionOutcome, Rejection> {
        if let Some(player) = self.directory.remove(target) {
            info!(%target, name = %player.name, "player removed by moderator");
            self.vault.take(&player.token);
        }
        self.registry.close(target, CLOSE_CODE_REMOVED, "removed");
        self.registry.remove(target);
        Ok(ActionOutcome::Mutated)
    }

    /// Move the target's token from the vault into the ban ledger, then
    /// notify and force-close its connection.
    fn admin_ban(
        &mut self,
        target: &Uuid,
        minutes: Option<u64>,
        now_ms: u64,
    ) -> Result<ActionOutcome, Rejection> {
        let minutes = minutes.unwrap_or(DEFAULT_BAN_MINUTES);
        let until = now_ms.saturating_add(minutes.saturating_mul(60_000));
        if let Some(player) = self.directory.remove(target) {
            info!(%target, name = %player.name, until, "player banned by moderator");
            self.vault.take(&player.token);
            self.bans.insert(player.token, until);
        }
        self.registry
            .send(target, &ServerMessage::Banned { until });
        self.registry.close(target, CLOSE_CODE_BANNED, "banned");
        self.registry.remove(target);
        Ok(ActionOutcome::Mutated)
    }
}
