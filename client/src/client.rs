use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use plinko_types::{
    truncate_chars, AdminAction, ChatMessage, ClientRequest, Money, PlayerView, ServerMessage,
    WinFeedEntry, WinRecord, CHAT_SEND_INTERVAL_MS, MAX_CHAT_LENGTH, MAX_NAME_LENGTH,
    REQUEST_TIMEOUT_MS,
};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::events::{TableUpdate, Updates};
use crate::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_millis(REQUEST_TIMEOUT_MS);
const CHAT_SEND_INTERVAL: Duration = Duration::from_millis(CHAT_SEND_INTERVAL_MS);

const NOT_CONNECTED: &str = "Not connected to multiplayer";

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Service verdict for a correlated request.
#[derive(Debug, Clone)]
pub struct Ack {
    pub ok: bool,
    pub reason: Option<String>,
}

impl Ack {
    fn rejected(reason: &str) -> Self {
        Self {
            ok: false,
            reason: Some(reason.to_string()),
        }
    }
}

/// Verdict for a balance reset; `balance` carries the restored amount.
#[derive(Debug, Clone)]
pub struct ResetAck {
    pub ok: bool,
    pub reason: Option<String>,
    pub balance: Option<Money>,
}

impl ResetAck {
    fn rejected(reason: &str) -> Self {
        Self {
            ok: false,
            reason: Some(reason.to_string()),
            balance: None,
        }
    }
}

/// Verdict for a moderation request; `players` is set for `list_players`.
#[derive(Debug, Clone)]
pub struct AdminAck {
    pub ok: bool,
    pub reason: Option<String>,
    pub players: Option<Vec<PlayerView>>,
}

impl AdminAck {
    fn rejected(reason: &str) -> Self {
        Self {
            ok: false,
            reason: Some(reason.to_string()),
            players: None,
        }
    }
}

/// State shared between the session handle and its reader task.
struct Shared {
    player_id: Uuid,
    name: Mutex<String>,
    pending: Mutex<HashMap<String, oneshot::Sender<ServerMessage>>>,
    admin_password: Mutex<Option<String>>,
    last_chat: Mutex<Option<Instant>>,
    connected: AtomicBool,
}

impl Shared {
    fn register(&self, request_id: String) -> oneshot::Receiver<ServerMessage> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(request_id, tx);
        rx
    }

    fn discard(&self, request_id: &str) {
        self.pending.lock().unwrap().remove(request_id);
    }

    fn resolve(&self, request_id: &str, reply: ServerMessage) {
        let sender = self.pending.lock().unwrap().remove(request_id);
        match sender {
            Some(sender) => {
                let _ = sender.send(reply);
            }
            // Usually a reply that arrived after its request timed out.
            None => debug!(request_id, "reply for unknown request"),
        }
    }

    /// The directory is the authority on names; a moderator may have
    /// renamed us since the last sync.
    fn sync_own_name(&self, players: &[PlayerView]) {
        if let Some(own) = players.iter().find(|p| p.id == self.player_id) {
            let mut name = self.name.lock().unwrap();
            if *name != own.name {
                *name = own.name.clone();
            }
        }
    }
}

/// Fields of the join reply.
struct JoinSnapshot {
    player_id: Uuid,
    players: Vec<PlayerView>,
    win_feed: Vec<WinFeedEntry>,
    chat_feed: Vec<ChatMessage>,
    token: String,
}

/// Handle to one joined table session.
///
/// Request methods return soft verdicts (the `Ack` family) for anything the
/// service can refuse; `Err` is reserved for transport failures. Dropping
/// the handle closes the connection.
pub struct Client {
    shared: Arc<Shared>,
    outbound: mpsc::UnboundedSender<Message>,
    token: String,
    reader: JoinHandle<()>,
}

impl Drop for Client {
    fn drop(&mut self) {
        // The writer is left to drain on its own once `outbound` drops.
        self.reader.abort();
    }
}

impl Client {
    /// Connect to a table service and join with `name`.
    ///
    /// Pass the token from a previous session to resume that identity.
    /// Returns the session handle plus the update stream; the stream's
    /// first item is the roster snapshot from the join reply.
    pub async fn connect(
        url: &str,
        name: &str,
        token: Option<String>,
    ) -> Result<(Self, Updates)> {
        let parsed = Url::parse(url)?;
        match parsed.scheme() {
            "ws" | "wss" => {}
            other => return Err(Error::InvalidScheme(other.to_string())),
        }

        let (socket, _) = connect_async(parsed.as_str()).await?;
        let (mut sink, mut stream) = socket.split();

        let join = ClientRequest::Join {
            name: name.to_string(),
            token,
        };
        sink.send(Message::Text(serde_json::to_string(&join)?))
            .await?;

        let snapshot = match timeout(REQUEST_TIMEOUT, await_welcome(&mut stream)).await {
            Ok(result) => result?,
            Err(_) => return Err(Error::DialTimeout),
        };

        let own_name = snapshot
            .players
            .iter()
            .find(|p| p.id == snapshot.player_id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| name.to_string());

        let shared = Arc::new(Shared {
            player_id: snapshot.player_id,
            name: Mutex::new(own_name),
            pending: Mutex::new(HashMap::new()),
            admin_password: Mutex::new(None),
            last_chat: Mutex::new(None),
            connected: AtomicBool::new(true),
        });

        let (updates_tx, updates) = Updates::channel();
        let _ = updates_tx
            .send(TableUpdate::Roster {
                players: snapshot.players,
                win_feed: snapshot.win_feed,
                chat_feed: snapshot.chat_feed,
            })
            .await;

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(sink, outbound_rx));
        let reader = tokio::spawn(read_loop(stream, shared.clone(), updates_tx));

        Ok((
            Self {
                shared,
                outbound,
                token: snapshot.token,
                reader,
            },
            updates,
        ))
    }

    /// Identity assigned by the service for this session.
    pub fn player_id(&self) -> Uuid {
        self.shared.player_id
    }

    /// Resume token for reconnecting with the same identity.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Current display name, tracking service-side renames.
    pub fn name(&self) -> String {
        self.shared.name.lock().unwrap().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Relaxed)
    }

    /// Place a wager. The service debits the balance up front; payouts
    /// arrive later via [`Client::report_win`].
    pub async fn bet(&self, amount: f64) -> Result<Ack> {
        if !self.is_connected() {
            return Ok(Ack::rejected(NOT_CONNECTED));
        }
        let request_id = new_request_id();
        let request = ClientRequest::Bet {
            amount,
            request_id: request_id.clone(),
        };
        match self.request(&request, request_id).await? {
            Some(ServerMessage::BetResult { ok, reason, .. }) => Ok(Ack { ok, reason }),
            Some(_) => Err(Error::UnexpectedResponse),
            None => Ok(Ack::rejected("Bet request timed out")),
        }
    }

    /// Report a settled drop so the payout lands on the shared roster.
    pub fn report_win(&self, record: WinRecord) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::ConnectionClosed);
        }
        self.send(&ClientRequest::Win { record })
    }

    /// Ask the service to restore the starting balance.
    pub async fn reset(&self) -> Result<ResetAck> {
        if !self.is_connected() {
            return Ok(ResetAck::rejected(NOT_CONNECTED));
        }
        let request_id = new_request_id();
        let request = ClientRequest::Reset {
            request_id: request_id.clone(),
        };
        match self.request(&request, request_id).await? {
            Some(ServerMessage::ResetResult {
                ok,
                reason,
                balance,
                ..
            }) => Ok(ResetAck {
                ok,
                reason,
                balance,
            }),
            Some(_) => Err(Error::UnexpectedResponse),
            None => Ok(ResetAck::rejected("Reset request timed out")),
        }
    }

    /// Send a chat line. The verdict is local: empty lines and lines sent
    /// faster than the send interval are refused without a round trip.
    pub fn chat(&self, text: &str) -> Result<Ack> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Ack::rejected("Message required"));
        }
        if !self.is_connected() {
            return Ok(Ack::rejected(NOT_CONNECTED));
        }
        {
            let mut last = self.shared.last_chat.lock().unwrap();
            if let Some(sent) = *last {
                if sent.elapsed() < CHAT_SEND_INTERVAL {
                    return Ok(Ack::rejected("Please slow down"));
                }
            }
            *last = Some(Instant::now());
        }
        self.send(&ClientRequest::Chat {
            text: truncate_chars(trimmed, MAX_CHAT_LENGTH),
        })?;
        Ok(Ack {
            ok: true,
            reason: None,
        })
    }

    /// Request a new display name. The verdict arrives on the update
    /// stream as [`TableUpdate::Renamed`]; empty names are dropped here.
    pub fn rename(&self, name: &str) -> Result<()> {
        let trimmed = truncate_chars(name.trim(), MAX_NAME_LENGTH);
        if trimmed.is_empty() || !self.is_connected() {
            return Ok(());
        }
        self.send(&ClientRequest::Rename { name: trimmed })
    }

    /// Unlock moderation for this session.
    ///
    /// The password is kept for later moderation calls even when the
    /// service refuses it; each call carries it again anyway.
    pub async fn authenticate_admin(&self, password: &str) -> Result<Ack> {
        if !self.is_connected() {
            return Ok(Ack::rejected(NOT_CONNECTED));
        }
        *self.shared.admin_password.lock().unwrap() = Some(password.to_string());
        let request_id = new_request_id();
        let request = ClientRequest::AdminAuth {
            password: password.to_string(),
            request_id: request_id.clone(),
        };
        match self.request(&request, request_id).await? {
            Some(ServerMessage::AdminAuthResult { ok, reason, .. }) => Ok(Ack { ok, reason }),
            Some(_) => Err(Error::UnexpectedResponse),
            None => Ok(Ack::rejected("Admin request timed out")),
        }
    }

    /// Rename another player.
    pub async fn admin_rename_player(&self, player_id: Uuid, name: &str) -> Result<AdminAck> {
        let trimmed = truncate_chars(name.trim(), MAX_NAME_LENGTH);
        if trimmed.is_empty() {
            return Ok(AdminAck::rejected("Name is required"));
        }
        self.admin_request(
            AdminAction::RenamePlayer,
            Some(player_id),
            Some(trimmed),
            None,
            None,
        )
        .await
    }

    /// Overwrite a player's balance.
    pub async fn admin_set_balance(&self, player_id: Uuid, balance: f64) -> Result<AdminAck> {
        self.admin_request(
            AdminAction::SetBalance,
            Some(player_id),
            None,
            Some(balance),
            None,
        )
        .await
    }

    /// Restore a player to the starting balance and wipe their history.
    pub async fn admin_reset_player(&self, player_id: Uuid) -> Result<AdminAck> {
        self.admin_request(AdminAction::ResetPlayer, Some(player_id), None, None, None)
            .await
    }

    /// Evict a player and invalidate their resume token.
    pub async fn admin_remove_player(&self, player_id: Uuid) -> Result<AdminAck> {
        self.admin_request(AdminAction::RemovePlayer, Some(player_id), None, None, None)
            .await
    }

    /// Evict a player and refuse their token for `minutes` (service
    /// default when `None`).
    pub async fn admin_ban_player(
        &self,
        player_id: Uuid,
        minutes: Option<u64>,
    ) -> Result<AdminAck> {
        self.admin_request(AdminAction::BanPlayer, Some(player_id), None, None, minutes)
            .await
    }

    /// Fetch a roster snapshot without broadcasting anything.
    pub async fn admin_list_players(&self) -> Result<AdminAck> {
        self.admin_request(AdminAction::ListPlayers, None, None, None, None)
            .await
    }

    /// Clear the shared chat history.
    pub async fn admin_clear_chat(&self) -> Result<AdminAck> {
        self.admin_request(AdminAction::ClearChat, None, None, None, None)
            .await
    }

    async fn admin_request(
        &self,
        action: AdminAction,
        player_id: Option<Uuid>,
        name: Option<String>,
        balance: Option<f64>,
        minutes: Option<u64>,
    ) -> Result<AdminAck> {
        let password = match self.shared.admin_password.lock().unwrap().clone() {
            Some(password) => password,
            None => return Ok(AdminAck::rejected("Not authorized")),
        };
        if !self.is_connected() {
            return Ok(AdminAck::rejected(NOT_CONNECTED));
        }
        let request_id = new_request_id();
        let request = ClientRequest::AdminAction {
            action: action.as_str().to_string(),
            password,
            request_id: request_id.clone(),
            player_id: player_id.map(|id| id.to_string()),
            name,
            balance,
            minutes,
        };
        match self.request(&request, request_id).await? {
            Some(ServerMessage::AdminActionResult {
                ok,
                reason,
                players,
                ..
            }) => Ok(AdminAck {
                ok,
                reason,
                players,
            }),
            Some(_) => Err(Error::UnexpectedResponse),
            None => Ok(AdminAck::rejected("Admin request timed out")),
        }
    }

    /// Send `request` and wait for its reply; `None` means it timed out.
    async fn request(
        &self,
        request: &ClientRequest,
        request_id: String,
    ) -> Result<Option<ServerMessage>> {
        let reply = self.shared.register(request_id.clone());
        if let Err(err) = self.send(request) {
            self.shared.discard(&request_id);
            return Err(err);
        }
        match timeout(REQUEST_TIMEOUT, reply).await {
            Ok(Ok(reply)) => Ok(Some(reply)),
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                self.shared.discard(&request_id);
                Ok(None)
            }
        }
    }

    fn send(&self, request: &ClientRequest) -> Result<()> {
        let frame = serde_json::to_string(request)?;
        self.outbound
            .send(Message::Text(frame))
            .map_err(|_| Error::ConnectionClosed)
    }
}

fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// The service answers a join with exactly one `welcome` or `banned` frame.
async fn await_welcome(stream: &mut SplitStream<Socket>) -> Result<JoinSnapshot> {
    loop {
        let frame = match stream.next().await {
            Some(frame) => frame?,
            None => return Err(Error::ConnectionClosed),
        };
        match frame {
            Message::Text(text) => match serde_json::from_str::<ServerMessage>(&text)? {
                ServerMessage::Welcome {
                    player_id,
                    players,
                    win_feed,
                    chat_feed,
                    token,
                } => {
                    return Ok(JoinSnapshot {
                        player_id,
                        players,
                        win_feed,
                        chat_feed,
                        token,
                    })
                }
                ServerMessage::Banned { until } => return Err(Error::Banned { until }),
                other => debug!(?other, "ignoring frame before welcome"),
            },
            Message::Close(_) => return Err(Error::ConnectionClosed),
            _ => {}
        }
    }
}

async fn write_loop(
    mut sink: SplitSink<Socket, Message>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(frame) = outbound.recv().await {
        if sink.send(frame).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}

async fn read_loop(
    mut stream: SplitStream<Socket>,
    shared: Arc<Shared>,
    updates: mpsc::Sender<TableUpdate>,
) {
    while let Some(frame) = stream.next().await {
        let message = match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                Ok(message) => message,
                Err(err) => {
                    warn!(?err, "dropping malformed frame");
                    continue;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                debug!(?err, "websocket error");
                break;
            }
        };
        // A dropped update stream only loses pushes; replies keep flowing.
        match message {
            ServerMessage::Players {
                players,
                win_feed,
                chat_feed,
            } => {
                shared.sync_own_name(&players);
                let _ = updates
                    .send(TableUpdate::Roster {
                        players,
                        win_feed,
                        chat_feed,
                    })
                    .await;
            }
            ServerMessage::ChatBroadcast { message } => {
                let _ = updates.send(TableUpdate::Chat(message)).await;
            }
            ServerMessage::ChatFeed { chat_feed } => {
                let _ = updates.send(TableUpdate::ChatFeed(chat_feed)).await;
            }
            ServerMessage::RenameResult { ok, name } => {
                if ok {
                    *shared.name.lock().unwrap() = name.clone();
                }
                let _ = updates.send(TableUpdate::Renamed { ok, name }).await;
            }
            ServerMessage::Banned { until } => {
                let _ = updates.send(TableUpdate::Banned { until }).await;
            }
            ServerMessage::Error { message } => {
                let _ = updates.send(TableUpdate::ServerError { message }).await;
            }
            ServerMessage::BetResult { ref request_id, .. }
            | ServerMessage::ResetResult { ref request_id, .. }
            | ServerMessage::AdminAuthResult { ref request_id, .. }
            | ServerMessage::AdminActionResult { ref request_id, .. } => {
                let request_id = request_id.clone();
                shared.resolve(&request_id, message);
            }
            // A second welcome never happens on a live session.
            ServerMessage::Welcome { .. } => {}
        }
    }
    shared.connected.store(false, Ordering::Relaxed);
    shared.pending.lock().unwrap().clear();
}
