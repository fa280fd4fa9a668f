pub mod client;
pub mod events;

pub use client::{Ack, AdminAck, Client, ResetAck};
pub use events::{TableUpdate, Updates};

use thiserror::Error;

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid URL scheme: {0} (expected ws or wss)")]
    InvalidScheme(String),
    #[error("invalid frame: {0}")]
    InvalidFrame(#[from] serde_json::Error),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("dial timeout")]
    DialTimeout,
    #[error("unexpected response")]
    UnexpectedResponse,
    #[error("banned until {until}")]
    Banned { until: u64 },
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use plinko_server::{router, AppState, Engine, ServerConfig};
    use plinko_types::{
        ChatMessage, ClientRequest, Money, Payout, PlayerView, ServerMessage, WinRecord,
    };
    use std::sync::{Arc, Mutex};
    use tokio::time::{sleep, timeout, Duration};
    use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
    use uuid::Uuid;

    const WAIT: Duration = Duration::from_secs(5);

    struct TestContext {
        url: String,
        server_handle: tokio::task::JoinHandle<()>,
    }

    impl TestContext {
        async fn new() -> Self {
            Self::with_password("").await
        }

        async fn with_password(admin_password: &str) -> Self {
            let config = ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                starting_balance: Money::from_cents(500_00),
                admin_password: admin_password.to_string(),
            };
            let app = router(AppState {
                engine: Arc::new(Mutex::new(Engine::new(config))),
            });

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let server_handle = tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            // Give server time to start
            sleep(Duration::from_millis(100)).await;

            Self {
                url: format!("ws://{addr}/ws"),
                server_handle,
            }
        }
    }

    impl Drop for TestContext {
        fn drop(&mut self) {
            self.server_handle.abort();
        }
    }

    async fn join(ctx: &TestContext, name: &str) -> (Client, Updates) {
        Client::connect(&ctx.url, name, None).await.unwrap()
    }

    async fn next_update(updates: &mut Updates) -> TableUpdate {
        timeout(WAIT, updates.next())
            .await
            .expect("timed out waiting for update")
            .expect("update stream ended")
    }

    async fn next_roster(updates: &mut Updates) -> Vec<PlayerView> {
        loop {
            if let TableUpdate::Roster { players, .. } = next_update(updates).await {
                return players;
            }
        }
    }

    async fn roster_until<F>(updates: &mut Updates, mut predicate: F) -> Vec<PlayerView>
    where
        F: FnMut(&[PlayerView]) -> bool,
    {
        loop {
            let players = next_roster(updates).await;
            if predicate(&players) {
                return players;
            }
        }
    }

    async fn next_chat(updates: &mut Updates) -> ChatMessage {
        loop {
            if let TableUpdate::Chat(message) = next_update(updates).await {
                return message;
            }
        }
    }

    /// Wait for the service to drop the connection.
    async fn drain_to_close(updates: &mut Updates) {
        loop {
            match timeout(WAIT, updates.next())
                .await
                .expect("timed out waiting for close")
            {
                Some(_) => {}
                None => return,
            }
        }
    }

    type RawSocket = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn send_frame(socket: &mut RawSocket, request: &ClientRequest) {
        let frame = serde_json::to_string(request).unwrap();
        socket.send(WsMessage::Text(frame)).await.unwrap();
    }

    async fn next_frame(socket: &mut RawSocket) -> ServerMessage {
        loop {
            let frame = timeout(WAIT, socket.next())
                .await
                .expect("timed out waiting for frame")
                .expect("connection closed")
                .expect("websocket failure");
            if let WsMessage::Text(text) = frame {
                return serde_json::from_str(&text).expect("unparseable frame");
            }
        }
    }

    /// Assert the service sends nothing within a grace window.
    async fn expect_silence(socket: &mut RawSocket) {
        let outcome = timeout(Duration::from_millis(300), socket.next()).await;
        assert!(outcome.is_err(), "expected silence, got {outcome:?}");
    }

    fn balance_of(players: &[PlayerView], id: Uuid) -> Money {
        players
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.balance)
            .expect("player missing from roster")
    }

    fn sample_record(id: &str, bet: f64, multiplier: f64, payout: f64) -> WinRecord {
        WinRecord {
            id: id.to_string(),
            bet_amount: Money::try_from_f64(bet).unwrap(),
            row_count: 16,
            bin_index: 3,
            payout: Payout {
                multiplier,
                value: Money::try_from_f64(payout).unwrap(),
            },
            profit: Money::try_from_f64(payout - bet).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_rejects_non_websocket_scheme() {
        let outcome = Client::connect("http://127.0.0.1:9/ws", "Player", None).await;
        assert!(matches!(outcome, Err(Error::InvalidScheme(_))));
    }

    #[tokio::test]
    async fn test_join_assigns_defaults_and_snapshot() {
        let ctx = TestContext::new().await;
        let (client, mut updates) = Client::connect(&ctx.url, "", None).await.unwrap();

        let players = next_roster(&mut updates).await;
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].id, client.player_id());
        assert_eq!(players[0].name, "Player");
        assert_eq!(players[0].balance, Money::from_cents(500_00));
        assert!(players[0].win_records.is_empty());
        assert_eq!(players[0].total_profit_history, vec![Money::ZERO]);

        assert_eq!(client.name(), "Player");
        assert!(!client.token().is_empty());
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_duplicate_names_get_suffixes() {
        let ctx = TestContext::new().await;
        let (alice, mut updates) = join(&ctx, "Alice").await;
        let (shadow, _shadow_updates) = join(&ctx, "Alice").await;

        assert_eq!(alice.name(), "Alice");
        assert_eq!(shadow.name(), "Alice (2)");

        let players = roster_until(&mut updates, |ps| ps.len() == 2).await;
        assert!(players.iter().any(|p| p.name == "Alice (2)"));
    }

    #[tokio::test]
    async fn test_bet_debits_shared_balance() {
        let ctx = TestContext::new().await;
        let (client, mut updates) = join(&ctx, "Bettor").await;
        // A join queues two identical rosters: the welcome snapshot and the
        // join broadcast. Drain both before acting.
        let _ = next_roster(&mut updates).await;
        let _ = next_roster(&mut updates).await;

        let ack = client.bet(100.0).await.unwrap();
        assert!(ack.ok);
        assert!(ack.reason.is_none());

        let players = next_roster(&mut updates).await;
        assert_eq!(
            balance_of(&players, client.player_id()),
            Money::from_cents(400_00)
        );
    }

    #[tokio::test]
    async fn test_bet_rejections_leave_balance_intact() {
        let ctx = TestContext::new().await;
        let (client, mut updates) = join(&ctx, "Cautious").await;
        // A join queues two identical rosters: the welcome snapshot and the
        // join broadcast. Drain both before acting.
        let _ = next_roster(&mut updates).await;
        let _ = next_roster(&mut updates).await;

        for (amount, reason) in [
            (0.0, "Invalid bet"),
            (-5.0, "Invalid bet"),
            (9_999.0, "Not enough balance"),
        ] {
            let ack = client.bet(amount).await.unwrap();
            assert!(!ack.ok);
            assert_eq!(ack.reason.as_deref(), Some(reason));
        }

        // Rejected bets broadcast nothing; the next valid one shows the
        // balance was never touched.
        assert!(client.bet(500.0).await.unwrap().ok);
        let players = next_roster(&mut updates).await;
        assert_eq!(balance_of(&players, client.player_id()), Money::ZERO);
    }

    #[tokio::test]
    async fn test_win_report_credits_payout() {
        let ctx = TestContext::new().await;
        let (client, mut updates) = join(&ctx, "Dropper").await;
        // A join queues two identical rosters: the welcome snapshot and the
        // join broadcast. Drain both before acting.
        let _ = next_roster(&mut updates).await;
        let _ = next_roster(&mut updates).await;

        assert!(client.bet(100.0).await.unwrap().ok);
        let _ = next_roster(&mut updates).await;

        client
            .report_win(sample_record("r-1", 100.0, 2.5, 250.0))
            .unwrap();

        let players = next_roster(&mut updates).await;
        let own = players
            .iter()
            .find(|p| p.id == client.player_id())
            .unwrap();
        assert_eq!(own.balance, Money::from_cents(650_00));
        assert_eq!(own.win_records.len(), 1);
        assert_eq!(
            own.total_profit_history,
            vec![Money::ZERO, Money::from_cents(150_00)]
        );
    }

    #[tokio::test]
    async fn test_reset_restores_starting_balance() {
        let ctx = TestContext::new().await;
        let (client, mut updates) = join(&ctx, "Broke").await;
        // A join queues two identical rosters: the welcome snapshot and the
        // join broadcast. Drain both before acting.
        let _ = next_roster(&mut updates).await;
        let _ = next_roster(&mut updates).await;

        assert!(client.bet(200.0).await.unwrap().ok);
        let _ = next_roster(&mut updates).await;

        let ack = client.reset().await.unwrap();
        assert!(ack.ok);
        assert_eq!(ack.balance, Some(Money::from_cents(500_00)));

        let players = next_roster(&mut updates).await;
        assert_eq!(
            balance_of(&players, client.player_id()),
            Money::from_cents(500_00)
        );
    }

    #[tokio::test]
    async fn test_reconnect_restores_identity() {
        let ctx = TestContext::new().await;
        let (original, mut updates) = join(&ctx, "Dana").await;
        let _ = next_roster(&mut updates).await;
        assert!(original.bet(100.0).await.unwrap().ok);

        let id = original.player_id();
        let token = original.token().to_string();
        drop(updates);
        drop(original);

        // Let the service process the disconnect before rejoining.
        sleep(Duration::from_millis(100)).await;

        let (revived, mut updates) = Client::connect(&ctx.url, "Dana", Some(token.clone()))
            .await
            .unwrap();
        assert_eq!(revived.player_id(), id);
        assert_eq!(revived.token(), token);

        let players = next_roster(&mut updates).await;
        assert_eq!(players.len(), 1);
        assert_eq!(balance_of(&players, id), Money::from_cents(400_00));
    }

    #[tokio::test]
    async fn test_live_token_mints_fresh_identity() {
        let ctx = TestContext::new().await;
        let (original, _updates) = join(&ctx, "Eve").await;

        let (shadow, mut updates) =
            Client::connect(&ctx.url, "Eve", Some(original.token().to_string()))
                .await
                .unwrap();

        assert_ne!(shadow.player_id(), original.player_id());
        assert_ne!(shadow.token(), original.token());
        assert_eq!(shadow.name(), "Eve (2)");

        let players = next_roster(&mut updates).await;
        assert_eq!(players.len(), 2);
    }

    #[tokio::test]
    async fn test_chat_broadcast_and_rate_limit() {
        let ctx = TestContext::new().await;
        let (alice, mut alice_updates) = join(&ctx, "Alice").await;
        let (_bob, mut bob_updates) = join(&ctx, "Bob").await;

        let ack = alice.chat("  hello table  ").unwrap();
        assert!(ack.ok);

        let heard_by_alice = next_chat(&mut alice_updates).await;
        let heard_by_bob = next_chat(&mut bob_updates).await;
        assert_eq!(heard_by_alice.text, "hello table");
        assert_eq!(heard_by_alice.player_name, "Alice");
        assert_eq!(heard_by_alice.player_id, alice.player_id());
        assert_eq!(heard_by_bob.id, heard_by_alice.id);

        let ack = alice.chat("too fast").unwrap();
        assert!(!ack.ok);
        assert_eq!(ack.reason.as_deref(), Some("Please slow down"));

        let ack = alice.chat("   ").unwrap();
        assert_eq!(ack.reason.as_deref(), Some("Message required"));
    }

    #[tokio::test]
    async fn test_rename_resolves_collisions() {
        let ctx = TestContext::new().await;
        let (alice, mut updates) = join(&ctx, "Alice").await;
        let (_bob, _bob_updates) = join(&ctx, "Bob").await;

        alice.rename("Bob").unwrap();

        let (ok, name) = loop {
            if let TableUpdate::Renamed { ok, name } = next_update(&mut updates).await {
                break (ok, name);
            }
        };
        assert!(ok);
        assert_eq!(name, "Bob (2)");
        assert_eq!(alice.name(), "Bob (2)");
    }

    #[tokio::test]
    async fn test_admin_auth_unlocks_moderation() {
        let ctx = TestContext::with_password("sesame").await;
        let (moderator, mut moderator_updates) = join(&ctx, "Mod").await;
        let (target, mut target_updates) = join(&ctx, "Kid").await;

        let ack = moderator.authenticate_admin("wrong").await.unwrap();
        assert!(!ack.ok);
        assert_eq!(ack.reason.as_deref(), Some("Invalid password"));

        // The stored password rides along and the service re-checks it.
        let denied = moderator
            .admin_set_balance(target.player_id(), 125.5)
            .await
            .unwrap();
        assert!(!denied.ok);
        assert_eq!(denied.reason.as_deref(), Some("Invalid password"));

        let ack = moderator.authenticate_admin("sesame").await.unwrap();
        assert!(ack.ok);

        let granted = moderator
            .admin_set_balance(target.player_id(), 125.5)
            .await
            .unwrap();
        assert!(granted.ok);

        let players = roster_until(&mut target_updates, |ps| {
            balance_of(ps, target.player_id()) == Money::from_cents(125_50)
        })
        .await;
        let own = players
            .iter()
            .find(|p| p.id == moderator.player_id())
            .unwrap();
        assert!(own.is_admin);

        let _ = next_roster(&mut moderator_updates).await;
    }

    #[tokio::test]
    async fn test_admin_requires_stored_password() {
        let ctx = TestContext::with_password("sesame").await;
        let (client, _updates) = join(&ctx, "Nobody").await;

        let ack = client.admin_clear_chat().await.unwrap();
        assert!(!ack.ok);
        assert_eq!(ack.reason.as_deref(), Some("Not authorized"));
    }

    #[tokio::test]
    async fn test_admin_rename_requires_name() {
        let ctx = TestContext::with_password("sesame").await;
        let (moderator, _mod_updates) = join(&ctx, "Mod").await;
        let (target, mut target_updates) = join(&ctx, "Kid").await;
        assert!(moderator.authenticate_admin("sesame").await.unwrap().ok);

        let ack = moderator
            .admin_rename_player(target.player_id(), "   ")
            .await
            .unwrap();
        assert!(!ack.ok);
        assert_eq!(ack.reason.as_deref(), Some("Name is required"));

        let ack = moderator
            .admin_rename_player(target.player_id(), "Champ")
            .await
            .unwrap();
        assert!(ack.ok);

        roster_until(&mut target_updates, |ps| {
            ps.iter().any(|p| p.id == target.player_id() && p.name == "Champ")
        })
        .await;
        assert_eq!(target.name(), "Champ");
    }

    #[tokio::test]
    async fn test_ban_notifies_target_and_blocks_rejoin() {
        let ctx = TestContext::with_password("sesame").await;
        let (moderator, _mod_updates) = join(&ctx, "Mod").await;
        let (target, mut target_updates) = join(&ctx, "Kid").await;
        assert!(moderator.authenticate_admin("sesame").await.unwrap().ok);

        let token = target.token().to_string();
        let ack = moderator
            .admin_ban_player(target.player_id(), Some(1))
            .await
            .unwrap();
        assert!(ack.ok);

        let until = loop {
            match timeout(WAIT, target_updates.next())
                .await
                .expect("timed out waiting for ban notice")
            {
                Some(TableUpdate::Banned { until }) => break until,
                Some(_) => {}
                None => panic!("stream ended before ban notice"),
            }
        };
        assert!(until > 0);

        drain_to_close(&mut target_updates).await;
        let rejected = target.bet(10.0).await.unwrap();
        assert_eq!(
            rejected.reason.as_deref(),
            Some("Not connected to multiplayer")
        );

        let outcome = Client::connect(&ctx.url, "Kid", Some(token)).await;
        assert!(matches!(outcome, Err(Error::Banned { .. })));
    }

    #[tokio::test]
    async fn test_remove_player_frees_token() {
        let ctx = TestContext::with_password("sesame").await;
        let (moderator, _mod_updates) = join(&ctx, "Mod").await;
        let (target, mut target_updates) = join(&ctx, "Kid").await;
        assert!(moderator.authenticate_admin("sesame").await.unwrap().ok);

        let old_id = target.player_id();
        let token = target.token().to_string();
        let ack = moderator.admin_remove_player(old_id).await.unwrap();
        assert!(ack.ok);

        drain_to_close(&mut target_updates).await;

        // The token was purged with the player, so it resumes nothing.
        let (fresh, mut updates) = Client::connect(&ctx.url, "Kid", Some(token))
            .await
            .unwrap();
        assert_ne!(fresh.player_id(), old_id);

        let players = next_roster(&mut updates).await;
        assert_eq!(
            balance_of(&players, fresh.player_id()),
            Money::from_cents(500_00)
        );
    }

    #[tokio::test]
    async fn test_admin_list_players_snapshot() {
        let ctx = TestContext::with_password("sesame").await;
        let (moderator, _mod_updates) = join(&ctx, "Mod").await;
        let (_target, _target_updates) = join(&ctx, "Kid").await;
        assert!(moderator.authenticate_admin("sesame").await.unwrap().ok);

        let ack = moderator.admin_list_players().await.unwrap();
        assert!(ack.ok);
        let players = ack.players.expect("listing should carry the roster");
        assert_eq!(players.len(), 2);
        assert!(players.iter().any(|p| p.name == "Kid"));
    }

    #[tokio::test]
    async fn test_clear_chat_replaces_feed() {
        let ctx = TestContext::with_password("sesame").await;
        let (moderator, _mod_updates) = join(&ctx, "Mod").await;
        let (target, mut target_updates) = join(&ctx, "Kid").await;
        assert!(moderator.authenticate_admin("sesame").await.unwrap().ok);

        assert!(target.chat("hi all").unwrap().ok);
        let _ = next_chat(&mut target_updates).await;

        let ack = moderator.admin_clear_chat().await.unwrap();
        assert!(ack.ok);

        let feed = loop {
            if let TableUpdate::ChatFeed(feed) = next_update(&mut target_updates).await {
                break feed;
            }
        };
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn test_join_gating_and_malformed_frames() {
        let ctx = TestContext::new().await;
        let (mut socket, _) = connect_async(ctx.url.as_str()).await.unwrap();

        // Anything but a join on a fresh connection draws the gate reply.
        send_frame(
            &mut socket,
            &ClientRequest::Bet {
                amount: 10.0,
                request_id: "q-early".to_string(),
            },
        )
        .await;
        let reply = next_frame(&mut socket).await;
        assert!(
            matches!(&reply, ServerMessage::Error { message } if message == "Join first"),
            "expected the join gate, got {reply:?}"
        );

        // Unparseable text is dropped without a reply or a disconnect.
        socket
            .send(WsMessage::Text("this is not a frame".to_string()))
            .await
            .unwrap();
        expect_silence(&mut socket).await;

        // The connection survived both; a join still goes through.
        send_frame(
            &mut socket,
            &ClientRequest::Join {
                name: "Straggler".to_string(),
                token: None,
            },
        )
        .await;
        assert!(matches!(
            next_frame(&mut socket).await,
            ServerMessage::Welcome { .. }
        ));
        assert!(matches!(
            next_frame(&mut socket).await,
            ServerMessage::Players { .. }
        ));

        // A second join on the live session is ignored outright.
        send_frame(
            &mut socket,
            &ClientRequest::Join {
                name: "Straggler again".to_string(),
                token: None,
            },
        )
        .await;
        expect_silence(&mut socket).await;

        // And the session it tried to re-open still works.
        send_frame(
            &mut socket,
            &ClientRequest::Chat {
                text: "still here".to_string(),
            },
        )
        .await;
        let heard = loop {
            if let ServerMessage::ChatBroadcast { message } = next_frame(&mut socket).await {
                break message;
            }
        };
        assert_eq!(heard.text, "still here");
        assert_eq!(heard.player_name, "Straggler");
    }
}
