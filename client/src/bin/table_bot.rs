//! Automated table player.
//!
//! Connects to a running table service, wagers on an interval, reports the
//! simulated drop outcomes, and reconnects with its session token when the
//! connection drops.
//!
//! Usage:
//!   cargo run --bin table-bot -- --url ws://localhost:4173/ws [OPTIONS]
//!
//! Options:
//!   -u, --url       Table service endpoint (default: ws://127.0.0.1:4173/ws)
//!   -n, --name      Display name (default: random)
//!   -r, --rounds    Rounds to play before exiting (default: 25)
//!   -b, --bet       Wager per round in balance units (default: 10)
//!   -d, --delay-ms  Pause between rounds in ms (default: 1500)

use anyhow::Context;
use clap::Parser;
use plinko_client::{Client, Error, TableUpdate, Updates};
use plinko_types::{random_name, Money, Payout, WinRecord, RECONNECT_DELAY_MS};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Payout spread for a sixteen row board, widest at the edges.
const MULTIPLIERS: [f64; 17] = [
    16.0, 9.0, 2.0, 1.4, 1.4, 1.2, 1.1, 1.0, 0.5, 1.0, 1.1, 1.2, 1.4, 1.4, 2.0, 9.0, 16.0,
];

const ROW_COUNT: usize = 16;

#[derive(Parser, Debug)]
#[command(author, version, about = "Automated plinko table player")]
struct Args {
    #[arg(short, long, default_value = "ws://127.0.0.1:4173/ws")]
    url: String,

    #[arg(short, long)]
    name: Option<String>,

    #[arg(short, long, default_value = "25")]
    rounds: u32,

    #[arg(short, long, default_value = "10")]
    bet: f64,

    #[arg(short, long, default_value = "1500")]
    delay_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    Money::try_from_f64(args.bet).context("invalid bet amount")?;

    let mut rng = StdRng::from_entropy();
    let name = args
        .name
        .clone()
        .unwrap_or_else(|| random_name(&mut rng));

    let mut token: Option<String> = None;
    let mut rounds_left = args.rounds;
    let mut greeted = false;

    while rounds_left > 0 {
        let (client, updates) = match Client::connect(&args.url, &name, token.clone()).await {
            Ok(session) => session,
            Err(Error::Banned { until }) => {
                warn!(until, "table banned this bot");
                return Ok(());
            }
            Err(err) => {
                warn!(%err, "connect failed, retrying");
                sleep(Duration::from_millis(RECONNECT_DELAY_MS)).await;
                continue;
            }
        };
        token = Some(client.token().to_string());
        info!(player = %client.name(), id = %client.player_id(), "joined table");

        let watcher = tokio::spawn(watch_updates(updates));

        if !greeted {
            let _ = client.chat("glhf");
            greeted = true;
        }

        while rounds_left > 0 && client.is_connected() {
            match play_round(&client, args.bet, &mut rng).await {
                Ok(()) => rounds_left -= 1,
                Err(err) => {
                    warn!(%err, "round failed, reconnecting");
                    break;
                }
            }
            sleep(Duration::from_millis(args.delay_ms)).await;
        }

        watcher.abort();
        if rounds_left > 0 && !client.is_connected() {
            sleep(Duration::from_millis(RECONNECT_DELAY_MS)).await;
        }
    }

    info!("all rounds played");
    Ok(())
}

async fn play_round(client: &Client, bet: f64, rng: &mut StdRng) -> Result<(), Error> {
    let ack = client.bet(bet).await?;
    if !ack.ok {
        info!(reason = ?ack.reason, "bet rejected");
        if ack.reason.as_deref() == Some("Not enough balance") {
            let reset = client.reset().await?;
            info!(ok = reset.ok, balance = ?reset.balance, "asked for a balance reset");
        }
        return Ok(());
    }

    let record = simulate_drop(bet, rng);
    info!(
        bin = record.bin_index,
        multiplier = record.payout.multiplier,
        profit = %record.profit,
        "drop landed"
    );
    client.report_win(record)
}

/// Roll a binomial drop across the board and price it from the table.
fn simulate_drop(bet: f64, rng: &mut StdRng) -> WinRecord {
    let bin_index = (0..ROW_COUNT).filter(|_| rng.gen_bool(0.5)).count();
    let multiplier = MULTIPLIERS[bin_index];
    let payout = bet * multiplier;

    WinRecord {
        id: Uuid::new_v4().to_string(),
        bet_amount: Money::try_from_f64(bet).unwrap_or(Money::ZERO),
        row_count: ROW_COUNT as u8,
        bin_index: bin_index as u32,
        payout: Payout {
            multiplier,
            value: Money::try_from_f64(payout).unwrap_or(Money::ZERO),
        },
        profit: Money::try_from_f64(payout - bet).unwrap_or(Money::ZERO),
    }
}

async fn watch_updates(mut updates: Updates) {
    while let Some(update) = updates.next().await {
        match update {
            TableUpdate::Chat(message) => {
                info!(from = %message.player_name, text = %message.text, "chat");
            }
            TableUpdate::Roster { players, .. } => {
                debug!(players = players.len(), "roster sync");
            }
            TableUpdate::Banned { until } => warn!(until, "banned from the table"),
            TableUpdate::ServerError { message } => warn!(%message, "service error"),
            _ => {}
        }
    }
}
