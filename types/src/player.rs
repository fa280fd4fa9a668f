use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Money, MAX_WIN_RECORDS};

/// Payout of a single settled ball.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    /// Multiplier applied to the bet (e.g. `0.3`, `1.5`).
    pub multiplier: f64,
    /// Amount credited back to the player.
    pub value: Money,
}

/// A settled ball drop as reported by a game client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinRecord {
    /// Client-assigned identifier of the record.
    pub id: String,
    /// How much the player bet on the ball.
    pub bet_amount: Money,
    /// Number of pin rows at the time the ball was dropped.
    pub row_count: u8,
    /// Zero-based index of the bin the ball fell into (leftmost is 0).
    pub bin_index: u32,
    pub payout: Payout,
    /// Payout value minus the bet amount.
    pub profit: Money,
}

/// Authoritative per-player state held by the table service.
///
/// This is the internal record; what goes over the wire is the
/// [`PlayerView`] projection, which never includes the resume token.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub balance: Money,
    /// Most recent settled balls, oldest first, capped at [`MAX_WIN_RECORDS`].
    pub win_records: Vec<WinRecord>,
    /// Running profit totals, one entry per settled ball plus the leading
    /// zero. Unlike `win_records` this list is never truncated.
    pub total_profit_history: Vec<Money>,
    /// Opaque resume token handed to the owning client on join.
    pub token: String,
}

impl Player {
    pub fn new(id: Uuid, name: String, balance: Money, token: String) -> Self {
        Self {
            id,
            name,
            balance,
            win_records: Vec::new(),
            total_profit_history: vec![Money::ZERO],
            token,
        }
    }

    /// Settle a win: extend the histories and credit the payout.
    pub fn apply_win(&mut self, record: WinRecord) {
        let last_total = self
            .total_profit_history
            .last()
            .copied()
            .unwrap_or(Money::ZERO);
        self.total_profit_history.push(last_total + record.profit);
        self.balance += record.payout.value;
        self.win_records.push(record);
        if self.win_records.len() > MAX_WIN_RECORDS {
            let excess = self.win_records.len() - MAX_WIN_RECORDS;
            self.win_records.drain(..excess);
        }
    }

    /// Restore the starting balance and wipe both histories.
    pub fn reset(&mut self, starting_balance: Money) {
        self.balance = starting_balance;
        self.win_records.clear();
        self.total_profit_history = vec![Money::ZERO];
    }

    /// Project the wire-facing snapshot of this player.
    pub fn view(&self, is_admin: bool) -> PlayerView {
        PlayerView {
            id: self.id,
            name: self.name.clone(),
            balance: self.balance,
            win_records: self.win_records.clone(),
            total_profit_history: self.total_profit_history.clone(),
            is_admin,
        }
    }
}

/// Snapshot of a player as embedded in roster pushes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: Uuid,
    pub name: String,
    pub balance: Money,
    pub win_records: Vec<WinRecord>,
    pub total_profit_history: Vec<Money>,
    /// Whether this player currently holds moderation rights.
    #[serde(default)]
    pub is_admin: bool,
}
