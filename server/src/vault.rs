use std::collections::HashMap;

use plinko_types::Player;

/// Player snapshots keyed by resume token.
///
/// Snapshots are refreshed on every sync, not just on disconnect, so a
/// reconnecting client always resumes the latest state the table saw.
#[derive(Debug, Default)]
pub struct TokenVault {
    entries: HashMap<String, Player>,
}

impl TokenVault {
    pub fn store(&mut self, player: Player) {
        self.entries.insert(player.token.clone(), player);
    }

    /// Remove and return the snapshot for a token, if any.
    pub fn take(&mut self, token: &str) -> Option<Player> {
        self.entries.remove(token)
    }
}

/// Banned resume tokens and their expiry in milliseconds since the epoch.
///
/// A token lives in the vault or in the ledger, never both: banning moves
/// it here, and rejoining after expiry starts over with a fresh identity.
#[derive(Debug, Default)]
pub struct BanLedger {
    bans: HashMap<String, u64>,
}

impl BanLedger {
    pub fn insert(&mut self, token: String, until_ms: u64) {
        self.bans.insert(token, until_ms);
    }

    /// Expiry of an active ban for this token. Expired entries are evicted
    /// on lookup.
    pub fn active_until(&mut self, token: &str, now_ms: u64) -> Option<u64> {
        match self.bans.get(token) {
            Some(&until) if until > now_ms => Some(until),
            Some(_) => {
                self.bans.remove(token);
                None
            }
            None => None,
        }
    }
}
