use crate::Money;

/// Maximum name length for players (join and rename)
pub const MAX_NAME_LENGTH: usize = 24;

/// Maximum chat message length in characters
pub const MAX_CHAT_LENGTH: usize = 256;

/// Per-player win record cap (oldest evicted)
pub const MAX_WIN_RECORDS: usize = 200;

/// Global win feed cap (oldest evicted)
pub const MAX_WIN_FEED: usize = 50;

/// Global chat feed cap (oldest evicted)
pub const MAX_CHAT_FEED: usize = 200;

/// Starting balance for new players unless overridden by configuration
pub const DEFAULT_STARTING_BALANCE: Money = Money::from_cents(500_00);

/// Ban duration applied when a moderation ban carries no explicit minutes
pub const DEFAULT_BAN_MINUTES: u64 = 1;

/// Fallback display name when a join request carries no usable name
pub const DEFAULT_PLAYER_NAME: &str = "Player";

/// How long a client waits for a typed acknowledgement before giving up
pub const REQUEST_TIMEOUT_MS: u64 = 3_000;

/// Minimum gap between chat sends enforced client-side
pub const CHAT_SEND_INTERVAL_MS: u64 = 500;

/// Fixed backoff between client reconnect attempts
pub const RECONNECT_DELAY_MS: u64 = 1_500;

/// Close code sent when a moderator removes a player
pub const CLOSE_CODE_REMOVED: u16 = 4001;

/// Close code sent when a player is banned
pub const CLOSE_CODE_BANNED: u16 = 4002;
