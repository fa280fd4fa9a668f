use plinko_types::{Money, DEFAULT_STARTING_BALANCE};

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Balance handed to every fresh identity, also the reset target.
    pub starting_balance: Money,
    /// Shared moderation secret. When empty, every moderation request is
    /// rejected.
    pub admin_password: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: read_string("PLINKO_HOST", "0.0.0.0"),
            port: read_u16("PLINKO_PORT", 4173),
            starting_balance: read_money("PLINKO_STARTING_BALANCE", DEFAULT_STARTING_BALANCE),
            admin_password: read_string("PLINKO_ADMIN_PASSWORD", ""),
        }
    }
}

fn read_string(key: &str, fallback: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| fallback.to_string())
}

fn read_u16(key: &str, fallback: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<u16>().ok())
        .unwrap_or(fallback)
}

fn read_money(key: &str, fallback: Money) -> Money {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<f64>().ok())
        .and_then(|units| Money::try_from_f64(units).ok())
        .unwrap_or(fallback)
}
