//! Realtime table service for multiplayer plinko.
//!
//! All mutable state lives in a single [`Engine`] behind a mutex: inbound
//! frames across every connection are handled one at a time, and each live
//! session holds an unbounded writer queue the engine pushes frames into.

mod config;
mod directory;
mod engine;
mod moderation;
mod registry;
mod vault;
mod ws;

pub use config::ServerConfig;
pub use engine::{unix_ms, Engine, JoinOutcome, Rejection};
pub use moderation::AdminRequest;
pub use ws::{router, AppState};
