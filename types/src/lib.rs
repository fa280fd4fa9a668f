//! Domain and wire types for the plinko table service.
//!
//! Defines money/player/feed state, name resolution, and the tagged frame
//! unions shared by the server and client crates.

mod constants;
mod feed;
mod money;
mod names;
mod player;
mod protocol;

pub use constants::*;
pub use feed::*;
pub use money::*;
pub use names::*;
pub use player::*;
pub use protocol::*;
