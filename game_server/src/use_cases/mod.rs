// Use cases layer: application workflows for the game server.

pub mod game;
pub mod types;
pub mod world;

pub use game::{WorldInbox, world_task};
pub use types::{GameEvent, Outbox, PeerMessage, PeerOutbox, WorldUpdate};
pub use world::{World, WorldSettings};
