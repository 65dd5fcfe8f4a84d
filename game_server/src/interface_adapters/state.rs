use crate::interface_adapters::ids::PlayerIds;
use crate::use_cases::GameEvent;
use axum::extract::ws::Utf8Bytes;
use game_shared::Clock;
use std::{sync::Arc, time::Duration};
use tokio::sync::{broadcast, mpsc, watch};

#[derive(Clone)]
pub struct AppState {
    // Join/Leave/ShootingIntent flowing into the world task, in order.
    pub reliable_tx: mpsc::UnboundedSender<GameEvent>,
    // Transform samples flowing into the world task; dropped when full.
    pub unreliable_tx: mpsc::Sender<GameEvent>,
    // Serialized world updates, shared across all connections.
    pub world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    // Latest serialized world update for lag recovery.
    pub world_latest_tx: watch::Sender<Utf8Bytes>,
    // Stamps transform samples on arrival.
    pub clock: Arc<dyn Clock>,
    pub player_ids: Arc<PlayerIds>,
    pub conn: ConnSettings,
}

#[derive(Debug, Clone, Copy)]
pub struct ConnSettings {
    // Per-connection queue for corrections; excess is dropped.
    pub peer_unreliable_capacity: usize,
    // How long a fresh socket may take to send Join.
    pub join_timeout: Duration,
}
