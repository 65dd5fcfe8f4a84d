// Use-case level inputs/outputs for the world loop.

use game_shared::{
    ChannelClosed, Delivery, ReliableSender, Transform, TransformSample, UnreliableSender,
};
use tokio::sync::mpsc;

use crate::domain::PawnSnapshot;

#[derive(Debug, Clone)]
pub enum GameEvent {
    Join { player_id: u64, outbox: PeerOutbox },
    Leave { player_id: u64 },
    ReportTransform { player_id: u64, sample: TransformSample },
    ReportShootingIntent { player_id: u64, is_shooting: bool },
}

/// Messages the world addresses to one specific peer.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerMessage {
    CorrectTransform(Transform),
    ShootingStateSync { player_id: u64, is_shooting: bool },
}

#[derive(Debug, Clone)]
pub struct WorldUpdate {
    pub tick: u64,
    pub pawns: Vec<PawnSnapshot>,
}

/// Anything the world can address a peer through, over both delivery contracts.
pub trait Outbox: UnreliableSender<PeerMessage> + ReliableSender<PeerMessage> {}

impl<T> Outbox for T where T: UnreliableSender<PeerMessage> + ReliableSender<PeerMessage> {}

/// Per-connection outbound queues, drained by the connection's socket writer.
#[derive(Debug, Clone)]
pub struct PeerOutbox {
    unreliable: mpsc::Sender<PeerMessage>,
    reliable: mpsc::UnboundedSender<PeerMessage>,
}

impl PeerOutbox {
    pub fn new(
        unreliable: mpsc::Sender<PeerMessage>,
        reliable: mpsc::UnboundedSender<PeerMessage>,
    ) -> Self {
        Self {
            unreliable,
            reliable,
        }
    }
}

impl UnreliableSender<PeerMessage> for PeerOutbox {
    fn send_unreliable(&self, msg: PeerMessage) -> Result<Delivery, ChannelClosed> {
        self.unreliable.send_unreliable(msg)
    }
}

impl ReliableSender<PeerMessage> for PeerOutbox {
    fn send_reliable(&self, msg: PeerMessage) -> Result<(), ChannelClosed> {
        self.reliable.send_reliable(msg)
    }
}
