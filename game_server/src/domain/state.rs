// Domain-level snapshot types handed to the network layer.

use game_shared::Transform;

#[derive(Debug, Clone, PartialEq)]
pub struct PawnSnapshot {
    pub id: u64,
    pub transform: Transform,
    pub health: f32,
    pub power: f32,
}
