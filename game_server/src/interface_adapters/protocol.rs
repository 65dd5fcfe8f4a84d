// Conversions from world outputs into the shared wire DTOs.
// The DTOs themselves live in game_shared so both peers agree on the format.

use crate::domain::PawnSnapshot;
use crate::use_cases::{PeerMessage, WorldUpdate};
use game_shared::protocol::{PawnStateDto, ServerMessage, ShootingStateDto, WorldUpdateDto};

pub use game_shared::protocol::ClientMessage;

impl From<&PawnSnapshot> for PawnStateDto {
    fn from(pawn: &PawnSnapshot) -> Self {
        Self {
            id: pawn.id,
            transform: pawn.transform.into(),
            health: pawn.health,
            power: pawn.power,
        }
    }
}

impl From<WorldUpdate> for WorldUpdateDto {
    fn from(update: WorldUpdate) -> Self {
        Self {
            tick: update.tick,
            pawns: update.pawns.iter().map(PawnStateDto::from).collect(),
        }
    }
}

impl From<PeerMessage> for ServerMessage {
    fn from(msg: PeerMessage) -> Self {
        match msg {
            PeerMessage::CorrectTransform(transform) => {
                ServerMessage::CorrectTransform(transform.into())
            }
            PeerMessage::ShootingStateSync {
                player_id,
                is_shooting,
            } => ServerMessage::ShootingStateSync(ShootingStateDto {
                player_id,
                is_shooting,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_shared::{Rotator, Transform};
    use glam::Vec3;

    #[test]
    fn world_updates_flatten_pawn_transforms() {
        let update = WorldUpdate {
            tick: 9,
            pawns: vec![PawnSnapshot {
                id: 3,
                transform: Transform::new(Vec3::new(1.0, 2.0, 3.0), Rotator::new(0.0, 90.0, 0.0)),
                health: 80.0,
                power: 55.0,
            }],
        };

        let json = serde_json::to_value(ServerMessage::WorldUpdate(update.into()))
            .expect("serializable");

        assert_eq!(json["type"], "WorldUpdate");
        assert_eq!(json["data"]["tick"], 9);
        let pawn = &json["data"]["pawns"][0];
        assert_eq!(pawn["id"], 3);
        assert_eq!(pawn["transform"]["z"], 3.0);
        assert_eq!(pawn["transform"]["yaw"], 90.0);
        assert_eq!(pawn["health"], 80.0);
    }

    #[test]
    fn peer_messages_map_onto_server_messages() {
        let sync: ServerMessage = PeerMessage::ShootingStateSync {
            player_id: 4,
            is_shooting: true,
        }
        .into();
        assert_eq!(
            serde_json::to_value(&sync).expect("serializable"),
            serde_json::json!({
                "type": "ShootingStateSync",
                "data": {"player_id": 4, "is_shooting": true}
            })
        );

        let correction: ServerMessage = PeerMessage::CorrectTransform(Transform::IDENTITY).into();
        assert!(matches!(correction, ServerMessage::CorrectTransform(dto) if dto.x == 0.0));
    }
}
