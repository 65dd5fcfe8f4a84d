// Wire protocol DTOs shared by the server and clients.
// JSON text frames, adjacently tagged as {"type": ..., "data": ...}.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::transform::{Rotator, Transform};

/// Messages a client sends to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Initial handshake; the server answers with Identity.
    Join(JoinPayload),
    // Owning client's current transform, every client tick. Unreliable.
    ReportTransform(TransformDto),
    // Trigger edge from the owning client. Reliable, ordered.
    ReportShootingIntent(ShootingIntentDto),
}

/// Messages the server sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Assigned identity for the connection after Join is accepted.
    Identity { player_id: u64 },
    // Authoritative overwrite of the owning client's transform. Unreliable.
    CorrectTransform(TransformDto),
    // Another pawn's shooting flag changed. Never sent to the pawn's owner.
    ShootingStateSync(ShootingStateDto),
    // Snapshot of every pawn for a given tick.
    WorldUpdate(WorldUpdateDto),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinPayload {
    #[serde(default)]
    pub display_name: String,
}

/// Flattened transform for wire transmission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformDto {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default)]
    pub pitch: f32,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub roll: f32,
}

impl From<Transform> for TransformDto {
    fn from(t: Transform) -> Self {
        Self {
            x: t.translation.x,
            y: t.translation.y,
            z: t.translation.z,
            pitch: t.rotation.pitch,
            yaw: t.rotation.yaw,
            roll: t.rotation.roll,
        }
    }
}

impl From<TransformDto> for Transform {
    fn from(dto: TransformDto) -> Self {
        Transform::new(
            Vec3::new(dto.x, dto.y, dto.z),
            Rotator::new(dto.pitch, dto.yaw, dto.roll),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShootingIntentDto {
    pub is_shooting: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShootingStateDto {
    pub player_id: u64,
    pub is_shooting: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldUpdateDto {
    pub tick: u64,
    #[serde(default)]
    pub pawns: Vec<PawnStateDto>,
}

/// Per-pawn replicated state. Shots are never part of the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PawnStateDto {
    pub id: u64,
    pub transform: TransformDto,
    pub health: f32,
    pub power: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_type_and_data_tags() {
        let msg = ClientMessage::ReportShootingIntent(ShootingIntentDto { is_shooting: true });
        let json = serde_json::to_value(&msg).expect("serializable");
        assert_eq!(
            json,
            serde_json::json!({"type": "ReportShootingIntent", "data": {"is_shooting": true}})
        );
    }

    #[test]
    fn transform_rotation_defaults_to_zero() {
        let parsed: ClientMessage = serde_json::from_str(
            r#"{"type":"ReportTransform","data":{"x":1.0,"y":2.0,"z":3.0}}"#,
        )
        .expect("valid message");

        let ClientMessage::ReportTransform(dto) = parsed else {
            panic!("expected ReportTransform");
        };
        let transform = Transform::from(dto);
        assert_eq!(transform.translation, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(transform.rotation, Rotator::ZERO);
    }

    #[test]
    fn identity_parses_on_the_client_side() {
        let parsed: ServerMessage =
            serde_json::from_str(r#"{"type":"Identity","data":{"player_id":42}}"#)
                .expect("valid message");
        assert_eq!(parsed, ServerMessage::Identity { player_id: 42 });
    }
}
