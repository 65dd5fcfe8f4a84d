//! Floating-pawn flight integration for the owning client.
//!
//! Input arrives as already-resolved intents: a local-space move vector (x forward,
//! y right, z up, each in [-1, 1]) and per-axis rotation rates.

use game_shared::{PawnTuning, Rotator, Transform};
use glam::Vec3;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlightInput {
    pub move_intent: Vec3,
    /// Pitch/yaw/roll rate in [-1, 1], scaled by the pawn's rotate scale.
    pub rotate_intent: Rotator,
}

#[derive(Debug, Clone, Default)]
pub struct FlightModel {
    velocity: Vec3,
    free_fly: bool,
}

impl FlightModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn free_fly(&self) -> bool {
        self.free_fly
    }

    /// Free-fly allows any pitch and roll; leaving it levels the pawn out again.
    pub fn toggle_free_fly(&mut self) -> bool {
        self.free_fly = !self.free_fly;
        self.free_fly
    }

    /// Kill all momentum, e.g. when the server overwrites the transform.
    pub fn stop(&mut self) {
        self.velocity = Vec3::ZERO;
    }

    pub fn step(
        &mut self,
        transform: &mut Transform,
        input: &FlightInput,
        dt: f32,
        tuning: &PawnTuning,
    ) {
        let mut rotation = transform.rotation + input.rotate_intent * (tuning.rotate_scale * dt);
        if !self.free_fly {
            rotation = rotation.clamped_flight();
        }

        let intent = input.move_intent.clamp_length_max(1.0) * tuning.move_scale;
        let world_intent = local_to_world(rotation, intent);
        let desired = (world_intent * tuning.max_speed).clamp_length_max(tuning.max_speed);

        let rate = if intent.length_squared() > 0.0 {
            tuning.acceleration
        } else {
            tuning.deceleration
        };
        self.velocity = move_towards(self.velocity, desired, rate * dt);

        transform.rotation = rotation;
        transform.translation += self.velocity * dt;
    }
}

fn local_to_world(rotation: Rotator, local: Vec3) -> Vec3 {
    let forward = rotation.forward();
    let right = Rotator::new(0.0, rotation.yaw + 90.0, 0.0).forward();
    forward * local.x + right * local.y + Vec3::Z * local.z
}

fn move_towards(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let delta = target - current;
    let distance = delta.length();
    if distance <= max_delta || distance < f32::EPSILON {
        target
    } else {
        current + delta / distance * max_delta
    }
}
