// Position + orientation records exchanged between peers.

use glam::Vec3;

/// Largest pitch allowed outside free-fly mode, in degrees.
pub const MAX_FLIGHT_PITCH: f32 = 89.9;

/// Euler orientation in degrees (X forward, Z up).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rotator {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Rotator {
    pub const ZERO: Rotator = Rotator {
        pitch: 0.0,
        yaw: 0.0,
        roll: 0.0,
    };

    pub const fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Unit vector the nose points along.
    pub fn forward(&self) -> Vec3 {
        let (sp, cp) = self.pitch.to_radians().sin_cos();
        let (sy, cy) = self.yaw.to_radians().sin_cos();
        Vec3::new(cp * cy, cp * sy, sp)
    }

    /// Level-flight orientation: pitch clamped short of vertical, no roll.
    pub fn clamped_flight(self) -> Self {
        Self {
            pitch: self.pitch.clamp(-MAX_FLIGHT_PITCH, MAX_FLIGHT_PITCH),
            yaw: normalize_degrees(self.yaw),
            roll: 0.0,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.pitch.is_finite() && self.yaw.is_finite() && self.roll.is_finite()
    }
}

impl std::ops::Add for Rotator {
    type Output = Rotator;

    fn add(self, rhs: Rotator) -> Rotator {
        Rotator {
            pitch: self.pitch + rhs.pitch,
            yaw: self.yaw + rhs.yaw,
            roll: self.roll + rhs.roll,
        }
    }
}

impl std::ops::Mul<f32> for Rotator {
    type Output = Rotator;

    fn mul(self, rhs: f32) -> Rotator {
        Rotator {
            pitch: self.pitch * rhs,
            yaw: self.yaw * rhs,
            roll: self.roll * rhs,
        }
    }
}

// Wrap into (-180, 180].
fn normalize_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Rotator,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Rotator::ZERO,
    };

    pub const fn new(translation: Vec3, rotation: Rotator) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Rotator::ZERO,
        }
    }

    pub fn with_translation(self, translation: Vec3) -> Self {
        Self {
            translation,
            ..self
        }
    }

    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite()
    }
}

/// A transform as it arrived at the server, stamped with the server clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformSample {
    pub transform: Transform,
    pub received_at: f64,
}

impl TransformSample {
    pub fn new(transform: Transform, received_at: f64) -> Self {
        Self {
            transform,
            received_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_follows_yaw_and_pitch() {
        let ahead = Rotator::ZERO.forward();
        assert!((ahead - Vec3::X).length() < 1e-6);

        let left = Rotator::new(0.0, 90.0, 0.0).forward();
        assert!((left - Vec3::Y).length() < 1e-6);

        let up = Rotator::new(90.0, 0.0, 0.0).forward();
        assert!((up - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn clamped_flight_limits_pitch_and_drops_roll() {
        let rotation = Rotator::new(120.0, 370.0, 15.0).clamped_flight();
        assert_eq!(rotation.pitch, MAX_FLIGHT_PITCH);
        assert!((rotation.yaw - 10.0).abs() < 1e-4);
        assert_eq!(rotation.roll, 0.0);

        let rotation = Rotator::new(-95.0, -190.0, -3.0).clamped_flight();
        assert_eq!(rotation.pitch, -MAX_FLIGHT_PITCH);
        assert!((rotation.yaw - 170.0).abs() < 1e-4);
    }

    #[test]
    fn nan_transform_is_not_finite() {
        let t = Transform::from_translation(Vec3::new(f32::NAN, 0.0, 0.0));
        assert!(!t.is_finite());
        assert!(Transform::IDENTITY.is_finite());
    }
}
