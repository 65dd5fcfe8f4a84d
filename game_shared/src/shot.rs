//! Locally spawned shots. Never replicated: each peer owns its own copies and drives them
//! with the same fixed kinematics, so only spawn times can differ across peers.

use glam::Vec3;

use crate::transform::{Rotator, Transform};
use crate::tuning::ShotTuning;

#[derive(Debug, Clone, PartialEq)]
pub struct ShotEvent {
    pub owner_id: u64,
    pub origin: Vec3,
    pub rotation: Rotator,
    pub direction: Vec3,
    pub speed: f32,
    pub spawn_time: f64,
    pub time_to_live: f64,
    // Time up to which the path has already been hit-tested.
    swept_until: f64,
}

impl ShotEvent {
    pub fn new(
        owner_id: u64,
        origin: Vec3,
        rotation: Rotator,
        tuning: &ShotTuning,
        spawn_time: f64,
    ) -> Self {
        Self {
            owner_id,
            origin,
            rotation,
            direction: rotation.forward(),
            speed: tuning.initial_speed,
            spawn_time,
            time_to_live: tuning.lifespan,
            swept_until: spawn_time,
        }
    }

    /// Spawn just outside the shooter's collision sphere, along its nose.
    pub fn from_muzzle(
        owner_id: u64,
        shooter: &Transform,
        muzzle_offset: f32,
        tuning: &ShotTuning,
        spawn_time: f64,
    ) -> Self {
        let origin = shooter.translation + shooter.rotation.forward() * muzzle_offset;
        Self::new(owner_id, origin, shooter.rotation, tuning, spawn_time)
    }

    pub fn position_at(&self, now: f64) -> Vec3 {
        let t = (now - self.spawn_time).clamp(0.0, self.time_to_live) as f32;
        self.origin + self.direction * (self.speed * t)
    }

    pub fn expires_at(&self) -> f64 {
        self.spawn_time + self.time_to_live
    }

    pub fn is_expired(&self, now: f64) -> bool {
        now >= self.expires_at()
    }
}

/// All shots alive on one peer.
#[derive(Debug, Default)]
pub struct ShotField {
    shots: Vec<ShotEvent>,
}

impl ShotField {
    pub fn new() -> Self {
        Self { shots: Vec::new() }
    }

    pub fn spawn(&mut self, shot: ShotEvent) {
        self.shots.push(shot);
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShotEvent> {
        self.shots.iter()
    }

    /// Drop shots whose lifespan ran out.
    pub fn advance(&mut self, now: f64) -> usize {
        self.advance_with(now, |_, _, _| false)
    }

    /// Drop expired shots and any shot `hit_test` reports as consumed along the path
    /// travelled since the last advance. Returns how many shots were removed.
    pub fn advance_with<F>(&mut self, now: f64, mut hit_test: F) -> usize
    where
        F: FnMut(&ShotEvent, Vec3, Vec3) -> bool,
    {
        let before = self.shots.len();
        self.shots.retain_mut(|shot| {
            let from = shot.position_at(shot.swept_until);
            let to = shot.position_at(now);
            shot.swept_until = now.min(shot.expires_at());
            if hit_test(&*shot, from, to) {
                return false;
            }
            !shot.is_expired(now)
        });
        before - self.shots.len()
    }

    pub fn remove_owned_by(&mut self, owner_id: u64) {
        self.shots.retain(|shot| shot.owner_id != owner_id);
    }
}
