//! Server-side record for one controlled pawn.
//!
//! The speed window and collision streak live here and are only touched from the world
//! task, so they need no locking.

use game_shared::{
    CooldownTimer, PawnTuning, ShootingState, ShotEvent, ShotTuning, Transform,
};
use glam::Vec3;
use tracing::{debug, info, trace};

use crate::domain::collision::{CollisionStreak, StreakOutcome};
use crate::domain::geometry::SweptMove;
use crate::domain::speed_window::{SpeedCheck, SpeedVerdict, SpeedWindow};
use crate::domain::state::PawnSnapshot;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CorrectionReason {
    /// A window averaged faster than allowed.
    SpeedViolation { speed: f32 },
    /// Too many blocked sweeps in a row.
    CollisionDivergence { consecutive_hits: u32 },
    /// The server moved the pawn on its own (spawn, respawn).
    Teleport,
}

/// Transform the owning client must adopt as-is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correction {
    pub transform: Transform,
    pub reason: CorrectionReason,
}

#[derive(Debug)]
pub struct ServerPawn {
    pub id: u64,
    pub transform: Transform,
    pub speed_window: SpeedWindow,
    pub collision_streak: CollisionStreak,
    pub shooting: ShootingState,
    pub cooldown: CooldownTimer,
    pub health: f32,
    pub power: f32,
}

impl ServerPawn {
    pub fn new(id: u64, spawn: Transform, pawn: &PawnTuning, shots: &ShotTuning) -> Self {
        Self {
            id,
            transform: spawn,
            speed_window: SpeedWindow::new(),
            collision_streak: CollisionStreak::new(),
            shooting: ShootingState::default(),
            cooldown: CooldownTimer::new(shots.shooting_interval),
            health: pawn.max_health,
            power: pawn.max_power,
        }
    }

    pub fn translation(&self) -> Vec3 {
        self.transform.translation
    }

    /// Validate and apply one client-reported transform.
    ///
    /// Speed and collision are independent layers: every sample that survives the speed
    /// check goes through the sweep, accepted window or not. The sample that closes a
    /// rejected window is not applied; the pawn snaps to the last accepted position
    /// instead, matching the correction sent to the client.
    pub fn receive_transform<W>(
        &mut self,
        requested: Transform,
        now: f64,
        world: &W,
        tuning: &PawnTuning,
    ) -> Option<Correction>
    where
        W: SweptMove + ?Sized,
    {
        match self
            .speed_window
            .observe(requested.translation, now, SpeedCheck::from(tuning))
        {
            SpeedVerdict::Rejected { speed, snap_back } => {
                info!(player_id = self.id, speed, "player moving too fast");
                self.transform = self.transform.with_translation(snap_back);
                return Some(Correction {
                    transform: self.transform,
                    reason: CorrectionReason::SpeedViolation { speed },
                });
            }
            SpeedVerdict::Accepted { speed } => {
                trace!(player_id = self.id, speed, "speed window accepted");
            }
            SpeedVerdict::Bootstrapped | SpeedVerdict::Accumulating => {}
        }

        let sweep =
            world.apply_move_with_sweep(self.transform.translation, requested.translation, tuning.radius);
        self.transform = Transform::new(sweep.applied, requested.rotation);

        match self
            .collision_streak
            .record(sweep.blocking_hit, tuning.max_consecutive_hits)
        {
            StreakOutcome::ForceResync { consecutive_hits } => {
                info!(player_id = self.id, consecutive_hits, "correcting player transform");
                Some(Correction {
                    transform: self.transform,
                    reason: CorrectionReason::CollisionDivergence { consecutive_hits },
                })
            }
            StreakOutcome::Tolerated { consecutive_hits } => {
                trace!(player_id = self.id, consecutive_hits, "player move blocked");
                None
            }
            StreakOutcome::Clean => None,
        }
    }

    /// Move the pawn on the server's own authority.
    pub fn teleport(&mut self, to: Transform, now: f64) -> Correction {
        self.transform = to;
        self.speed_window.anchor(to.translation, now);
        self.collision_streak.reset();
        Correction {
            transform: to,
            reason: CorrectionReason::Teleport,
        }
    }

    /// Full health and power at `spawn`, trigger cadence forgotten.
    pub fn respawn(&mut self, spawn: Transform, now: f64, tuning: &PawnTuning) -> Correction {
        self.health = tuning.max_health;
        self.power = tuning.max_power;
        self.cooldown.reset();
        debug!(player_id = self.id, "player respawned");
        self.teleport(spawn, now)
    }

    /// Spawn a shot if the canonical trigger state and cadence allow it.
    pub fn poll_fire(
        &mut self,
        now: f64,
        pawn: &PawnTuning,
        shots: &ShotTuning,
    ) -> Option<ShotEvent> {
        if !self.cooldown.poll(self.shooting.is_shooting, now) {
            return None;
        }
        self.power = (self.power + shots.power_delta).clamp(0.0, pawn.max_power);
        Some(ShotEvent::from_muzzle(
            self.id,
            &self.transform,
            muzzle_offset(pawn, shots),
            shots,
            now,
        ))
    }

    pub fn regenerate(&mut self, dt: f32, tuning: &PawnTuning) {
        self.power = (self.power + tuning.power_regen * dt).clamp(0.0, tuning.max_power);
    }

    /// Apply a health change; true when this change took the pawn down.
    pub fn apply_health_delta(&mut self, delta: f32, tuning: &PawnTuning) -> bool {
        let was_alive = self.health > 0.0;
        self.health = (self.health + delta).clamp(0.0, tuning.max_health);
        was_alive && self.health <= 0.0
    }

    pub fn snapshot(&self) -> PawnSnapshot {
        PawnSnapshot {
            id: self.id,
            transform: self.transform,
            health: self.health,
            power: self.power,
        }
    }
}

/// Distance ahead of a pawn's center at which its shots appear.
pub fn muzzle_offset(pawn: &PawnTuning, shots: &ShotTuning) -> f32 {
    pawn.radius + shots.radius + 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::{Aabb, Arena};
    use game_shared::Rotator;

    fn tuning() -> PawnTuning {
        PawnTuning {
            max_consecutive_hits: 3,
            ..PawnTuning::default()
        }
    }

    fn open_space() -> Arena {
        Arena::new(vec![], vec![])
    }

    fn at_x(x: f32) -> Transform {
        Transform::from_translation(Vec3::new(x, 0.0, 0.0))
    }

    fn pawn_at_origin() -> ServerPawn {
        ServerPawn::new(1, Transform::IDENTITY, &tuning(), &ShotTuning::default())
    }

    #[test]
    fn accepted_moves_are_applied_with_the_reported_rotation() {
        let mut pawn = pawn_at_origin();
        let requested = Transform::new(Vec3::new(100.0, 0.0, 0.0), Rotator::new(0.0, 45.0, 0.0));

        let correction = pawn.receive_transform(requested, 0.0, &open_space(), &tuning());

        assert!(correction.is_none());
        assert_eq!(pawn.transform, requested);
    }

    #[test]
    fn speeding_snaps_back_to_the_last_accepted_position() {
        let mut pawn = pawn_at_origin();
        let arena = open_space();
        pawn.receive_transform(at_x(0.0), 0.0, &arena, &tuning());
        pawn.receive_transform(at_x(100_000.0), 0.3, &arena, &tuning());

        let correction = pawn
            .receive_transform(at_x(100_000.0), 0.6, &arena, &tuning())
            .expect("speeding must be corrected");

        assert!(matches!(
            correction.reason,
            CorrectionReason::SpeedViolation { .. }
        ));
        assert_eq!(correction.transform.translation, Vec3::ZERO);
        assert_eq!(pawn.translation(), Vec3::ZERO);
        assert_eq!(pawn.speed_window.last_accepted_position(), Vec3::ZERO);
    }

    #[test]
    fn blocked_moves_stop_at_geometry_and_force_a_resync_past_the_streak() {
        let arena = Arena::new(
            vec![Aabb::from_center(
                Vec3::new(200.0, 0.0, 0.0),
                Vec3::new(10.0, 1000.0, 1000.0),
            )],
            vec![],
        );
        let mut pawn = pawn_at_origin();
        let mut corrections = Vec::new();

        // Keep pushing into the wall, slowly enough to pass the speed check.
        for i in 0..6 {
            let now = i as f64 * 0.1;
            if let Some(c) = pawn.receive_transform(at_x(300.0), now, &arena, &tuning()) {
                corrections.push((i, c));
            }
        }

        assert!(pawn.translation().x < 190.0 - 50.0 + 0.01);
        assert_eq!(pawn.collision_streak.consecutive_hits(), 6);
        assert_eq!(corrections.len(), 1);
        let (index, correction) = corrections[0];
        assert_eq!(index, 3);
        assert_eq!(correction.transform, pawn.transform);
        assert_eq!(
            correction.reason,
            CorrectionReason::CollisionDivergence {
                consecutive_hits: 4
            }
        );
    }

    #[test]
    fn health_clamps_and_reports_the_killing_blow_once() {
        let tuning = tuning();
        let mut pawn = pawn_at_origin();

        assert!(!pawn.apply_health_delta(-60.0, &tuning));
        assert!(pawn.apply_health_delta(-60.0, &tuning));
        assert_eq!(pawn.health, 0.0);
        assert!(!pawn.apply_health_delta(-10.0, &tuning));

        pawn.apply_health_delta(500.0, &tuning);
        assert_eq!(pawn.health, tuning.max_health);
    }

    #[test]
    fn respawn_anchors_the_speed_window_at_the_spawn_point() {
        let tuning = tuning();
        let arena = open_space();
        let mut pawn = pawn_at_origin();
        pawn.receive_transform(at_x(0.0), 0.0, &arena, &tuning);

        let correction = pawn.respawn(at_x(50_000.0), 1.0, &tuning);

        assert_eq!(correction.reason, CorrectionReason::Teleport);
        assert_eq!(pawn.speed_window.last_accepted_position(), Vec3::new(50_000.0, 0.0, 0.0));
        // A stale sample from the death position is a jump away from the new anchor.
        pawn.receive_transform(at_x(0.0), 1.3, &arena, &tuning);
        let stale = pawn.receive_transform(at_x(0.0), 1.6, &arena, &tuning);
        assert!(matches!(
            stale.map(|c| c.reason),
            Some(CorrectionReason::SpeedViolation { .. })
        ));
    }

    #[test]
    fn firing_follows_the_canonical_flag_and_spends_power() {
        let pawn_tuning = tuning();
        let shot_tuning = ShotTuning::default();
        let mut pawn = pawn_at_origin();

        assert!(pawn.poll_fire(0.0, &pawn_tuning, &shot_tuning).is_none());

        pawn.shooting.set(true);
        let shot = pawn
            .poll_fire(0.0, &pawn_tuning, &shot_tuning)
            .expect("first shot fires immediately");
        assert_eq!(shot.owner_id, 1);
        assert!(shot.origin.x > pawn_tuning.radius);
        assert_eq!(pawn.power, pawn_tuning.max_power + shot_tuning.power_delta);
        assert!(pawn.poll_fire(0.1, &pawn_tuning, &shot_tuning).is_none());
        assert!(pawn.poll_fire(0.2, &pawn_tuning, &shot_tuning).is_some());
    }
}
