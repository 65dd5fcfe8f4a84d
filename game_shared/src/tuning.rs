//! Gameplay tuning shared by every peer.
//!
//! Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).
//! Every peer must run with the same values or locally simulated shots drift apart.

use std::{env, str::FromStr};

use tracing::warn;

pub const MIN_SPEED_TOLERANCE: f32 = 1.0;
pub const MAX_SPEED_TOLERANCE: f32 = 2.0;

#[derive(Debug, Clone, Copy)]
pub struct PawnTuning {
    /// Maximum flying speed in units per second.
    pub max_speed: f32,

    /// Multiplier on `max_speed` the speed check allows before rejecting a window.
    pub speed_tolerance: f32,

    /// Seconds of samples averaged per speed check.
    pub speed_check_interval: f64,

    /// Blocked sweeps tolerated in a row before the server forces a resync.
    pub max_consecutive_hits: u32,

    /// Collision sphere radius.
    pub radius: f32,

    /// Units per second squared while speeding up.
    pub acceleration: f32,

    /// Units per second squared while slowing down.
    pub deceleration: f32,

    /// Scale applied to move input.
    pub move_scale: f32,

    /// Degrees per second at full rotate input.
    pub rotate_scale: f32,

    pub max_health: f32,
    pub max_power: f32,

    /// Power regained per second.
    pub power_regen: f32,
}

impl Default for PawnTuning {
    fn default() -> Self {
        Self {
            max_speed: 5000.0,
            speed_tolerance: 1.05,
            speed_check_interval: 0.5,
            max_consecutive_hits: 30,
            radius: 50.0,
            acceleration: 5000.0,
            deceleration: 10000.0,
            move_scale: 1.0,
            rotate_scale: 50.0,
            max_health: 100.0,
            max_power: 100.0,
            power_regen: 10.0,
        }
    }
}

// Unset or unparsable values fall back to the default.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl PawnTuning {
    /// Defaults with `MAX_SPEED`, `SPEED_TOLERANCE`, `SPEED_CHECK_INTERVAL` and
    /// `MAX_CONSECUTIVE_HITS` applied, then normalized. Server and clients both read these.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_speed: env_or("MAX_SPEED", defaults.max_speed),
            speed_tolerance: env_or("SPEED_TOLERANCE", defaults.speed_tolerance),
            speed_check_interval: env_or("SPEED_CHECK_INTERVAL", defaults.speed_check_interval),
            max_consecutive_hits: env_or("MAX_CONSECUTIVE_HITS", defaults.max_consecutive_hits),
            ..defaults
        }
        .normalized()
    }

    /// Clamp range-constrained values into bounds.
    pub fn normalized(mut self) -> Self {
        let tolerance = self
            .speed_tolerance
            .clamp(MIN_SPEED_TOLERANCE, MAX_SPEED_TOLERANCE);
        if tolerance != self.speed_tolerance {
            warn!(
                requested = self.speed_tolerance,
                applied = tolerance,
                "speed tolerance out of range; clamping"
            );
            self.speed_tolerance = tolerance;
        }
        self.speed_check_interval = self.speed_check_interval.max(0.05);
        self
    }

    /// Fastest sustained speed the server accepts.
    pub fn speed_limit(&self) -> f32 {
        self.max_speed * self.speed_tolerance
    }
}

/// Gameplay tuning for shots.
#[derive(Debug, Clone, Copy)]
pub struct ShotTuning {
    /// Seconds between shots while the trigger is held.
    pub shooting_interval: f64,

    /// Constant shot speed in units per second.
    pub initial_speed: f32,

    /// Seconds before a shot despawns on its own.
    pub lifespan: f64,

    /// Collision sphere radius.
    pub radius: f32,

    /// Health change applied to a pawn the shot hits.
    pub health_delta: f32,

    /// Power change applied to the shooter per shot.
    pub power_delta: f32,
}

impl Default for ShotTuning {
    fn default() -> Self {
        Self {
            shooting_interval: 0.2,
            initial_speed: 20000.0,
            lifespan: 2.0,
            radius: 25.0,
            health_delta: -10.0,
            power_delta: -5.0,
        }
    }
}

impl ShotTuning {
    /// Defaults with `SHOOTING_INTERVAL`, `SHOT_INITIAL_SPEED` and `SHOT_LIFESPAN` applied.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            shooting_interval: env_or("SHOOTING_INTERVAL", defaults.shooting_interval),
            initial_speed: env_or("SHOT_INITIAL_SPEED", defaults.initial_speed),
            lifespan: env_or("SHOT_LIFESPAN", defaults.lifespan),
            ..defaults
        }
    }

    /// Furthest a shot can travel before it expires.
    pub fn max_range(&self) -> f32 {
        self.initial_speed * self.lifespan as f32
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NetTuning {
    /// Observers beyond this distance stop receiving an entity's replicated state.
    pub net_cull_distance: f32,
}

impl Default for NetTuning {
    fn default() -> Self {
        Self {
            net_cull_distance: 40000.0,
        }
    }
}

impl NetTuning {
    /// Raise the cull distance so shots are never culled before they expire.
    pub fn covering(mut self, shots: &ShotTuning) -> Self {
        let range = shots.max_range();
        if self.net_cull_distance < range {
            warn!(
                net_cull_distance = self.net_cull_distance,
                shot_range = range,
                "net cull distance shorter than shot range; raising"
            );
            self.net_cull_distance = range;
        }
        self
    }
}
