use game_shared::{NetTuning, PawnTuning, ShotTuning};
use std::{env, str::FromStr, time::Duration};

use crate::use_cases::WorldSettings;

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env_or("GAME_SERVER_PORT", 3001)
}

pub const INBOUND_TRANSFORM_CAPACITY: usize = 1024;
pub const PEER_UNRELIABLE_CAPACITY: usize = 8;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / 60);

// Unset or unparsable values fall back to the default.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Gameplay tuning with environment overrides applied.
///
/// Pawn and shot tuning come from the same variables clients read.
pub fn world_settings() -> WorldSettings {
    let net = NetTuning {
        net_cull_distance: env_or(
            "NET_CULL_DISTANCE",
            NetTuning::default().net_cull_distance,
        ),
    };

    WorldSettings {
        pawn: PawnTuning::from_env(),
        shots: ShotTuning::from_env(),
        net,
    }
    .normalized()
}
