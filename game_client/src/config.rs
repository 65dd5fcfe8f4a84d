use std::{env, time::Duration};

use game_shared::{PawnTuning, ShotTuning};

use crate::ClientSettings;

pub fn server_url() -> String {
    env::var("GAME_SERVER_URL").unwrap_or_else(|_| "ws://127.0.0.1:3001/ws".to_string())
}

pub fn tick_interval() -> Duration {
    let hz = env::var("CLIENT_TICK_HZ")
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|hz| *hz > 0)
        .unwrap_or(30);
    Duration::from_secs_f64(1.0 / f64::from(hz))
}

pub const UNRELIABLE_CAPACITY: usize = 8;

/// Gameplay tuning read from the same variables the server reads.
pub fn client_settings() -> ClientSettings {
    ClientSettings {
        pawn: PawnTuning::from_env(),
        shots: ShotTuning::from_env(),
    }
}
