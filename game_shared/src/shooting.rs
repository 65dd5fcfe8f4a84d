//! Replicated "is shooting" flag and the local cadence that turns it into shots.
//!
//! Only the flag crosses the network. Every peer that can see a pawn polls its own
//! [`CooldownTimer`] against the flag it knows about, so shot spawn times may differ by up
//! to one round trip between peers while trajectories stay identical.

/// Slack for float accumulation when polls land exactly on interval multiples.
const COOLDOWN_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShootingState {
    pub is_shooting: bool,
}

impl ShootingState {
    /// Stores the new value and reports whether it was an edge.
    pub fn set(&mut self, is_shooting: bool) -> bool {
        let changed = self.is_shooting != is_shooting;
        self.is_shooting = is_shooting;
        changed
    }
}

/// Per-peer, per-pawn fire cadence. Lives as long as the pawn; never persisted.
#[derive(Debug, Clone, Copy)]
pub struct CooldownTimer {
    last_fire_time: Option<f64>,
    fire_interval: f64,
}

impl CooldownTimer {
    pub fn new(fire_interval: f64) -> Self {
        Self {
            last_fire_time: None,
            fire_interval,
        }
    }

    pub fn fire_interval(&self) -> f64 {
        self.fire_interval
    }

    pub fn last_fire_time(&self) -> Option<f64> {
        self.last_fire_time
    }

    /// Returns true when a shot should spawn at `now`, and records it.
    pub fn poll(&mut self, is_shooting: bool, now: f64) -> bool {
        if !is_shooting {
            return false;
        }

        let ready = match self.last_fire_time {
            None => true,
            Some(last) => now - last >= self.fire_interval - COOLDOWN_EPSILON,
        };
        if ready {
            self.last_fire_time = Some(now);
        }
        ready
    }

    /// Forget cadence history, e.g. after a respawn.
    pub fn reset(&mut self) {
        self.last_fire_time = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fire_times(timer: &mut CooldownTimer, polls: impl Iterator<Item = (f64, bool)>) -> Vec<f64> {
        polls
            .filter_map(|(now, shooting)| timer.poll(shooting, now).then_some(now))
            .collect()
    }

    #[test]
    fn holding_for_one_second_fires_six_times() {
        let mut timer = CooldownTimer::new(0.2);
        let polls = (0..=5).map(|i| (i as f64 * 0.2, true));

        let times = fire_times(&mut timer, polls);

        assert_eq!(times.len(), 6);
        for (i, t) in times.iter().enumerate() {
            assert!((t - i as f64 * 0.2).abs() < 1e-9);
        }
    }

    #[test]
    fn holding_at_tick_rate_fires_floor_d_over_interval_plus_one() {
        let mut timer = CooldownTimer::new(0.2);
        // 60 Hz polls over D = 1.0 s, both endpoints included.
        let polls = (0..=60).map(|i| (i as f64 / 60.0, true));

        let times = fire_times(&mut timer, polls);

        assert_eq!(times.len(), (1.0_f64 / 0.2).floor() as usize + 1);
        assert_eq!(times[0], 0.0);
    }

    #[test]
    fn press_and_release_between_polls_fires_nothing() {
        let mut timer = CooldownTimer::new(0.2);
        let mut state = ShootingState::default();
        let mut shots = 0;

        // Poll at 60 Hz; the flag goes up and down inside one frame.
        for frame in 0..30 {
            let now = frame as f64 / 60.0;
            if frame == 10 {
                state.set(true);
                state.set(false);
            }
            if timer.poll(state.is_shooting, now) {
                shots += 1;
            }
        }

        assert_eq!(shots, 0);
    }

    #[test]
    fn hold_shorter_than_the_interval_fires_exactly_once() {
        let mut timer = CooldownTimer::new(0.2);
        // Held for 0.1 s at 60 Hz, then released.
        let polls = (0..30).map(|frame| (frame as f64 / 60.0, frame < 6));

        let times = fire_times(&mut timer, polls);

        assert_eq!(times, vec![0.0]);
    }

    #[test]
    fn repress_inside_interval_cannot_beat_the_cadence() {
        let mut timer = CooldownTimer::new(0.2);

        assert!(timer.poll(true, 0.0));
        assert!(!timer.poll(false, 0.05));
        assert!(!timer.poll(true, 0.1));
        assert!(timer.poll(true, 0.2));
    }

    #[test]
    fn set_reports_edges_only() {
        let mut state = ShootingState::default();
        assert!(state.set(true));
        assert!(!state.set(true));
        assert!(state.set(false));
        assert!(!state.set(false));
    }
}
