//! Windowed speed validation for client-reported movement.
//!
//! Client and server tick at different, possibly variable rates and the server can receive
//! several samples in one tick, so per-sample speed checks are noise. Instead samples are
//! averaged over an interval and the average's displacement from the last accepted
//! position bounds the sustained speed. Which samples inside a window arrive does not
//! matter, only their sum and count.

use game_shared::PawnTuning;
use glam::Vec3;

#[derive(Debug, Clone, Copy)]
pub struct SpeedCheck {
    /// Units per second, tolerance already applied.
    pub limit: f32,
    /// Seconds a window must span before it is evaluated.
    pub interval: f64,
}

impl From<&PawnTuning> for SpeedCheck {
    fn from(tuning: &PawnTuning) -> Self {
        Self {
            limit: tuning.speed_limit(),
            interval: tuning.speed_check_interval,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeedVerdict {
    /// First sample after (re)initialization; stored as the anchor, nothing validated.
    Bootstrapped,
    /// Sample added to the open window.
    Accumulating,
    /// Window closed within the limit; the anchor moved to the window average.
    Accepted { speed: f32 },
    /// Window closed over the limit; the anchor is unchanged and the client must snap back.
    Rejected { speed: f32, snap_back: Vec3 },
}

/// Server-only, one per controlled pawn.
#[derive(Debug, Clone, Default)]
pub struct SpeedWindow {
    initialized: bool,
    sum_translation: Vec3,
    sample_count: u32,
    window_start_time: f64,
    last_accepted_position: Vec3,
    last_accepted_time: f64,
}

impl SpeedWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the anchor; the next sample bootstraps again (spawn, respawn, teleport).
    pub fn reinitialize(&mut self) {
        *self = Self::default();
    }

    /// Accept `position` as authoritative without waiting for a client sample.
    pub fn anchor(&mut self, position: Vec3, now: f64) {
        self.initialized = true;
        self.last_accepted_position = position;
        self.last_accepted_time = now;
        self.reset_window(now);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn last_accepted_position(&self) -> Vec3 {
        self.last_accepted_position
    }

    pub fn last_accepted_time(&self) -> f64 {
        self.last_accepted_time
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn window_start_time(&self) -> f64 {
        self.window_start_time
    }

    pub fn observe(&mut self, position: Vec3, now: f64, check: SpeedCheck) -> SpeedVerdict {
        if !self.initialized {
            self.initialized = true;
            self.last_accepted_position = position;
            self.last_accepted_time = now;
            self.reset_window(now);
            return SpeedVerdict::Bootstrapped;
        }

        self.sum_translation += position;
        self.sample_count += 1;

        let elapsed = now - self.window_start_time;
        if elapsed <= check.interval {
            return SpeedVerdict::Accumulating;
        }

        let average_position = self.sum_translation / self.sample_count as f32;
        let distance = average_position.distance(self.last_accepted_position);
        let speed = (distance as f64 / elapsed) as f32;
        self.reset_window(now);

        if speed > check.limit {
            return SpeedVerdict::Rejected {
                speed,
                snap_back: self.last_accepted_position,
            };
        }

        self.last_accepted_position = average_position;
        self.last_accepted_time = now;
        SpeedVerdict::Accepted { speed }
    }

    fn reset_window(&mut self, now: f64) {
        self.sum_translation = Vec3::ZERO;
        self.sample_count = 0;
        self.window_start_time = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECK: SpeedCheck = SpeedCheck {
        limit: 5000.0 * 1.05,
        interval: 0.5,
    };

    fn at_x(x: f32) -> Vec3 {
        Vec3::new(x, 0.0, 0.0)
    }

    #[test]
    fn first_sample_bootstraps_without_validation() {
        let mut window = SpeedWindow::new();

        // Even an absurd first position is just taken as the anchor.
        let verdict = window.observe(at_x(1.0e9), 3.0, CHECK);

        assert_eq!(verdict, SpeedVerdict::Bootstrapped);
        assert_eq!(window.last_accepted_position(), at_x(1.0e9));
        assert_eq!(window.last_accepted_time(), 3.0);
        assert_eq!(window.sample_count(), 0);
    }

    #[test]
    fn samples_accumulate_until_the_interval_passes() {
        let mut window = SpeedWindow::new();
        window.observe(at_x(0.0), 0.0, CHECK);

        assert_eq!(window.observe(at_x(100.0), 0.1, CHECK), SpeedVerdict::Accumulating);
        assert_eq!(window.observe(at_x(200.0), 0.5, CHECK), SpeedVerdict::Accumulating);
        assert_eq!(window.sample_count(), 2);
        assert!(matches!(
            window.observe(at_x(300.0), 0.6, CHECK),
            SpeedVerdict::Accepted { .. }
        ));
        assert_eq!(window.sample_count(), 0);
    }

    #[test]
    fn accepts_5200_then_rejects_5300_against_5250_limit() {
        let mut window = SpeedWindow::new();
        window.observe(at_x(0.0), 0.0, CHECK);

        // Average at 3120 after 0.6 s: 5200 u/s.
        window.observe(at_x(3120.0), 0.3, CHECK);
        let verdict = window.observe(at_x(3120.0), 0.6, CHECK);
        let SpeedVerdict::Accepted { speed } = verdict else {
            panic!("expected accept, got {verdict:?}");
        };
        assert!((speed - 5200.0).abs() < 1.0);
        assert_eq!(window.last_accepted_position(), at_x(3120.0));

        // Next window averages 3180 further over 0.6 s: 5300 u/s.
        window.observe(at_x(6300.0), 0.9, CHECK);
        let verdict = window.observe(at_x(6300.0), 1.2, CHECK);
        let SpeedVerdict::Rejected { speed, snap_back } = verdict else {
            panic!("expected reject, got {verdict:?}");
        };
        assert!((speed - 5300.0).abs() < 1.0);
        assert_eq!(snap_back, at_x(3120.0));
        assert_eq!(window.last_accepted_position(), at_x(3120.0));
        assert_eq!(window.last_accepted_time(), 0.6);
    }

    #[test]
    fn speed_depends_on_displacement_not_sample_count() {
        let sparse = {
            let mut window = SpeedWindow::new();
            window.observe(at_x(0.0), 0.0, CHECK);
            window.observe(at_x(1000.0), 0.6, CHECK)
        };
        let dense = {
            let mut window = SpeedWindow::new();
            window.observe(at_x(0.0), 0.0, CHECK);
            for i in 1..10 {
                window.observe(at_x(1000.0), i as f64 * 0.05, CHECK);
            }
            window.observe(at_x(1000.0), 0.6, CHECK)
        };

        assert_eq!(sparse, dense);
        let SpeedVerdict::Accepted { speed } = sparse else {
            panic!("expected accept, got {sparse:?}");
        };
        assert!((speed - 1000.0 / 0.6).abs() < 0.5);
    }

    #[test]
    fn dropped_samples_inside_a_window_do_not_change_the_outcome() {
        // Straight line at 4000 u/s for 0.6 s; keep every sample vs. lose every other one.
        let run = |keep: &dyn Fn(usize) -> bool| {
            let mut window = SpeedWindow::new();
            window.observe(at_x(0.0), 0.0, CHECK);
            (1..=36)
                .filter(|i| keep(*i))
                .map(|i| {
                    let now = i as f64 / 60.0;
                    window.observe(at_x(4000.0 * now as f32), now, CHECK)
                })
                .filter(|v| !matches!(v, SpeedVerdict::Accumulating))
                .collect::<Vec<_>>()
        };

        for verdicts in [run(&|_| true), run(&|i| i % 2 == 0)] {
            assert_eq!(verdicts.len(), 1);
            assert!(matches!(verdicts[0], SpeedVerdict::Accepted { .. }));
        }
    }

    #[test]
    fn rejection_resets_the_window_but_keeps_the_anchor() {
        let mut window = SpeedWindow::new();
        window.observe(at_x(0.0), 0.0, CHECK);
        let verdict = window.observe(at_x(1.0e6), 0.6, CHECK);

        assert!(matches!(verdict, SpeedVerdict::Rejected { .. }));
        assert_eq!(window.sample_count(), 0);
        assert_eq!(window.window_start_time(), 0.6);
        assert_eq!(window.last_accepted_position(), at_x(0.0));

        // Back at the anchor, the next window passes.
        window.observe(at_x(0.0), 0.9, CHECK);
        assert!(matches!(
            window.observe(at_x(0.0), 1.2, CHECK),
            SpeedVerdict::Accepted { .. }
        ));
    }

    #[test]
    fn reinitialize_bootstraps_again() {
        let mut window = SpeedWindow::new();
        window.observe(at_x(0.0), 0.0, CHECK);
        window.reinitialize();

        assert!(!window.is_initialized());
        assert_eq!(window.observe(at_x(9.0e5), 0.1, CHECK), SpeedVerdict::Bootstrapped);
    }
}
