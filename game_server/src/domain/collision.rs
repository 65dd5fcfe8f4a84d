//! Consecutive blocked-sweep tracking.
//!
//! Legitimate moves that slide along geometry still report blocking hits on the server now
//! and then, so one hit is not worth a visible correction. A bounded streak of them means
//! client and server have drifted apart and a resync is forced.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakOutcome {
    /// The sweep was clean; the streak is back to zero.
    Clean,
    /// Blocked, but still within the tolerated streak.
    Tolerated { consecutive_hits: u32 },
    /// This hit pushed the streak past the maximum for the first time.
    ForceResync { consecutive_hits: u32 },
}

/// Server-only, one per controlled pawn.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionStreak {
    consecutive_hits: u32,
}

impl CollisionStreak {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consecutive_hits(&self) -> u32 {
        self.consecutive_hits
    }

    pub fn record(&mut self, blocking_hit: bool, max_consecutive_hits: u32) -> StreakOutcome {
        if !blocking_hit {
            self.consecutive_hits = 0;
            return StreakOutcome::Clean;
        }

        self.consecutive_hits = self.consecutive_hits.saturating_add(1);
        // Fire only on the hit that first exceeds the bound; a new resync needs a clean
        // move in between.
        if self.consecutive_hits == max_consecutive_hits.saturating_add(1) {
            StreakOutcome::ForceResync {
                consecutive_hits: self.consecutive_hits,
            }
        } else {
            StreakOutcome::Tolerated {
                consecutive_hits: self.consecutive_hits,
            }
        }
    }

    pub fn reset(&mut self) {
        self.consecutive_hits = 0;
    }
}
