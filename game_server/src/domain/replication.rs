//! Per-observer replication of the shooting flag.
//!
//! Each observer only hears about pawns within the cull distance, and only when the value
//! it last received differs from the current one. A pawn outside relevance replicates as
//! not shooting, so an observer never keeps re-simulating a pawn it can no longer hear.

use std::collections::HashMap;

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShootingUpdate {
    pub observer: u64,
    pub subject: u64,
    pub is_shooting: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ReplicatedPawn {
    pub id: u64,
    pub position: Vec3,
    pub is_shooting: bool,
}

#[derive(Debug, Default)]
pub struct ShootingReplicator {
    // (observer, subject) -> last value delivered.
    sent: HashMap<(u64, u64), bool>,
}

impl ShootingReplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates owed this tick. The owner is never sent its own flag.
    pub fn collect(&mut self, pawns: &[ReplicatedPawn], cull_distance: f32) -> Vec<ShootingUpdate> {
        let cull_sq = cull_distance * cull_distance;
        let mut updates = Vec::new();

        for observer in pawns {
            for subject in pawns {
                if subject.id == observer.id {
                    continue;
                }
                let key = (observer.id, subject.id);
                let relevant = observer.position.distance_squared(subject.position) <= cull_sq;
                let is_shooting = relevant && subject.is_shooting;
                match self.sent.get(&key) {
                    Some(&last) if last == is_shooting => continue,
                    // Never heard of it and out of range: nothing to retract.
                    None if !relevant => continue,
                    _ => {}
                }
                self.sent.insert(key, is_shooting);
                updates.push(ShootingUpdate {
                    observer: observer.id,
                    subject: subject.id,
                    is_shooting,
                });
            }
        }

        updates
    }

    /// Drop everything known about `id`, as observer or subject.
    pub fn forget(&mut self, id: u64) {
        self.sent
            .retain(|(observer, subject), _| *observer != id && *subject != id);
    }
}
