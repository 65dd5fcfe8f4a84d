//! Authoritative world simulation.
//!
//! Synchronous and clock-free: the caller stamps every input and passes `now` into each
//! tick, so the whole thing runs deterministically in tests with in-memory outboxes.

use std::collections::BTreeMap;

use game_shared::{
    NetTuning, PawnTuning, Rotator, ShotField, ShotTuning, Transform, TransformSample,
};
use tracing::{debug, info, warn};

use super::types::{Outbox, PeerMessage, WorldUpdate};
use crate::domain::geometry::segment_touches_sphere;
use crate::domain::{Arena, Correction, ReplicatedPawn, ServerPawn, ShootingReplicator};

#[derive(Debug, Clone, Default)]
pub struct WorldSettings {
    pub pawn: PawnTuning,
    pub shots: ShotTuning,
    pub net: NetTuning,
}

impl WorldSettings {
    /// Clamp range-constrained values instead of rejecting them.
    pub fn normalized(self) -> Self {
        let shots = self.shots;
        Self {
            pawn: self.pawn.normalized(),
            net: self.net.covering(&shots),
            shots,
        }
    }
}

struct Player<O> {
    pawn: ServerPawn,
    outbox: O,
}

pub struct World<O> {
    settings: WorldSettings,
    arena: Arena,
    players: BTreeMap<u64, Player<O>>,
    shots: ShotField,
    replicator: ShootingReplicator,
    spawn_count: usize,
    tick: u64,
}

impl<O: Outbox> World<O> {
    pub fn new(settings: WorldSettings, arena: Arena) -> Self {
        Self {
            settings: settings.normalized(),
            arena,
            players: BTreeMap::new(),
            shots: ShotField::new(),
            replicator: ShootingReplicator::new(),
            spawn_count: 0,
            tick: 0,
        }
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    pub fn pawn(&self, player_id: u64) -> Option<&ServerPawn> {
        self.players.get(&player_id).map(|p| &p.pawn)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn shots(&self) -> &ShotField {
        &self.shots
    }

    /// Spawn a pawn for `player_id` and tell its owner where it is.
    ///
    /// The speed window starts uninitialized: the owner's first report bootstraps it.
    /// Shooting states of nearby pawns reach the new player through the next tick's
    /// replication pass, since nothing has been sent to it yet.
    pub fn join(&mut self, player_id: u64, outbox: O) -> Transform {
        if self.players.contains_key(&player_id) {
            warn!(player_id, "duplicate join; replacing pawn");
            self.leave(player_id);
        }

        let spawn = self.next_spawn();
        let pawn = ServerPawn::new(player_id, spawn, &self.settings.pawn, &self.settings.shots);
        if outbox
            .send_unreliable(PeerMessage::CorrectTransform(spawn))
            .is_err()
        {
            debug!(player_id, "outbox closed before spawn was sent");
        }
        info!(player_id, x = spawn.translation.x, y = spawn.translation.y, "player joined");
        self.players.insert(player_id, Player { pawn, outbox });
        spawn
    }

    pub fn leave(&mut self, player_id: u64) {
        if self.players.remove(&player_id).is_none() {
            return;
        }
        self.shots.remove_owned_by(player_id);
        self.replicator.forget(player_id);
        info!(player_id, "player left");
    }

    /// Validate and apply one relayed transform; any correction goes out unreliably.
    pub fn report_transform(
        &mut self,
        player_id: u64,
        sample: TransformSample,
    ) -> Option<Correction> {
        if !sample.transform.is_finite() {
            return None;
        }
        let player = self.players.get_mut(&player_id)?;
        let correction = player.pawn.receive_transform(
            sample.transform,
            sample.received_at,
            &self.arena,
            &self.settings.pawn,
        )?;
        send_correction(player_id, &player.outbox, &correction);
        Some(correction)
    }

    /// Store the owner's trigger state as canonical.
    pub fn report_shooting_intent(&mut self, player_id: u64, is_shooting: bool) {
        if let Some(player) = self.players.get_mut(&player_id) {
            if player.pawn.shooting.set(is_shooting) {
                debug!(player_id, is_shooting, "shooting state changed");
            }
        }
    }

    /// Advance the world to `now` and snapshot it.
    pub fn tick(&mut self, now: f64, dt: f32) -> WorldUpdate {
        let cull_distance = self.settings.net.net_cull_distance;
        let WorldSettings { pawn, shots, .. } = &self.settings;

        for player in self.players.values_mut() {
            if let Some(shot) = player.pawn.poll_fire(now, pawn, shots) {
                self.shots.spawn(shot);
            }
            player.pawn.regenerate(dt, pawn);
        }

        let downed = self.resolve_shots(now);
        for player_id in downed {
            self.respawn(player_id, now);
        }

        self.replicate(cull_distance);

        self.tick += 1;
        WorldUpdate {
            tick: self.tick,
            pawns: self.players.values().map(|p| p.pawn.snapshot()).collect(),
        }
    }

    // Move shots along their paths; walls stop them, pawns take damage. Returns the
    // players downed this tick.
    fn resolve_shots(&mut self, now: f64) -> Vec<u64> {
        let arena = &self.arena;
        let players = &mut self.players;
        let pawn_tuning = &self.settings.pawn;
        let shot_tuning = &self.settings.shots;
        let reach = pawn_tuning.radius + shot_tuning.radius;
        let mut downed = Vec::new();

        self.shots.advance_with(now, |shot, from, to| {
            let wall = arena.first_hit(from, to, shot_tuning.radius);
            let end = wall.map_or(to, |t| from + (to - from) * t);

            let victim = players.values_mut().find(|p| {
                p.pawn.id != shot.owner_id
                    && p.pawn.health > 0.0
                    && segment_touches_sphere(from, end, p.pawn.translation(), reach)
            });
            if let Some(victim) = victim {
                let victim_id = victim.pawn.id;
                if victim
                    .pawn
                    .apply_health_delta(shot_tuning.health_delta, pawn_tuning)
                {
                    info!(player_id = victim_id, by = shot.owner_id, "player downed");
                    downed.push(victim_id);
                }
                return true;
            }
            wall.is_some()
        });

        downed
    }

    fn respawn(&mut self, player_id: u64, now: f64) {
        let spawn = self.next_spawn();
        let Some(player) = self.players.get_mut(&player_id) else {
            return;
        };
        let correction = player.pawn.respawn(spawn, now, &self.settings.pawn);
        send_correction(player_id, &player.outbox, &correction);
    }

    fn replicate(&mut self, cull_distance: f32) {
        let pawns: Vec<ReplicatedPawn> = self
            .players
            .values()
            .map(|p| ReplicatedPawn {
                id: p.pawn.id,
                position: p.pawn.translation(),
                is_shooting: p.pawn.shooting.is_shooting,
            })
            .collect();

        for update in self.replicator.collect(&pawns, cull_distance) {
            let Some(observer) = self.players.get(&update.observer) else {
                continue;
            };
            let msg = PeerMessage::ShootingStateSync {
                player_id: update.subject,
                is_shooting: update.is_shooting,
            };
            if observer.outbox.send_reliable(msg).is_err() {
                debug!(player_id = update.observer, "outbox closed; skipping state sync");
            }
        }
    }

    // Cycle through the arena's spawn points, facing the middle of the room.
    fn next_spawn(&mut self) -> Transform {
        let position = self.arena.spawn_point(self.spawn_count);
        self.spawn_count = self.spawn_count.wrapping_add(1);
        let to_center = -position;
        let yaw = if to_center.truncate().length_squared() > f32::EPSILON {
            to_center.y.atan2(to_center.x).to_degrees()
        } else {
            0.0
        };
        Transform::new(position, Rotator::new(0.0, yaw, 0.0))
    }
}

fn send_correction<O: Outbox>(player_id: u64, outbox: &O, correction: &Correction) {
    if outbox
        .send_unreliable(PeerMessage::CorrectTransform(correction.transform))
        .is_err()
    {
        debug!(player_id, "outbox closed; correction not sent");
    }
}
