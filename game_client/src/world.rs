//! Everything one client knows about the world.
//!
//! Server messages are applied as they arrive; `tick` then drives the owned pawn and
//! re-simulates every visible pawn's shots locally from the replicated flags.

use std::collections::{BTreeMap, HashSet};

use game_shared::protocol::{ClientMessage, ServerMessage};
use game_shared::{
    ChannelClosed, PawnTuning, ReliableSender, ShotField, ShotTuning, Transform,
    UnreliableSender,
};
use tracing::{debug, info};

use crate::flight::FlightInput;
use crate::pawn::{ObservedPawn, OwnedPawn};

/// What the pilot wants this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PilotInput {
    pub flight: FlightInput,
    pub fire: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ClientSettings {
    pub pawn: PawnTuning,
    pub shots: ShotTuning,
}

#[derive(Debug, Default)]
pub struct ClientWorld {
    settings: ClientSettings,
    owned: Option<OwnedPawn>,
    observed: BTreeMap<u64, ObservedPawn>,
    shots: ShotField,
    last_tick: Option<u64>,
    corrections: u64,
}

impl ClientWorld {
    pub fn new(settings: ClientSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn player_id(&self) -> Option<u64> {
        self.owned.as_ref().map(|p| p.id)
    }

    pub fn owned(&self) -> Option<&OwnedPawn> {
        self.owned.as_ref()
    }

    pub fn owned_mut(&mut self) -> Option<&mut OwnedPawn> {
        self.owned.as_mut()
    }

    pub fn observed(&self, id: u64) -> Option<&ObservedPawn> {
        self.observed.get(&id)
    }

    pub fn shots(&self) -> &ShotField {
        &self.shots
    }

    /// Corrections received so far, spawn placement included.
    pub fn corrections(&self) -> u64 {
        self.corrections
    }

    pub fn handle_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Identity { player_id } => {
                info!(player_id, "identity assigned");
                self.owned = Some(OwnedPawn::new(
                    player_id,
                    &self.settings.pawn,
                    &self.settings.shots,
                ));
                self.observed.remove(&player_id);
            }
            ServerMessage::CorrectTransform(dto) => {
                let Some(owned) = self.owned.as_mut() else {
                    return;
                };
                self.corrections += 1;
                debug!(player_id = owned.id, x = dto.x, y = dto.y, z = dto.z, "transform corrected");
                owned.apply_correction(Transform::from(dto));
            }
            ServerMessage::ShootingStateSync(sync) => {
                if Some(sync.player_id) == self.player_id() {
                    return;
                }
                let shots = &self.settings.shots;
                self.observed
                    .entry(sync.player_id)
                    .or_insert_with(|| ObservedPawn::new(sync.player_id, shots))
                    .set_shooting(sync.is_shooting);
            }
            ServerMessage::WorldUpdate(update) => {
                // Snapshots can arrive out of order after lag recovery; keep the newest.
                if self.last_tick.is_some_and(|last| update.tick <= last) {
                    return;
                }
                self.last_tick = Some(update.tick);

                let own_id = self.player_id();
                let mut present = HashSet::with_capacity(update.pawns.len());
                for pawn in update.pawns {
                    let transform = Transform::from(pawn.transform);
                    if Some(pawn.id) == own_id {
                        if let Some(owned) = self.owned.as_mut() {
                            owned.place_from_snapshot(transform);
                            owned.health = pawn.health;
                            owned.power = pawn.power;
                        }
                        continue;
                    }
                    present.insert(pawn.id);
                    let shots = &self.settings.shots;
                    self.observed
                        .entry(pawn.id)
                        .or_insert_with(|| ObservedPawn::new(pawn.id, shots))
                        .update(transform, pawn.health, pawn.power);
                }

                self.observed.retain(|id, observed| {
                    present.contains(id) || !observed.is_visible()
                });
            }
        }
    }

    /// One client tick: trigger edges, flight, relay, then local shot re-simulation.
    pub fn tick<S>(
        &mut self,
        now: f64,
        dt: f32,
        input: &PilotInput,
        sink: &S,
    ) -> Result<(), ChannelClosed>
    where
        S: UnreliableSender<ClientMessage> + ReliableSender<ClientMessage> + ?Sized,
    {
        let ClientSettings { pawn, shots } = &self.settings;

        if let Some(owned) = self.owned.as_mut() {
            owned.set_shooting(input.fire, sink)?;
            owned.step(&input.flight, dt, pawn);
            owned.relay(sink)?;
            if let Some(shot) = owned.poll_fire(now, pawn, shots) {
                self.shots.spawn(shot);
            }
        }

        for observed in self.observed.values_mut() {
            if let Some(shot) = observed.poll_fire(now, pawn, shots) {
                self.shots.spawn(shot);
            }
        }

        self.shots.advance(now);
        Ok(())
    }
}
