// Client-side pawn records: the one this client drives and the ones it only watches.

use game_shared::protocol::{ClientMessage, ShootingIntentDto, TransformDto};
use game_shared::{
    ChannelClosed, CooldownTimer, Delivery, PawnTuning, ReliableSender, ShootingState,
    ShotEvent, ShotTuning, Transform, UnreliableSender,
};
use tracing::debug;

use crate::flight::{FlightInput, FlightModel};

/// Pawn driven by this client's input and relayed to the server every tick.
#[derive(Debug)]
pub struct OwnedPawn {
    pub id: u64,
    pub transform: Transform,
    pub health: f32,
    pub power: f32,
    flight: FlightModel,
    // False until the server has told us where we spawned.
    placed: bool,
    shooting: ShootingState,
    cooldown: CooldownTimer,
}

impl OwnedPawn {
    pub fn new(id: u64, pawn: &PawnTuning, shots: &ShotTuning) -> Self {
        Self {
            id,
            transform: Transform::IDENTITY,
            health: pawn.max_health,
            power: pawn.max_power,
            flight: FlightModel::new(),
            placed: false,
            shooting: ShootingState::default(),
            cooldown: CooldownTimer::new(shots.shooting_interval),
        }
    }

    pub fn is_placed(&self) -> bool {
        self.placed
    }

    pub fn is_shooting(&self) -> bool {
        self.shooting.is_shooting
    }

    pub fn flight(&self) -> &FlightModel {
        &self.flight
    }

    pub fn flight_mut(&mut self) -> &mut FlightModel {
        &mut self.flight
    }

    /// Overwrite the local transform with the server's, no blending.
    pub fn apply_correction(&mut self, transform: Transform) {
        self.transform = transform;
        self.flight.stop();
        self.placed = true;
    }

    /// Take the first snapshot position when the spawn correction was lost.
    pub fn place_from_snapshot(&mut self, transform: Transform) {
        if !self.placed {
            debug!(player_id = self.id, "placed from world update");
            self.apply_correction(transform);
        }
    }

    pub fn step(&mut self, input: &FlightInput, dt: f32, tuning: &PawnTuning) {
        if self.placed {
            self.flight.step(&mut self.transform, input, dt, tuning);
        }
    }

    /// Send the current transform best-effort. `None` until the pawn has been placed.
    pub fn relay<S>(&self, sink: &S) -> Result<Option<Delivery>, ChannelClosed>
    where
        S: UnreliableSender<ClientMessage> + ?Sized,
    {
        if !self.placed {
            return Ok(None);
        }
        sink.send_unreliable(ClientMessage::ReportTransform(TransformDto::from(
            self.transform,
        )))
        .map(Some)
    }

    /// Flip the local trigger right away; only edges go to the server.
    pub fn set_shooting<S>(&mut self, is_shooting: bool, sink: &S) -> Result<bool, ChannelClosed>
    where
        S: ReliableSender<ClientMessage> + ?Sized,
    {
        if !self.shooting.set(is_shooting) {
            return Ok(false);
        }
        sink.send_reliable(ClientMessage::ReportShootingIntent(ShootingIntentDto {
            is_shooting,
        }))?;
        Ok(true)
    }

    pub fn poll_fire(&mut self, now: f64, pawn: &PawnTuning, shots: &ShotTuning) -> Option<ShotEvent> {
        if !self.placed || !self.cooldown.poll(self.shooting.is_shooting, now) {
            return None;
        }
        Some(ShotEvent::from_muzzle(
            self.id,
            &self.transform,
            muzzle_offset(pawn, shots),
            shots,
            now,
        ))
    }
}

/// Someone else's pawn, mirrored from replication.
#[derive(Debug)]
pub struct ObservedPawn {
    pub id: u64,
    pub transform: Transform,
    pub health: f32,
    pub power: f32,
    // A state sync can arrive before the first snapshot with this pawn in it.
    visible: bool,
    shooting: ShootingState,
    cooldown: CooldownTimer,
}

impl ObservedPawn {
    pub fn new(id: u64, shots: &ShotTuning) -> Self {
        Self {
            id,
            transform: Transform::IDENTITY,
            health: 0.0,
            power: 0.0,
            visible: false,
            shooting: ShootingState::default(),
            cooldown: CooldownTimer::new(shots.shooting_interval),
        }
    }

    pub fn is_shooting(&self) -> bool {
        self.shooting.is_shooting
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_shooting(&mut self, is_shooting: bool) {
        self.shooting.set(is_shooting);
    }

    pub fn update(&mut self, transform: Transform, health: f32, power: f32) {
        self.transform = transform;
        self.health = health;
        self.power = power;
        self.visible = true;
    }

    pub fn poll_fire(&mut self, now: f64, pawn: &PawnTuning, shots: &ShotTuning) -> Option<ShotEvent> {
        if !self.visible || !self.cooldown.poll(self.shooting.is_shooting, now) {
            return None;
        }
        Some(ShotEvent::from_muzzle(
            self.id,
            &self.transform,
            muzzle_offset(pawn, shots),
            shots,
            now,
        ))
    }
}

fn muzzle_offset(pawn: &PawnTuning, shots: &ShotTuning) -> f32 {
    pawn.radius + shots.radius + 1.0
}
