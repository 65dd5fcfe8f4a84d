// Peer-agnostic simulation pieces shared by the server and every client.

pub mod channel;
pub mod clock;
pub mod protocol;
pub mod shooting;
pub mod shot;
pub mod transform;
pub mod tuning;

pub use channel::{ChannelClosed, Delivery, Loopback, ReliableSender, UnreliableSender};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use shooting::{CooldownTimer, ShootingState};
pub use shot::{ShotEvent, ShotField};
pub use transform::{Rotator, Transform, TransformSample};
pub use tuning::{NetTuning, PawnTuning, ShotTuning};
