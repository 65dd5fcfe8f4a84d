// Domain layer: authoritative pawn rules and arena geometry.

pub mod collision;
pub mod geometry;
pub mod pawn;
pub mod replication;
pub mod speed_window;
pub mod state;

pub use collision::{CollisionStreak, StreakOutcome};
pub use geometry::{Aabb, Arena, SweepResult, SweptMove};
pub use pawn::{Correction, CorrectionReason, ServerPawn};
pub use replication::{ReplicatedPawn, ShootingReplicator, ShootingUpdate};
pub use speed_window::{SpeedCheck, SpeedVerdict, SpeedWindow};
pub use state::PawnSnapshot;
