pub mod config;
pub mod flight;
pub mod net;
pub mod pawn;
pub mod world;

pub use net::{ClientError, ClientOptions, Pilot, run_client};
pub use world::{ClientSettings, ClientWorld, PilotInput};
