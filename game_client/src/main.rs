// Scripted bot pilot: circles the room and fires in bursts.

use game_client::flight::FlightInput;
use game_client::{ClientOptions, ClientWorld, Pilot, PilotInput, config};
use game_shared::{MonotonicClock, Rotator};
use glam::Vec3;

struct CirclingBot;

impl Pilot for CirclingBot {
    fn steer(&mut self, now: f64, world: &ClientWorld) -> PilotInput {
        // Bank gently while flying forward; two seconds of fire every five.
        let fire = world.owned().is_some_and(|p| p.is_placed()) && now % 5.0 < 2.0;
        PilotInput {
            flight: FlightInput {
                move_intent: Vec3::X,
                rotate_intent: Rotator::new(0.0, 0.3, 0.0),
            },
            fire,
        }
    }
}

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_runtime();

    let options = ClientOptions {
        url: config::server_url(),
        display_name: "bot".to_string(),
        tick_interval: config::tick_interval(),
        unreliable_capacity: config::UNRELIABLE_CAPACITY,
    };
    let clock = MonotonicClock::new();

    match game_client::run_client(
        options,
        ClientWorld::new(config::client_settings()),
        CirclingBot,
        &clock,
    )
    .await
    {
        Ok(world) => tracing::info!(corrections = world.corrections(), "disconnected"),
        Err(e) => tracing::error!(error = ?e, "client failed"),
    }
}
