// Framework bootstrap for the game server runtime.

use crate::domain::Arena;
use crate::frameworks::config;
use crate::interface_adapters::http::health_handler;
use crate::interface_adapters::ids::PlayerIds;
use crate::interface_adapters::net::{world_update_serializer, ws_handler};
use crate::interface_adapters::state::{AppState, ConnSettings};
use crate::use_cases::{GameEvent, WorldInbox, WorldUpdate, world_task};

use axum::{Router, extract::ws::Utf8Bytes, routing::get};
use game_shared::{Clock, MonotonicClock};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::{broadcast, mpsc, watch};

pub fn init_runtime() {
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

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state();

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Arc<AppState> {
    // reliable: Join/Leave/ShootingIntent, never dropped. unreliable: transform samples.
    let (reliable_tx, reliable_rx) = mpsc::unbounded_channel::<GameEvent>();
    let (unreliable_tx, unreliable_rx) =
        mpsc::channel::<GameEvent>(config::INBOUND_TRANSFORM_CAPACITY);

    // World updates are serialized once, then fanned out to every connection.
    let (world_tx, _world_rx) = broadcast::channel::<WorldUpdate>(config::WORLD_BROADCAST_CAPACITY);
    let (world_bytes_tx, _world_bytes_rx) =
        broadcast::channel::<Utf8Bytes>(config::WORLD_BROADCAST_CAPACITY);
    let (world_latest_tx, _world_latest_rx) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));

    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
    let settings = config::world_settings();
    tracing::debug!(
        max_speed = settings.pawn.max_speed,
        speed_tolerance = settings.pawn.speed_tolerance,
        shooting_interval = settings.shots.shooting_interval,
        net_cull_distance = settings.net.net_cull_distance,
        "world settings"
    );

    tokio::spawn(world_update_serializer(
        world_tx.subscribe(),
        world_bytes_tx.clone(),
        world_latest_tx.clone(),
    ));
    tokio::spawn(world_task(
        WorldInbox {
            reliable: reliable_rx,
            unreliable: unreliable_rx,
        },
        world_tx,
        settings,
        Arena::default_room(),
        config::TICK_INTERVAL,
        Arc::clone(&clock),
    ));

    Arc::new(AppState {
        reliable_tx,
        unreliable_tx,
        world_bytes_tx,
        world_latest_tx,
        clock,
        player_ids: Arc::new(PlayerIds::new()),
        conn: ConnSettings {
            peer_unreliable_capacity: config::PEER_UNRELIABLE_CAPACITY,
            join_timeout: config::JOIN_TIMEOUT,
        },
    })
}
