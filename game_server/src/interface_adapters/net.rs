use crate::interface_adapters::ids::next_connection_id;
use crate::interface_adapters::protocol::ClientMessage;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{GameEvent, PeerMessage, PeerOutbox, WorldUpdate};
use game_shared::protocol::{ServerMessage, WorldUpdateDto};
use game_shared::{Delivery, ReliableSender, Transform, TransformSample, UnreliableSender};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    HandshakeTimeout,
    HandshakeRejected,
    InboundClosed,
    WorldUpdatesClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

pub async fn world_update_serializer(
    mut world_rx: broadcast::Receiver<WorldUpdate>,
    world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    world_latest_tx: watch::Sender<Utf8Bytes>,
) {
    // Serialize each world update once and broadcast the shared bytes.
    loop {
        match world_rx.recv().await {
            Ok(update) => {
                let msg = ServerMessage::WorldUpdate(WorldUpdateDto::from(update));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize world update");
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                // Store the latest bytes for lag recovery.
                let _ = world_latest_tx.send(bytes.clone());
                let _ = world_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(
                    missed = n,
                    "world serializer lagged; skipping to latest update"
                );
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("world updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    // Separate connection id for correlating logs before/after a player_id exists.
    let conn_id = next_connection_id();
    let span = info_span!("conn", conn_id, player_id = tracing::field::Empty);
    let _enter = span.enter();

    let mut ctx = match bootstrap_connection(&mut socket, &state).await {
        Ok(ctx) => ctx,
        Err(e) => {
            warn!(error = ?e, "failed to bootstrap connection");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "join handshake failed".into(),
                })))
                .await;
            let _ = socket.close().await;
            return;
        }
    };

    span.record("player_id", ctx.player_id);
    info!(display_name = %ctx.display_name, "client connected");

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    pub player_id: u64,
    pub display_name: String,
    pub reliable_tx: mpsc::UnboundedSender<GameEvent>,
    pub unreliable_tx: mpsc::Sender<GameEvent>,
    pub world_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    pub world_latest_rx: watch::Receiver<Utf8Bytes>,
    // What the world addresses to this peer only.
    pub peer_unreliable_rx: mpsc::Receiver<PeerMessage>,
    pub peer_reliable_rx: mpsc::UnboundedReceiver<PeerMessage>,
    pub clock: Arc<dyn game_shared::Clock>,
    // Count lag recovery snapshots sent to this client.
    pub lag_recovery_count: u64,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub samples_dropped: u64,

    pub invalid_json: u32,

    pub last_inbound_full_log: Instant,
    pub last_world_lag_log: Instant,
    pub last_invalid_input_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

// Wait for the client's Join; anything else first is a protocol violation.
async fn read_join(socket: &mut WebSocket, timeout: Duration) -> Result<String, NetError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let incoming = tokio::time::timeout_at(deadline, socket.recv())
            .await
            .map_err(|_| NetError::HandshakeTimeout)?;
        match incoming {
            Some(Ok(Message::Text(text))) => {
                return match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => {
                        Ok(sanitize_display_name(&payload.display_name))
                    }
                    Ok(_) => Err(NetError::HandshakeRejected),
                    Err(e) => Err(NetError::Serialization(e)),
                };
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(_)) | None => return Err(NetError::HandshakeRejected),
            Some(Err(e)) => return Err(NetError::Ws(e)),
        }
    }
}

fn sanitize_display_name(raw: &str) -> String {
    let name = raw.trim();
    if name.is_empty() || name.len() > MAX_DISPLAY_NAME_LEN {
        DEFAULT_DISPLAY_NAME.to_string()
    } else {
        name.to_string()
    }
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &AppState,
) -> Result<ConnCtx, NetError> {
    let display_name = read_join(socket, state.conn.join_timeout).await?;

    // Subscribe before Join so the first snapshot with our pawn is not missed.
    let world_bytes_rx = state.world_bytes_tx.subscribe();
    let world_latest_rx = state.world_latest_tx.subscribe();

    let player_id = state.player_ids.next();

    // Tell the client "This is who you are".
    send_message(socket, &ServerMessage::Identity { player_id }).await?;

    let (peer_unreliable_tx, peer_unreliable_rx) =
        mpsc::channel(state.conn.peer_unreliable_capacity);
    let (peer_reliable_tx, peer_reliable_rx) = mpsc::unbounded_channel();

    // Tell the game loop to spawn a pawn for this ID. From here on a Leave must follow.
    state
        .reliable_tx
        .send_reliable(GameEvent::Join {
            player_id,
            outbox: PeerOutbox::new(peer_unreliable_tx, peer_reliable_tx),
        })
        .map_err(|_| NetError::InboundClosed)?;

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        player_id,
        display_name,
        reliable_tx: state.reliable_tx.clone(),
        unreliable_tx: state.unreliable_tx.clone(),
        world_bytes_rx,
        world_latest_rx,
        peer_unreliable_rx,
        peer_reliable_rx,
        clock: Arc::clone(&state.clock),
        lag_recovery_count: 0,

        msgs_in: 0,
        msgs_out: 0,
        bytes_in: 0,
        bytes_out: 0,
        samples_dropped: 0,

        invalid_json: 0,

        last_inbound_full_log: now,
        last_world_lag_log: now,
        last_invalid_input_log: now,

        close_frame: None,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_DISPLAY_NAME_LEN: usize = 32;
const DEFAULT_DISPLAY_NAME: &str = "Pilot";

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

fn sanitize_transform(transform: Transform) -> Option<Transform> {
    transform.is_finite().then_some(transform)
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id;

    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        reliable_tx,
        unreliable_tx,
        world_bytes_rx,
        world_latest_rx,
        peer_unreliable_rx,
        peer_reliable_rx,
        clock,
        lag_recovery_count,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        samples_dropped,
        invalid_json,
        last_inbound_full_log,
        last_world_lag_log,
        last_invalid_input_log,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        let disconnect: bool = tokio::select! {
            // Poll in declaration order: client input, then peer reliable, then unreliable.
            biased;

            // Incoming Message from Client
            incoming = socket.recv() => {
                let inbound = Inbound {
                    player_id,
                    reliable_tx: &*reliable_tx,
                    unreliable_tx: &*unreliable_tx,
                    clock: &**clock,
                };
                match handle_incoming_ws(
                    incoming,
                    &inbound,
                    msgs_in,
                    bytes_in,
                    samples_dropped,
                    invalid_json,
                    last_inbound_full_log,
                    last_invalid_input_log,
                    close_frame,
                ) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Corrections and state syncs addressed to this peer. Reliable first.
            Some(msg) = peer_reliable_rx.recv() => {
                match forward_peer_message(msg, socket, msgs_out, bytes_out).await {
                    LoopControl::Continue => false,
                    LoopControl::Disconnect => true,
                }
            }
            Some(msg) = peer_unreliable_rx.recv() => {
                match forward_peer_message(msg, socket, msgs_out, bytes_out).await {
                    LoopControl::Continue => false,
                    LoopControl::Disconnect => true,
                }
            }

            // Outgoing World Update
            world_msg = world_bytes_rx.recv() => {
                match world_msg {
                    Ok(bytes) => match forward_world_bytes(bytes, socket, msgs_out, bytes_out).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(last_world_lag_log) {
                            warn!(missed = n, "world updates lagged; sending snapshot");
                        }

                        // Resync strategy: send the latest world snapshot.
                        let latest = world_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            *lag_recovery_count += 1;
                            match forward_world_bytes(latest, socket, msgs_out, bytes_out).await {
                                LoopControl::Continue => false,
                                LoopControl::Disconnect => true,
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::WorldUpdatesClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(player_id, reliable_tx) {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    debug!(
        player_id,
        msgs_in = *msgs_in,
        msgs_out = *msgs_out,
        bytes_in = *bytes_in,
        bytes_out = *bytes_out,
        samples_dropped = *samples_dropped,
        invalid_json = *invalid_json,
        lag_recovery_count = *lag_recovery_count,
        "connection stats"
    );
    info!(player_id, "client disconnected");

    if let Some(err) = fatal {
        Err(err)
    } else {
        Ok(())
    }
}

// Where one connection's inbound messages go.
struct Inbound<'a> {
    player_id: u64,
    reliable_tx: &'a mpsc::UnboundedSender<GameEvent>,
    unreliable_tx: &'a mpsc::Sender<GameEvent>,
    clock: &'a dyn game_shared::Clock,
}

#[allow(clippy::too_many_arguments)]
fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    inbound: &Inbound<'_>,
    msgs_in: &mut u64,
    bytes_in: &mut u64,
    samples_dropped: &mut u64,
    invalid_json: &mut u32,
    last_inbound_full_log: &mut Instant,
    last_invalid_input_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    let player_id = inbound.player_id;
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;
                *bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(_)) => {
                        if should_log(last_invalid_input_log) {
                            warn!(player_id, "duplicate join ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Ok(ClientMessage::ReportTransform(dto)) => {
                        let Some(transform) = sanitize_transform(dto.into()) else {
                            if should_log(last_invalid_input_log) {
                                warn!(player_id, "invalid transform values (NaN/inf); dropping");
                            }
                            return Ok(LoopControl::Continue);
                        };

                        // Stamp on arrival; the world may only drain it next tick.
                        let sample = TransformSample::new(transform, inbound.clock.now());
                        match inbound
                            .unreliable_tx
                            .send_unreliable(GameEvent::ReportTransform { player_id, sample })
                        {
                            Ok(Delivery::Sent) => Ok(LoopControl::Continue),
                            Ok(Delivery::Dropped) => {
                                *samples_dropped += 1;
                                if should_log(last_inbound_full_log) {
                                    warn!(player_id, "transform channel full; dropping sample");
                                }
                                Ok(LoopControl::Continue)
                            }
                            Err(_) => Err(NetError::InboundClosed),
                        }
                    }
                    Ok(ClientMessage::ReportShootingIntent(intent)) => inbound
                        .reliable_tx
                        .send_reliable(GameEvent::ReportShootingIntent {
                            player_id,
                            is_shooting: intent.is_shooting,
                        })
                        .map(|()| LoopControl::Continue)
                        .map_err(|_| NetError::InboundClosed),
                    Err(parse_err) => {
                        *invalid_json += 1;
                        if should_log(last_invalid_input_log) {
                            warn!(
                                player_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if *invalid_json > MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_peer_message(
    msg: PeerMessage,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    match send_message(socket, &ServerMessage::from(msg)).await {
        Ok(bytes) => {
            *msgs_out += 1;
            *bytes_out += bytes as u64;
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send peer message");
            LoopControl::Disconnect
        }
    }
}

async fn forward_world_bytes(
    world_msg: Utf8Bytes,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let bytes_len = world_msg.len();
    match socket
        .send(Message::Text(world_msg))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            *msgs_out += 1;
            *bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send world update");
            LoopControl::Disconnect
        }
    }
}

fn disconnect_cleanup(
    player_id: u64,
    reliable_tx: &mpsc::UnboundedSender<GameEvent>,
) -> Result<(), NetError> {
    reliable_tx
        .send_reliable(GameEvent::Leave { player_id })
        .map_err(|_| NetError::InboundClosed)
}
