use crate::world::{ClientWorld, PilotInput};
use game_shared::protocol::{ClientMessage, JoinPayload, ServerMessage};
use game_shared::{ChannelClosed, Clock, Delivery, ReliableSender, UnreliableSender};

use futures::{SinkExt, StreamExt};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub enum ClientError {
    #[allow(dead_code)]
    Connect(tungstenite::Error),
    #[allow(dead_code)]
    Ws(tungstenite::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    // The server closed the connection or the outbound queues went away.
    Closed,
}

impl From<ChannelClosed> for ClientError {
    fn from(_: ChannelClosed) -> Self {
        ClientError::Closed
    }
}

/// Decides the pawn's input each client tick.
pub trait Pilot {
    fn steer(&mut self, now: f64, world: &ClientWorld) -> PilotInput;
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub url: String,
    pub display_name: String,
    pub tick_interval: Duration,
    // Transform samples waiting for the socket; older ones are dropped past this.
    pub unreliable_capacity: usize,
}

// Outbound queues merged into the socket writer, one per delivery contract.
struct ClientOutbox {
    unreliable: mpsc::Sender<ClientMessage>,
    reliable: mpsc::UnboundedSender<ClientMessage>,
}

impl UnreliableSender<ClientMessage> for ClientOutbox {
    fn send_unreliable(&self, msg: ClientMessage) -> Result<Delivery, ChannelClosed> {
        self.unreliable.send_unreliable(msg)
    }
}

impl ReliableSender<ClientMessage> for ClientOutbox {
    fn send_reliable(&self, msg: ClientMessage) -> Result<(), ChannelClosed> {
        self.reliable.send_reliable(msg)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

/// Connect, join, and fly until the server goes away.
pub async fn run_client<P: Pilot>(
    options: ClientOptions,
    mut world: ClientWorld,
    mut pilot: P,
    clock: &dyn Clock,
) -> Result<ClientWorld, ClientError> {
    let (socket, _) = tokio_tungstenite::connect_async(options.url.as_str())
        .await
        .map_err(ClientError::Connect)?;
    info!(url = %options.url, "connected");
    let (mut ws_tx, mut ws_rx) = socket.split();

    let join = ClientMessage::Join(JoinPayload {
        display_name: options.display_name.clone(),
    });
    send_message(&mut ws_tx, &join).await?;

    let (unreliable_tx, mut unreliable_rx) = mpsc::channel(options.unreliable_capacity.max(1));
    let (reliable_tx, mut reliable_rx) = mpsc::unbounded_channel();
    let outbox = ClientOutbox {
        unreliable: unreliable_tx,
        reliable: reliable_tx,
    };

    let mut interval = tokio::time::interval(options.tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut last_tick = clock.now();
    let mut invalid_json: u32 = 0;
    let mut last_invalid_log = Instant::now() - LOG_THROTTLE;

    loop {
        tokio::select! {
            biased;

            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerMessage>(&text) {
                            Ok(msg) => world.handle_message(msg),
                            Err(e) => {
                                invalid_json += 1;
                                if should_log(&mut last_invalid_log) {
                                    warn!(error = %e, invalid_json, "failed to parse server message");
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!(?frame, "server closed connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(ClientError::Ws(e)),
                    None => break,
                }
            }

            // Reliable traffic goes out ahead of queued samples.
            Some(msg) = reliable_rx.recv() => {
                send_message(&mut ws_tx, &msg).await?;
            }
            Some(msg) = unreliable_rx.recv() => {
                send_message(&mut ws_tx, &msg).await?;
            }

            _ = interval.tick() => {
                let now = clock.now();
                let dt = (now - last_tick).max(0.0) as f32;
                last_tick = now;
                let input = pilot.steer(now, &world);
                world.tick(now, dt, &input, &outbox)?;
            }
        }
    }

    debug!(corrections = world.corrections(), "client loop finished");
    Ok(world)
}

async fn send_message<S>(ws_tx: &mut S, msg: &ClientMessage) -> Result<(), ClientError>
where
    S: futures::Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let txt = serde_json::to_string(msg).map_err(ClientError::Serialization)?;
    ws_tx
        .send(Message::text(txt))
        .await
        .map_err(ClientError::Ws)
}
