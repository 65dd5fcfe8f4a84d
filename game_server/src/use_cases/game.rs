use super::types::{GameEvent, PeerOutbox, WorldUpdate};
use super::world::{World, WorldSettings};
use crate::domain::Arena;
use game_shared::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};
use tracing::info;

/// Inbound queues feeding the world task, one per delivery contract.
pub struct WorldInbox {
    /// Join/Leave/ShootingIntent, applied in send order.
    pub reliable: mpsc::UnboundedReceiver<GameEvent>,
    /// ReportTransform; producers drop on full.
    pub unreliable: mpsc::Receiver<GameEvent>,
}

pub async fn world_task(
    mut inbox: WorldInbox,
    world_tx: broadcast::Sender<WorldUpdate>,
    settings: WorldSettings,
    arena: Arena,
    tick_interval: Duration,
    clock: Arc<dyn Clock>,
) {
    let mut world: World<PeerOutbox> = World::new(settings, arena);

    // Drive the fixed-step loop at the configured tick rate.
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_tick = clock.now();

    loop {
        interval.tick().await;

        // Reliable first so a Join is in place before that player's first transform.
        let shutting_down = loop {
            match inbox.reliable.try_recv() {
                Ok(ev) => apply(&mut world, ev),
                Err(TryRecvError::Empty) => break false,
                Err(TryRecvError::Disconnected) => break true,
            }
        };
        if shutting_down {
            info!("inbound queue closed; stopping world task");
            break;
        }

        while let Ok(ev) = inbox.unreliable.try_recv() {
            apply(&mut world, ev);
        }

        let now = clock.now();
        let dt = (now - last_tick).max(0.0) as f32;
        last_tick = now;

        let update = world.tick(now, dt);
        // No subscribers is fine; nobody is connected.
        let _ = world_tx.send(update);
    }
}

fn apply(world: &mut World<PeerOutbox>, ev: GameEvent) {
    match ev {
        GameEvent::Join { player_id, outbox } => {
            world.join(player_id, outbox);
        }
        GameEvent::Leave { player_id } => world.leave(player_id),
        GameEvent::ReportTransform { player_id, sample } => {
            world.report_transform(player_id, sample);
        }
        GameEvent::ReportShootingIntent {
            player_id,
            is_shooting,
        } => world.report_shooting_intent(player_id, is_shooting),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::types::PeerMessage;
    use game_shared::{ManualClock, Transform, TransformSample};
    use glam::Vec3;

    fn inbox() -> (
        mpsc::UnboundedSender<GameEvent>,
        mpsc::Sender<GameEvent>,
        WorldInbox,
    ) {
        let (reliable_tx, reliable) = mpsc::unbounded_channel();
        let (unreliable_tx, unreliable) = mpsc::channel(16);
        (
            reliable_tx,
            unreliable_tx,
            WorldInbox {
                reliable,
                unreliable,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn joins_are_applied_before_transforms_and_ticks_broadcast() {
        let (reliable_tx, unreliable_tx, inbox) = inbox();
        let (world_tx, mut world_rx) = broadcast::channel(16);
        let clock = ManualClock::new(0.0);
        let task = tokio::spawn(world_task(
            inbox,
            world_tx,
            WorldSettings::default(),
            Arena::new(vec![], vec![Vec3::ZERO]),
            Duration::from_millis(16),
            Arc::new(clock.clone()),
        ));

        let (peer_unreliable_tx, mut peer_unreliable_rx) = mpsc::channel(8);
        let (peer_reliable_tx, _peer_reliable_rx) = mpsc::unbounded_channel();
        // Queue the transform first; the join still lands before it.
        unreliable_tx
            .try_send(GameEvent::ReportTransform {
                player_id: 7,
                sample: TransformSample::new(Transform::IDENTITY, 0.0),
            })
            .expect("world task alive");
        reliable_tx
            .send(GameEvent::Join {
                player_id: 7,
                outbox: PeerOutbox::new(peer_unreliable_tx, peer_reliable_tx),
            })
            .expect("world task alive");

        let update = world_rx.recv().await.expect("world update");
        assert_eq!(update.pawns.len(), 1);
        assert_eq!(update.pawns[0].id, 7);
        assert_eq!(
            peer_unreliable_rx.recv().await,
            Some(PeerMessage::CorrectTransform(update.pawns[0].transform))
        );

        clock.advance(0.016);
        reliable_tx
            .send(GameEvent::Leave { player_id: 7 })
            .expect("world task alive");
        let mut emptied = false;
        for _ in 0..4 {
            if world_rx.recv().await.expect("world update").pawns.is_empty() {
                emptied = true;
                break;
            }
        }
        assert!(emptied);

        drop(reliable_tx);
        task.await.expect("world task exits cleanly");
    }
}
