//! Delivery contracts for everything that crosses a peer boundary.
//!
//! There is no generic `send`: callers pick [`UnreliableSender`] when a lost
//! message is superseded by a later one (transform relay, corrections) and
//! [`ReliableSender`] when every message must land, in order (shooting intent, replicated
//! state).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tokio::sync::mpsc;
use tracing::trace;

/// The receiving side is gone; the peer has disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelClosed;

impl std::fmt::Display for ChannelClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("channel closed")
    }
}

impl std::error::Error for ChannelClosed {}

/// Outcome of a best-effort send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Dropped,
}

/// Best-effort, never blocks, may drop or reorder.
pub trait UnreliableSender<M> {
    fn send_unreliable(&self, msg: M) -> Result<Delivery, ChannelClosed>;
}

/// Ordered and lossless for as long as the receiver exists.
pub trait ReliableSender<M> {
    fn send_reliable(&self, msg: M) -> Result<(), ChannelClosed>;
}

impl<M> UnreliableSender<M> for mpsc::Sender<M> {
    fn send_unreliable(&self, msg: M) -> Result<Delivery, ChannelClosed> {
        match self.try_send(msg) {
            Ok(()) => Ok(Delivery::Sent),
            Err(mpsc::error::TrySendError::Full(_)) => {
                trace!("unreliable queue full; dropping message");
                Ok(Delivery::Dropped)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(ChannelClosed),
        }
    }
}

impl<M> ReliableSender<M> for mpsc::UnboundedSender<M> {
    fn send_reliable(&self, msg: M) -> Result<(), ChannelClosed> {
        self.send(msg).map_err(|_| ChannelClosed)
    }
}

impl<M, T> UnreliableSender<M> for &T
where
    T: UnreliableSender<M> + ?Sized,
{
    fn send_unreliable(&self, msg: M) -> Result<Delivery, ChannelClosed> {
        (**self).send_unreliable(msg)
    }
}

impl<M, T> ReliableSender<M> for &T
where
    T: ReliableSender<M> + ?Sized,
{
    fn send_reliable(&self, msg: M) -> Result<(), ChannelClosed> {
        (**self).send_reliable(msg)
    }
}

impl<M, T> UnreliableSender<M> for Rc<T>
where
    T: UnreliableSender<M> + ?Sized,
{
    fn send_unreliable(&self, msg: M) -> Result<Delivery, ChannelClosed> {
        (**self).send_unreliable(msg)
    }
}

impl<M, T> ReliableSender<M> for Rc<T>
where
    T: ReliableSender<M> + ?Sized,
{
    fn send_reliable(&self, msg: M) -> Result<(), ChannelClosed> {
        (**self).send_reliable(msg)
    }
}

/// In-process channel pair for running peers side by side.
///
/// The unreliable side can be told to lose messages on a fixed pattern so loss handling
/// stays deterministic in tests.
#[derive(Debug)]
pub struct Loopback<M> {
    reliable: RefCell<VecDeque<M>>,
    unreliable: RefCell<VecDeque<M>>,
    drop_every: Option<usize>,
    unreliable_attempts: RefCell<usize>,
    closed: bool,
}

impl<M> Default for Loopback<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Loopback<M> {
    pub fn new() -> Self {
        Self {
            reliable: RefCell::new(VecDeque::new()),
            unreliable: RefCell::new(VecDeque::new()),
            drop_every: None,
            unreliable_attempts: RefCell::new(0),
            closed: false,
        }
    }

    /// Lose every `n`th unreliable message (1-based).
    pub fn dropping_every(mut self, n: usize) -> Self {
        self.drop_every = (n > 0).then_some(n);
        self
    }

    pub fn closed() -> Self {
        Self {
            closed: true,
            ..Self::new()
        }
    }

    /// Takes everything queued on the reliable side, in send order.
    pub fn drain_reliable(&self) -> Vec<M> {
        self.reliable.borrow_mut().drain(..).collect()
    }

    /// Takes everything that survived the unreliable side.
    pub fn drain_unreliable(&self) -> Vec<M> {
        self.unreliable.borrow_mut().drain(..).collect()
    }

    pub fn unreliable_len(&self) -> usize {
        self.unreliable.borrow().len()
    }

    pub fn reliable_len(&self) -> usize {
        self.reliable.borrow().len()
    }
}

impl<M> UnreliableSender<M> for Loopback<M> {
    fn send_unreliable(&self, msg: M) -> Result<Delivery, ChannelClosed> {
        if self.closed {
            return Err(ChannelClosed);
        }

        let mut attempts = self.unreliable_attempts.borrow_mut();
        *attempts += 1;
        if let Some(n) = self.drop_every {
            if *attempts % n == 0 {
                return Ok(Delivery::Dropped);
            }
        }

        self.unreliable.borrow_mut().push_back(msg);
        Ok(Delivery::Sent)
    }
}

impl<M> ReliableSender<M> for Loopback<M> {
    fn send_reliable(&self, msg: M) -> Result<(), ChannelClosed> {
        if self.closed {
            return Err(ChannelClosed);
        }
        self.reliable.borrow_mut().push_back(msg);
        Ok(())
    }
}
