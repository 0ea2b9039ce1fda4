//! Frame delivery to the consumer.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tracing::{debug, info};

use crate::stream::Frame;

/// What happened to one accepted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Queued on the consumer channel.
    Delivered,
    /// No consumer attached; the frame was dropped.
    NoConsumer,
    /// The consumer is behind; this frame was dropped.
    Full,
    /// The consumer went away and was detached; the frame was dropped.
    Disconnected,
}

impl DispatchOutcome {
    /// Check if the frame reached the consumer.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Hands accepted frames to at most one consumer without ever blocking
/// the receive loop.
#[derive(Debug, Default)]
pub struct FrameDispatcher {
    consumer: Option<mpsc::Sender<Frame>>,
}

impl FrameDispatcher {
    /// Create a dispatcher with no consumer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a consumer, replacing any previous one.
    pub fn attach(&mut self, consumer: mpsc::Sender<Frame>) {
        if self.consumer.replace(consumer).is_some() {
            debug!("replaced frame consumer");
        }
    }

    /// Detach the consumer, if any.
    pub fn detach(&mut self) {
        self.consumer = None;
    }

    /// Check if a consumer is attached.
    pub fn has_consumer(&self) -> bool {
        self.consumer.is_some()
    }

    /// Offer a frame to the consumer.
    ///
    /// When the channel is full the newest frame is the one dropped.
    pub fn dispatch(&mut self, frame: Frame) -> DispatchOutcome {
        let Some(consumer) = self.consumer.as_ref() else {
            return DispatchOutcome::NoConsumer;
        };

        match consumer.try_send(frame) {
            Ok(()) => DispatchOutcome::Delivered,
            Err(TrySendError::Full(frame)) => {
                debug!(sequence = frame.sequence(), "consumer behind, dropping frame");
                DispatchOutcome::Full
            }
            Err(TrySendError::Closed(_)) => {
                info!("frame consumer went away, detaching");
                self.consumer = None;
                DispatchOutcome::Disconnected
            }
        }
    }
}

/// Handle for receiving frames from the receiver.
#[derive(Debug)]
pub struct FrameReceiver {
    rx: mpsc::Receiver<Frame>,
}

impl FrameReceiver {
    /// Create a connected sender/receiver pair with room for `capacity`
    /// frames.
    pub fn channel(capacity: usize) -> (mpsc::Sender<Frame>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self { rx })
    }

    /// Receive the next frame.
    ///
    /// Returns `None` once the receiver has stopped or detached this
    /// consumer and the queue is drained.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Take a queued frame without waiting.
    pub fn try_recv(&mut self) -> Option<Frame> {
        match self.rx.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}
