use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use forklift_core::OperationConfig;

/// Control-surface commands for the forklift controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Reset,
    Configure(OperationConfig),
    /// Reconfigure with source and destination exchanged.
    SwapRoute,
}

/// Cloneable handle for sending [`Command`]s from any thread.
#[derive(Debug, Clone)]
pub struct CommandBus {
    tx: mpsc::UnboundedSender<Command>,
}

impl CommandBus {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Returns false once the controller has gone away.
    pub fn send(&self, command: Command) -> bool {
        match self.tx.send(command) {
            Ok(()) => true,
            Err(e) => {
                warn!(command = ?e.0, "Controller is gone, command dropped");
                false
            }
        }
    }
}

/// Broadcast topic with bounded capacity.
/// Slow subscribers lag and skip ahead rather than blocking the publisher.
#[derive(Debug, Clone)]
pub struct Topic<T> {
    tx: broadcast::Sender<Arc<T>>,
}

impl<T: Send + Sync + 'static> Topic<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish to current subscribers and return how many received it.
    pub fn publish(&self, msg: T) -> usize {
        match self.tx.send(Arc::new(msg)) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("No subscribers on topic");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<T>> {
        self.tx.subscribe()
    }
}
