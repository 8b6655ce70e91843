// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Announcements of port creation.
//!
//! Components that create ports publish them here. Anybody interested in learning about
//! new ports (e.g. a packet sink that needs to describe ports to its client) subscribes.

use crate::PortDesc;
use tokio::sync::broadcast;
use tracing::trace;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PortEvent {
    Created(PortDesc),
}

#[derive(Debug)]
pub struct PortEventBus {
    tx: broadcast::Sender<PortEvent>,
}

impl Default for PortEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl PortEventBus {
    /// Max events retained for a lagging subscriber
    pub const CAPACITY: usize = 256;

    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(Self::CAPACITY);
        Self { tx }
    }

    /// Publish an event. Returns the number of subscribers that will see it.
    /// Publishing never blocks and is a no-op if nobody listens.
    pub fn publish(&self, event: PortEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                trace!("No subscribers for port event {event:?}");
                0
            }
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PortEvent> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn subscribers(&self) -> usize {
        self.tx.receiver_count()
    }
}
