// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The forwarding engine interface

use crate::{
    ActionDesc, ContextId, Nid, ObjectId, PortAction, PortDesc, PortEventBus, PortState,
    TableEntryAddRequest, TableEntryRemoveRequest,
};
use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum FwdError {
    #[error("No such object: {0}")]
    NotFound(ObjectId),
    #[error("Object already exists: {0}")]
    Exists(ObjectId),
    #[error("No such table: {0}")]
    NoSuchTable(String),
    #[error("No such entry in table {0}")]
    NoSuchEntry(String),
    #[error("Invalid request: {0}")]
    Invalid(String),
    #[error("Packet sink is full")]
    SinkFull,
    #[error("Packet sink is closed")]
    SinkClosed,
    #[error("Forwarding engine failure: {0}")]
    Failure(String),
}

/// The header a raw injected frame starts with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketHeaderId {
    Ethernet,
}

/// A frame that reached the CPU port, together with the host interface it was classified to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CpuFrame {
    pub host_port: u64,
    pub frame: Bytes,
}

pub type SinkFn = Box<dyn Fn(CpuFrame) -> Result<(), FwdError> + Send + Sync>;

/// The consumer of the frames that reach the CPU port. A sink stays active until its
/// cancellation token fires: the engine fires it when the sink gets replaced or fails.
pub struct CpuPortSink {
    send: SinkFn,
    cancel: CancellationToken,
}

impl std::fmt::Debug for CpuPortSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuPortSink")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl CpuPortSink {
    #[must_use]
    pub fn new(send: SinkFn, cancel: CancellationToken) -> Self {
        Self { send, cancel }
    }

    /// Hand a frame to the sink. A full sink drops the frame; any other failure cancels the sink.
    pub fn deliver(&self, frame: CpuFrame) -> Result<(), FwdError> {
        if self.cancel.is_cancelled() {
            return Err(FwdError::SinkClosed);
        }
        match (self.send)(frame) {
            Ok(()) => Ok(()),
            Err(FwdError::SinkFull) => Err(FwdError::SinkFull),
            Err(e) => {
                debug!("Cancelling cpu port sink: {e}");
                self.cancel.cancel();
                Err(e)
            }
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Requests that can be issued to a forwarding engine. All requests refer to the single
/// forwarding context identified by [`ForwardingEngine::context_id`].
#[async_trait]
pub trait ForwardingEngine: Send + Sync {
    fn context_id(&self) -> ContextId;

    async fn port_create(&self, desc: PortDesc) -> Result<(), FwdError>;

    /// Replace the actions that packets received by a port go through.
    async fn port_update_inputs(
        &self,
        port: &ObjectId,
        inputs: Vec<ActionDesc>,
    ) -> Result<(), FwdError>;

    async fn port_state(&self, port: &ObjectId, state: PortState) -> Result<(), FwdError>;

    async fn table_entry_add(&self, req: TableEntryAddRequest) -> Result<(), FwdError>;

    async fn table_entry_remove(&self, req: TableEntryRemoveRequest) -> Result<(), FwdError>;

    /// Resolve an object to its internal numeric id
    async fn object_nid(&self, object: &ObjectId) -> Result<Nid, FwdError>;

    async fn attribute_update(
        &self,
        object: &ObjectId,
        attr: &str,
        value: &str,
    ) -> Result<(), FwdError>;

    /// Inject a raw frame into a port. The frame first goes through `actions`.
    async fn inject_packet(
        &self,
        port: &ObjectId,
        header: PacketHeaderId,
        frame: Bytes,
        actions: Vec<ActionDesc>,
        immediate: bool,
        direction: PortAction,
    ) -> Result<(), FwdError>;

    /// The id of the CPU port of the context, if one exists
    fn cpu_port(&self) -> Option<ObjectId>;

    /// Install the sink for frames reaching the CPU port. Any previous sink is cancelled.
    fn set_cpu_port_sink(&self, sink: CpuPortSink);

    /// The bus where the creation of ports is announced
    fn port_events(&self) -> &PortEventBus;
}
