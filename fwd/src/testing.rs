// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! An in-memory [`ForwardingEngine`] that records every request it receives.
//! It keeps ports and table entries, so that tests can check what was programmed,
//! and it can be told to fail specific operations.

#![allow(clippy::missing_panics_doc)]

use crate::{
    ActionDesc, ContextId, CpuFrame, CpuPortSink, EntryDesc, ForwardingEngine, FwdError, Nid,
    ObjectId, PacketHeaderId, PortAction, PortDesc, PortEventBus, PortKind, PortState,
    TableEntryAddRequest, TableEntryRemoveRequest,
};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::Notify;
use tracing::debug;

/// Operations of the fake engine that can be made to fail
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FakeOp {
    PortCreate,
    PortUpdate,
    PortState,
    TableEntryAdd,
    TableEntryRemove,
    ObjectNid,
    AttributeUpdate,
    Inject,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FakePort {
    pub desc: PortDesc,
    pub nid: Nid,
    pub inputs: Vec<ActionDesc>,
    pub state: Option<PortState>,
    pub attrs: HashMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InjectedPacket {
    pub port: ObjectId,
    pub header: PacketHeaderId,
    pub frame: Bytes,
    pub actions: Vec<ActionDesc>,
    pub immediate: bool,
    pub direction: PortAction,
}

#[derive(Default)]
struct FakeState {
    ports: BTreeMap<ObjectId, FakePort>,
    tables: HashMap<String, Vec<(EntryDesc, Vec<ActionDesc>)>>,
    next_nid: u64,
    injected: Vec<InjectedPacket>,
    sink: Option<CpuPortSink>,
    failing: HashSet<FakeOp>,
    requests: usize,
}

impl FakeState {
    fn check(&mut self, op: FakeOp) -> Result<(), FwdError> {
        self.requests += 1;
        if self.failing.contains(&op) {
            Err(FwdError::Failure(format!("injected failure of {op:?}")))
        } else {
            Ok(())
        }
    }
    fn add_port(&mut self, desc: PortDesc) -> Result<Nid, FwdError> {
        if self.ports.contains_key(&desc.port_id) {
            return Err(FwdError::Exists(desc.port_id));
        }
        self.next_nid += 1;
        let nid = Nid::new(self.next_nid);
        self.ports.insert(
            desc.port_id.clone(),
            FakePort {
                desc,
                nid,
                inputs: vec![],
                state: None,
                attrs: HashMap::new(),
            },
        );
        Ok(nid)
    }
    fn port_mut(&mut self, port: &ObjectId) -> Result<&mut FakePort, FwdError> {
        self.ports
            .get_mut(port)
            .ok_or_else(|| FwdError::NotFound(port.clone()))
    }
}

pub struct FakeEngine {
    context: ContextId,
    state: Mutex<FakeState>,
    events: PortEventBus,
    injected: Notify,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            context: ContextId::new("fake"),
            state: Mutex::new(FakeState::default()),
            events: PortEventBus::new(),
            injected: Notify::new(),
        }
    }

    /// Build an engine that has a CPU port with the given id.
    #[must_use]
    pub fn with_cpu_port(cpu_port: impl Into<String>) -> Self {
        let engine = Self::new();
        engine
            .add_port(PortDesc::new(ObjectId::new(cpu_port), PortKind::Cpu))
            .expect("Fresh engine can't have duplicate ports");
        engine
    }

    /// Add a port without going through the [`ForwardingEngine`] interface
    pub fn add_port(&self, desc: PortDesc) -> Result<Nid, FwdError> {
        self.state.lock().add_port(desc)
    }

    pub fn fail(&self, op: FakeOp) {
        self.state.lock().failing.insert(op);
    }

    pub fn recover(&self, op: FakeOp) {
        self.state.lock().failing.remove(&op);
    }

    #[must_use]
    pub fn port(&self, port: &ObjectId) -> Option<FakePort> {
        self.state.lock().ports.get(port).cloned()
    }

    #[must_use]
    pub fn num_ports(&self) -> usize {
        self.state.lock().ports.len()
    }

    #[must_use]
    pub fn table(&self, table: &str) -> Vec<(EntryDesc, Vec<ActionDesc>)> {
        self.state
            .lock()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// The total number of entries over all tables
    #[must_use]
    pub fn num_entries(&self) -> usize {
        self.state.lock().tables.values().map(Vec::len).sum()
    }

    /// The number of requests received through the [`ForwardingEngine`] interface
    #[must_use]
    pub fn num_requests(&self) -> usize {
        self.state.lock().requests
    }

    #[must_use]
    pub fn injected(&self) -> Vec<InjectedPacket> {
        self.state.lock().injected.clone()
    }

    /// Wait until at least `count` packets have been injected
    pub async fn wait_injected(&self, count: usize) -> Vec<InjectedPacket> {
        loop {
            let notified = self.injected.notified();
            {
                let state = self.state.lock();
                if state.injected.len() >= count {
                    return state.injected.clone();
                }
            }
            notified.await;
        }
    }

    #[must_use]
    pub fn has_cpu_sink(&self) -> bool {
        self.state
            .lock()
            .sink
            .as_ref()
            .is_some_and(|sink| !sink.is_cancelled())
    }

    /// Emulate a frame reaching the CPU port
    pub fn deliver_to_cpu(&self, host_port: u64, frame: Bytes) -> Result<(), FwdError> {
        let state = self.state.lock();
        let Some(sink) = &state.sink else {
            return Err(FwdError::SinkClosed);
        };
        sink.deliver(CpuFrame { host_port, frame })
    }
}

#[async_trait]
impl ForwardingEngine for FakeEngine {
    fn context_id(&self) -> ContextId {
        self.context.clone()
    }

    async fn port_create(&self, desc: PortDesc) -> Result<(), FwdError> {
        let mut state = self.state.lock();
        state.check(FakeOp::PortCreate)?;
        debug!("Creating {desc}");
        state.add_port(desc).map(|_| ())
    }

    async fn port_update_inputs(
        &self,
        port: &ObjectId,
        inputs: Vec<ActionDesc>,
    ) -> Result<(), FwdError> {
        let mut state = self.state.lock();
        state.check(FakeOp::PortUpdate)?;
        state.port_mut(port)?.inputs = inputs;
        Ok(())
    }

    async fn port_state(&self, port: &ObjectId, port_state: PortState) -> Result<(), FwdError> {
        let mut state = self.state.lock();
        state.check(FakeOp::PortState)?;
        state.port_mut(port)?.state = Some(port_state);
        Ok(())
    }

    async fn table_entry_add(&self, req: TableEntryAddRequest) -> Result<(), FwdError> {
        let mut state = self.state.lock();
        state.check(FakeOp::TableEntryAdd)?;
        req.validate()?;
        let table = req.table.clone();
        let entries = state.tables.entry(table.clone()).or_default();
        for (key, _) in req.iter() {
            if entries.iter().any(|(existing, _)| existing == key) {
                return Err(FwdError::Invalid(format!("duplicate entry {key} in {table}")));
            }
        }
        entries.extend(req.into_parts());
        Ok(())
    }

    async fn table_entry_remove(&self, req: TableEntryRemoveRequest) -> Result<(), FwdError> {
        let mut state = self.state.lock();
        state.check(FakeOp::TableEntryRemove)?;
        let Some(entries) = state.tables.get_mut(&req.table) else {
            return Err(FwdError::NoSuchTable(req.table));
        };
        if !req
            .entries
            .iter()
            .all(|key| entries.iter().any(|(existing, _)| existing == key))
        {
            return Err(FwdError::NoSuchEntry(req.table));
        }
        entries.retain(|(existing, _)| !req.entries.contains(existing));
        Ok(())
    }

    async fn object_nid(&self, object: &ObjectId) -> Result<Nid, FwdError> {
        let mut state = self.state.lock();
        state.check(FakeOp::ObjectNid)?;
        Ok(state.port_mut(object)?.nid)
    }

    async fn attribute_update(
        &self,
        object: &ObjectId,
        attr: &str,
        value: &str,
    ) -> Result<(), FwdError> {
        let mut state = self.state.lock();
        state.check(FakeOp::AttributeUpdate)?;
        state
            .port_mut(object)?
            .attrs
            .insert(attr.to_string(), value.to_string());
        Ok(())
    }

    async fn inject_packet(
        &self,
        port: &ObjectId,
        header: PacketHeaderId,
        frame: Bytes,
        actions: Vec<ActionDesc>,
        immediate: bool,
        direction: PortAction,
    ) -> Result<(), FwdError> {
        {
            let mut state = self.state.lock();
            state.check(FakeOp::Inject)?;
            state.port_mut(port)?;
            state.injected.push(InjectedPacket {
                port: port.clone(),
                header,
                frame,
                actions,
                immediate,
                direction,
            });
        }
        self.injected.notify_waiters();
        Ok(())
    }

    fn cpu_port(&self) -> Option<ObjectId> {
        self.state
            .lock()
            .ports
            .values()
            .find(|port| port.desc.kind == PortKind::Cpu)
            .map(|port| port.desc.port_id.clone())
    }

    fn set_cpu_port_sink(&self, sink: CpuPortSink) {
        if let Some(previous) = self.state.lock().sink.replace(sink) {
            previous.cancel();
        }
    }

    fn port_events(&self) -> &PortEventBus {
        &self.events
    }
}
