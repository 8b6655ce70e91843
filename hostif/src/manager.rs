// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The host interface manager: translates host interface, trap and trap group
//! objects into forwarding engine ports and table entries.

use crate::config::{HostifConfig, NetdevType};
use crate::msg::{
    CreateHostifRequest, CreateHostifTableEntryRequest, CreateHostifTrapGroupRequest,
    CreateHostifTrapRequest, CreateHostifUserDefinedTrapRequest, HostPort,
    HostPortControlMessage, HostifTableEntryType, HostifType as WireHostifType,
    SetHostifAttributeRequest, SetHostifTrapGroupAttributeRequest, UserDefinedTrapType,
};
use crate::remote::RemotePortClient;
use crate::tables::{
    HOSTIF_TO_PORT_TABLE, PORT_TO_HOSTIF_TABLE, TRAP_ID_TO_HOSTIF_TABLE, TRAP_TABLE,
    WILDCARD_HOSTIF, forwarding_pipeline, hostif_to_port_key, port_to_hostif_key, set_hostif,
    trap_id_key,
};
use crate::trap::{trap_actions, trap_entries};
use crate::HostifError;
use attrmgr::{AttrError, AttributeStore, Attributes, HostifAttribute, HostifType, Oid, PortOperStatus};
use fwd::{
    ActionDesc, ForwardingEngine, Nid, ObjectId, PortDesc, PortEvent, PortKind, PortState,
    SWAP_ACTION_RELATED_PORT, TableEntryAddRequest, TableEntryRemoveRequest,
};
use ordermap::OrderMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn};

/// The forwarding entries that steer the packets of a remote netdev host interface
#[derive(Clone, Debug)]
pub(crate) struct RemoteEntries {
    /// nid of the port the host interface stands for
    nid: Nid,
    /// actions of packets coming from the host interface
    to_port: Vec<ActionDesc>,
}

/// A host interface created by the remote agent
#[derive(Clone, Debug)]
pub(crate) struct RemoteHostif {
    /// The message that created it, sent again whenever an agent attaches
    pub(crate) msg: HostPortControlMessage,
    entries: Option<RemoteEntries>,
}

#[derive(Default)]
pub(crate) struct HostifState {
    trap_to_hostif: HashMap<Oid, Oid>,
    group_to_queue: HashMap<Oid, u32>,
    pub(crate) remote_hostifs: OrderMap<Oid, RemoteHostif>,
    pub(crate) remote: Option<RemotePortClient>,
}

pub struct HostifManager {
    config: HostifConfig,
    attrs: Arc<dyn AttributeStore>,
    engine: Arc<dyn ForwardingEngine>,
    state: Mutex<HostifState>,
    closers: parking_lot::Mutex<Vec<CancellationToken>>,
}

fn hostif_type(wire: WireHostifType) -> Result<HostifType, HostifError> {
    match wire {
        WireHostifType::Genetlink => Ok(HostifType::Genetlink),
        WireHostifType::Netdev => Ok(HostifType::Netdev),
        other => Err(HostifError::InvalidArgument(format!(
            "unknown type {other:?}"
        ))),
    }
}

impl HostifManager {
    #[must_use]
    pub fn new(
        config: HostifConfig,
        attrs: Arc<dyn AttributeStore>,
        engine: Arc<dyn ForwardingEngine>,
    ) -> Self {
        debug!("{config}");
        Self {
            config,
            attrs,
            engine,
            state: Mutex::new(HostifState::default()),
            closers: parking_lot::Mutex::new(vec![]),
        }
    }

    #[must_use]
    pub fn config(&self) -> &HostifConfig {
        &self.config
    }

    pub(crate) fn engine(&self) -> &Arc<dyn ForwardingEngine> {
        &self.engine
    }

    pub(crate) async fn lock_state(&self) -> MutexGuard<'_, HostifState> {
        self.state.lock().await
    }

    /// Register the cancellation token of a control channel, so that a reset closes it.
    pub(crate) fn add_closer(&self, closer: CancellationToken) {
        let mut closers = self.closers.lock();
        closers.retain(|c| !c.is_cancelled());
        closers.push(closer);
    }

    fn cancel_closers(&self) {
        for closer in self.closers.lock().drain(..) {
            closer.cancel();
        }
    }

    /// Forget all traps, groups and remote host interfaces and close any control channel.
    pub async fn reset(&self) {
        info!("Resetting host interfaces");
        // closing channels first unblocks any pending exchange holding the state
        self.cancel_closers();
        let mut state = self.state.lock().await;
        self.cancel_closers();
        *state = HostifState::default();
    }

    fn publish(&self, desc: PortDesc) {
        let receivers = self.engine.port_events().publish(PortEvent::Created(desc));
        debug!("Port creation announced to {receivers} subscribers");
    }

    /// Create a host interface.
    #[instrument(level = "debug", skip(self))]
    pub async fn create_hostif(&self, req: &CreateHostifRequest) -> Result<Oid, HostifError> {
        let hostif_type = hostif_type(req.hostif_type)?;
        if self.config.remote_cpu_port {
            return self.create_remote_hostif(hostif_type, req).await;
        }
        let id = self.attrs.next_id();
        let oper_status = match hostif_type {
            HostifType::Genetlink => {
                let desc = PortDesc::new(
                    id.into(),
                    PortKind::Genetlink {
                        family: req.name.clone(),
                        group: req.genetlink_mcgrp_name.clone().unwrap_or_default(),
                    },
                );
                self.engine.port_create(desc.clone()).await?;
                self.publish(desc);
                None
            }
            HostifType::Netdev => {
                self.create_local_netdev(id, req).await?;
                Some(true)
            }
        };
        self.attrs.store(
            id,
            HostifAttribute {
                hostif_type: Some(hostif_type),
                name: Some(req.name.clone()),
                obj_id: Some(req.obj_id),
                oper_status,
            }
            .into(),
        )?;
        info!("Created {hostif_type} host interface {} as {id}", req.name);
        Ok(id)
    }

    async fn create_local_netdev(
        &self,
        id: Oid,
        req: &CreateHostifRequest,
    ) -> Result<(), HostifError> {
        // resolve attributes first, so that a failed lookup leaves no port behind
        let present = self.attrs.port_oper_status(req.obj_id)? != PortOperStatus::NotPresent;
        let cpu_port = self.attrs.switch_cpu_port(req.switch)?;

        let port_id = ObjectId::from(id);
        let device_name = req.name.clone();
        let kind = match self.config.netdev_type {
            NetdevType::Kernel => PortKind::Kernel { device_name },
            NetdevType::Tap => PortKind::Tap { device_name },
        };
        let desc = PortDesc::new(port_id.clone(), kind);
        self.engine.port_create(desc.clone()).await?;

        // if the port that the interface stands for exists, link both
        let bound = ObjectId::from(req.obj_id);
        if present {
            debug!("Linking {port_id} and {bound}");
            self.engine
                .attribute_update(&port_id, SWAP_ACTION_RELATED_PORT, bound.as_str())
                .await?;
            self.engine
                .attribute_update(&bound, SWAP_ACTION_RELATED_PORT, port_id.as_str())
                .await?;
        }

        // packets from the interface go out of its port, unless it stands for the cpu port
        let inputs = if cpu_port == req.obj_id {
            forwarding_pipeline()
        } else {
            vec![ActionDesc::swap_output_internal_external(), ActionDesc::output()]
        };
        self.engine.port_update_inputs(&port_id, inputs).await?;
        self.publish(desc);
        Ok(())
    }

    async fn create_remote_hostif(
        &self,
        hostif_type: HostifType,
        req: &CreateHostifRequest,
    ) -> Result<Oid, HostifError> {
        let mut state = self.state.lock().await;
        let client = state.remote.clone().ok_or_else(|| {
            HostifError::FailedPrecondition("remote port control not configured".to_string())
        })?;
        let cpu_port = match hostif_type {
            HostifType::Netdev => Some(self.attrs.switch_cpu_port(req.switch)?),
            HostifType::Genetlink => None,
        };

        let id = self.attrs.next_id();
        let port = match hostif_type {
            HostifType::Genetlink => HostPort::Genetlink {
                family: req.name.clone(),
                group: req.genetlink_mcgrp_name.clone().unwrap_or_default(),
            },
            HostifType::Netdev => HostPort::Netdev {
                name: req.name.clone(),
            },
        };
        let msg = HostPortControlMessage {
            create: true,
            port_id: id,
            dataplane_port: req.obj_id,
            port: Some(port),
        };

        let entries = match cpu_port {
            Some(cpu_port) => {
                let to_port = if cpu_port == req.obj_id {
                    forwarding_pipeline()
                } else {
                    vec![ActionDesc::transmit(req.obj_id.into())]
                };
                let nid = self.engine.object_nid(&req.obj_id.into()).await?;
                let entries = RemoteEntries { nid, to_port };
                self.install_remote_entries(id, &entries).await?;
                Some(entries)
            }
            None => None,
        };

        if let Err(e) = client.request(msg.clone()).await {
            warn!("Remote agent did not create host interface {id}: {e}");
            if let Some(entries) = &entries {
                if let Err(rollback) = self.remove_remote_entries(id, entries).await {
                    error!("Failed to remove entries of host interface {id}: {rollback}");
                }
            }
            return Err(e);
        }

        self.attrs.store(
            id,
            HostifAttribute {
                hostif_type: Some(hostif_type),
                name: Some(req.name.clone()),
                obj_id: Some(req.obj_id),
                oper_status: Some(true),
            }
            .into(),
        )?;
        state.remote_hostifs.insert(id, RemoteHostif { msg, entries });
        info!("Created remote {hostif_type} host interface {} as {id}", req.name);
        Ok(id)
    }

    async fn install_remote_entries(
        &self,
        hostif: Oid,
        entries: &RemoteEntries,
    ) -> Result<(), HostifError> {
        let ctx = self.engine.context_id();
        let to_port = TableEntryAddRequest::new(ctx.clone(), HOSTIF_TO_PORT_TABLE)
            .entry(hostif_to_port_key(hostif), entries.to_port.clone());
        self.engine.table_entry_add(to_port).await?;

        let to_hostif = TableEntryAddRequest::new(ctx.clone(), PORT_TO_HOSTIF_TABLE)
            .entry(port_to_hostif_key(entries.nid), vec![set_hostif(hostif)]);
        if let Err(e) = self.engine.table_entry_add(to_hostif).await {
            let undo = TableEntryRemoveRequest::new(ctx, HOSTIF_TO_PORT_TABLE)
                .entry(hostif_to_port_key(hostif));
            if let Err(undo_err) = self.engine.table_entry_remove(undo).await {
                error!("Failed to undo {HOSTIF_TO_PORT_TABLE} entry of {hostif}: {undo_err}");
            }
            return Err(e.into());
        }
        debug!("Installed entries of remote host interface {hostif}");
        Ok(())
    }

    async fn remove_remote_entries(
        &self,
        hostif: Oid,
        entries: &RemoteEntries,
    ) -> Result<(), HostifError> {
        let ctx = self.engine.context_id();
        let to_port = TableEntryRemoveRequest::new(ctx.clone(), HOSTIF_TO_PORT_TABLE)
            .entry(hostif_to_port_key(hostif));
        self.engine.table_entry_remove(to_port).await?;

        let to_hostif = TableEntryRemoveRequest::new(ctx.clone(), PORT_TO_HOSTIF_TABLE)
            .entry(port_to_hostif_key(entries.nid));
        if let Err(e) = self.engine.table_entry_remove(to_hostif).await {
            let redo = TableEntryAddRequest::new(ctx, HOSTIF_TO_PORT_TABLE)
                .entry(hostif_to_port_key(hostif), entries.to_port.clone());
            if let Err(redo_err) = self.engine.table_entry_add(redo).await {
                error!("Failed to restore {HOSTIF_TO_PORT_TABLE} entry of {hostif}: {redo_err}");
            }
            return Err(e.into());
        }
        debug!("Removed entries of remote host interface {hostif}");
        Ok(())
    }

    /// Remove a host interface. Only remote host interfaces can be removed.
    #[instrument(level = "debug", skip(self))]
    pub async fn remove_hostif(&self, oid: Oid) -> Result<(), HostifError> {
        if !self.config.remote_cpu_port {
            return Err(HostifError::FailedPrecondition(
                "only remote cpu port is supported".to_string(),
            ));
        }
        let mut state = self.state.lock().await;
        let client = state.remote.clone().ok_or_else(|| {
            HostifError::FailedPrecondition("remote port control not configured".to_string())
        })?;
        let registered = state
            .remote_hostifs
            .get(&oid)
            .ok_or(HostifError::NotFound(oid))?;
        let dataplane_port = registered.msg.dataplane_port;
        let to_port = registered.entries.as_ref().map(|e| e.to_port.clone());

        // the port may have been recreated since, so resolve its nid again
        let entries = match to_port {
            Some(to_port) => {
                let nid = self.engine.object_nid(&dataplane_port.into()).await?;
                Some(RemoteEntries { nid, to_port })
            }
            None => None,
        };

        if let Some(entries) = &entries {
            self.remove_remote_entries(oid, entries).await?;
        }
        let msg = HostPortControlMessage {
            create: false,
            port_id: oid,
            dataplane_port: Oid::NULL,
            port: None,
        };
        if let Err(e) = client.request(msg).await {
            warn!("Remote agent did not remove host interface {oid}: {e}");
            if let Some(entries) = &entries {
                if let Err(restore) = self.install_remote_entries(oid, entries).await {
                    error!("Failed to restore entries of host interface {oid}: {restore}");
                }
            }
            return Err(e);
        }
        state.remote_hostifs.remove(&oid);
        info!("Removed remote host interface {oid}");
        Ok(())
    }

    /// Set the attributes of a host interface. The state of remote interfaces is up to the agent.
    #[instrument(level = "debug", skip(self))]
    pub async fn set_hostif_attribute(
        &self,
        req: &SetHostifAttributeRequest,
    ) -> Result<(), HostifError> {
        let Some(oper_status) = req.oper_status else {
            return Ok(());
        };
        if self.config.remote_cpu_port {
            debug!("Ignoring oper status of remote host interface {}", req.oid);
            return Ok(());
        }
        let state = if oper_status {
            PortState::EnabledUp
        } else {
            PortState::DisabledDown
        };
        self.engine.port_state(&req.oid.into(), state).await?;
        self.attrs.store(
            req.oid,
            HostifAttribute {
                oper_status: Some(oper_status),
                ..Default::default()
            }
            .into(),
        )?;
        Ok(())
    }

    pub fn get_hostif_attribute(&self, oid: Oid) -> Result<HostifAttribute, HostifError> {
        match self.attrs.get(oid) {
            Some(Attributes::Hostif(attr)) => Ok(attr),
            Some(other) => Err(AttrError::KindMismatch {
                oid,
                expected: "hostif",
                found: other.kind(),
            }
            .into()),
            None => Err(HostifError::NotFound(oid)),
        }
    }

    /// Create a trap, sending the packets it catches to the cpu port of the switch.
    #[instrument(level = "debug", skip(self))]
    pub async fn create_hostif_trap(
        &self,
        req: &CreateHostifTrapRequest,
    ) -> Result<Oid, HostifError> {
        let cpu_port = self.attrs.switch_cpu_port(req.switch)?;
        let entries = trap_entries(req.trap_type)?;
        if entries.is_empty() {
            let id = self.attrs.next_id();
            debug!("Trap {id} of type {:?} needs no entries", req.trap_type);
            return Ok(id);
        }
        let actions = trap_actions(req.packet_action, &cpu_port.into(), entries.len())?;

        let mut add = TableEntryAddRequest::new(self.engine.context_id(), TRAP_TABLE);
        for entry in entries {
            add.append_entry(entry);
        }
        for entry_actions in actions {
            add.append_actions(entry_actions);
        }
        let num_entries = add.len();
        self.engine.table_entry_add(add).await?;
        let id = self.attrs.next_id();
        debug!(
            "Trap {id} of type {:?} installed with {num_entries} entries",
            req.trap_type
        );
        Ok(id)
    }

    // TODO: dispatch trapped packets to the queue of their group
    pub async fn create_hostif_trap_group(
        &self,
        req: &CreateHostifTrapGroupRequest,
    ) -> Result<Oid, HostifError> {
        let id = self.attrs.next_id();
        let queue = req.queue.unwrap_or_default();
        self.state.lock().await.group_to_queue.insert(id, queue);
        debug!("Trap group {id} uses queue {queue}");
        Ok(id)
    }

    pub async fn set_hostif_trap_group_attribute(
        &self,
        req: &SetHostifTrapGroupAttributeRequest,
    ) -> Result<(), HostifError> {
        let mut state = self.state.lock().await;
        let queue = state
            .group_to_queue
            .get_mut(&req.oid)
            .ok_or(HostifError::NotFound(req.oid))?;
        if let Some(update) = req.queue {
            *queue = update;
        }
        Ok(())
    }

    pub fn create_hostif_user_defined_trap(
        &self,
        req: &CreateHostifUserDefinedTrapRequest,
    ) -> Result<Oid, HostifError> {
        if req.trap_type != UserDefinedTrapType::Acl {
            return Err(HostifError::InvalidArgument(format!(
                "unsupported trap type: {:?}",
                req.trap_type
            )));
        }
        Ok(self.attrs.next_id())
    }

    /// Bind a trap to the host interface that receives the packets it catches.
    #[instrument(level = "debug", skip(self))]
    pub async fn create_hostif_table_entry(
        &self,
        req: &CreateHostifTableEntryRequest,
    ) -> Result<(), HostifError> {
        let hostif = match req.entry_type {
            HostifTableEntryType::TrapId => {
                let add = TableEntryAddRequest::new(
                    self.engine.context_id(),
                    TRAP_ID_TO_HOSTIF_TABLE,
                )
                .entry(trap_id_key(req.trap_id), vec![set_hostif(req.host_if)]);
                self.engine.table_entry_add(add).await?;
                req.host_if
            }
            HostifTableEntryType::Wildcard => WILDCARD_HOSTIF,
            other => {
                return Err(HostifError::InvalidArgument(format!(
                    "unsupported entry type: {other:?}"
                )));
            }
        };
        self.state
            .lock()
            .await
            .trap_to_hostif
            .insert(req.trap_id, hostif);
        Ok(())
    }

    /// The creation message of a remote host interface
    pub async fn remote_hostif(&self, oid: Oid) -> Option<HostPortControlMessage> {
        self.state
            .lock()
            .await
            .remote_hostifs
            .get(&oid)
            .map(|remote| remote.msg.clone())
    }

    /// The ids of the remote host interfaces, in creation order
    pub async fn remote_hostif_ids(&self) -> Vec<Oid> {
        self.state.lock().await.remote_hostifs.keys().copied().collect()
    }

    /// The host interface receiving the packets of a trap
    pub async fn trap_hostif(&self, trap: Oid) -> Option<Oid> {
        self.state.lock().await.trap_to_hostif.get(&trap).copied()
    }

    pub async fn trap_group_queue(&self, group: Oid) -> Option<u32> {
        self.state.lock().await.group_to_queue.get(&group).copied()
    }

    pub async fn is_remote_attached(&self) -> bool {
        self.state.lock().await.remote.is_some()
    }
}

#[cfg(test)]
mod tests {
    use crate::HostifError;
    use crate::msg::{
        CreateHostifRequest, CreateHostifTableEntryRequest, CreateHostifTrapGroupRequest,
        CreateHostifTrapRequest, CreateHostifUserDefinedTrapRequest, HostifTableEntryType,
        HostifType, PacketAction, SetHostifAttributeRequest,
        SetHostifTrapGroupAttributeRequest, TrapType, UserDefinedTrapType,
    };
    use crate::tables::{TRAP_ID_TO_HOSTIF_TABLE, TRAP_TABLE, WILDCARD_HOSTIF, forwarding_pipeline};
    use crate::testfixture::Fixture;
    use attrmgr::{AttributeStore, Oid, PortAttribute, PortOperStatus};
    use fwd::testing::FakeOp;
    use fwd::{
        ActionDesc, EntryDesc, FieldMatch, ForwardingEngine, ObjectId, PacketField, PortEvent,
        PortKind, PortState, SWAP_ACTION_RELATED_PORT,
    };
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    fn trap(fx: &Fixture, trap_type: TrapType) -> CreateHostifTrapRequest {
        CreateHostifTrapRequest {
            switch: fx.switch,
            trap_type,
            packet_action: PacketAction::Trap,
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_oper_status_roundtrip() {
        let fx = Fixture::local();
        for req in [
            fx.netdev("eth1", fx.port),
            fx.genetlink("psample", "packets"),
        ] {
            let id = fx.manager.create_hostif(&req).await.unwrap();
            for oper_status in [true, true, false, false, true] {
                let set = SetHostifAttributeRequest {
                    oid: id,
                    oper_status: Some(oper_status),
                };
                fx.manager.set_hostif_attribute(&set).await.unwrap();
                let attr = fx.manager.get_hostif_attribute(id).unwrap();
                assert_eq!(attr.oper_status, Some(oper_status));
                let expected = if oper_status {
                    PortState::EnabledUp
                } else {
                    PortState::DisabledDown
                };
                assert_eq!(fx.engine.port(&id.into()).unwrap().state, Some(expected));
            }
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_netdev_inputs() {
        let fx = Fixture::local();
        let to_port = fx
            .manager
            .create_hostif(&fx.netdev("eth1", fx.port))
            .await
            .unwrap();
        let to_cpu = fx
            .manager
            .create_hostif(&fx.netdev("cpu0", fx.cpu))
            .await
            .unwrap();

        let port = fx.engine.port(&to_port.into()).unwrap();
        assert_eq!(
            port.inputs,
            vec![ActionDesc::swap_output_internal_external(), ActionDesc::output()]
        );
        assert_eq!(
            port.desc.kind,
            PortKind::Tap {
                device_name: "eth1".to_string()
            }
        );
        assert_eq!(
            fx.engine.port(&to_cpu.into()).unwrap().inputs,
            forwarding_pipeline()
        );
        assert_eq!(
            fx.manager.get_hostif_attribute(to_port).unwrap().oper_status,
            Some(true)
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn test_netdev_links_present_port() {
        let fx = Fixture::local();
        let id = fx
            .manager
            .create_hostif(&fx.netdev("eth1", fx.port))
            .await
            .unwrap();
        let hostif_port = fx.engine.port(&id.into()).unwrap();
        assert_eq!(
            hostif_port.attrs.get(SWAP_ACTION_RELATED_PORT),
            Some(&fx.port.as_u64().to_string())
        );
        let port = fx.engine.port(&fx.port.into()).unwrap();
        assert_eq!(
            port.attrs.get(SWAP_ACTION_RELATED_PORT),
            Some(&id.as_u64().to_string())
        );

        // no link if the port is not present
        fx.attrs
            .store(
                fx.port,
                PortAttribute {
                    oper_status: Some(PortOperStatus::NotPresent),
                }
                .into(),
            )
            .unwrap();
        let other = fx
            .manager
            .create_hostif(&fx.netdev("eth2", fx.port))
            .await
            .unwrap();
        assert!(fx.engine.port(&other.into()).unwrap().attrs.is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_port_creation_is_announced() {
        let fx = Fixture::local();
        let mut events = fx.engine.port_events().subscribe();
        let id = fx
            .manager
            .create_hostif(&fx.genetlink("psample", "packets"))
            .await
            .unwrap();
        let PortEvent::Created(desc) = events.recv().await.unwrap();
        assert_eq!(desc.port_id, ObjectId::from(id));
        assert_eq!(
            desc.kind,
            PortKind::Genetlink {
                family: "psample".to_string(),
                group: "packets".to_string()
            }
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn test_create_hostif_failures() {
        let fx = Fixture::local();
        let mut req = fx.netdev("eth1", fx.port);
        req.hostif_type = HostifType::Fd;
        assert!(matches!(
            fx.manager.create_hostif(&req).await,
            Err(HostifError::InvalidArgument(_))
        ));

        fx.engine.fail(FakeOp::PortCreate);
        assert!(matches!(
            fx.manager.create_hostif(&fx.netdev("eth1", fx.port)).await,
            Err(HostifError::Forwarding(_))
        ));
        fx.engine.recover(FakeOp::PortCreate);

        // the bound object has no oper status
        let unknown = fx.attrs.next_id();
        assert!(matches!(
            fx.manager.create_hostif(&fx.netdev("eth2", unknown)).await,
            Err(HostifError::Internal(_))
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failed_lookup_creates_no_port() {
        let fx = Fixture::local();
        let ports = fx.engine.num_ports();
        let entries = fx.engine.num_entries();

        // the bound object has no oper status
        let unknown = fx.attrs.next_id();
        assert!(matches!(
            fx.manager.create_hostif(&fx.netdev("eth1", unknown)).await,
            Err(HostifError::Internal(_))
        ));
        assert_eq!(fx.engine.num_ports(), ports);

        // the switch has no cpu port
        let mut req = fx.netdev("eth1", fx.port);
        req.switch = fx.attrs.next_id();
        assert!(fx.manager.create_hostif(&req).await.is_err());
        assert_eq!(fx.engine.num_ports(), ports);
        assert_eq!(fx.engine.num_entries(), entries);

        // a valid request still goes through
        fx.manager
            .create_hostif(&fx.netdev("eth1", fx.port))
            .await
            .unwrap();
        assert_eq!(fx.engine.num_ports(), ports + 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_local_remove_is_unsupported() {
        let fx = Fixture::local();
        let id = fx
            .manager
            .create_hostif(&fx.netdev("eth1", fx.port))
            .await
            .unwrap();
        assert!(matches!(
            fx.manager.remove_hostif(id).await,
            Err(HostifError::FailedPrecondition(_))
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_trap_entries() {
        let fx = Fixture::local();
        let cpu = ObjectId::from(fx.cpu);
        let cases = [
            (TrapType::ArpRequest, PacketField::EtherType, vec![0x08, 0x06]),
            (TrapType::ArpResponse, PacketField::EtherType, vec![0x08, 0x06]),
            (
                TrapType::Udld,
                PacketField::EtherMacDst,
                vec![0x01, 0x00, 0x0c, 0xcc, 0xcc, 0xcc],
            ),
            (TrapType::Lldp, PacketField::EtherType, vec![0x88, 0xcc]),
            (
                TrapType::Ipv6NeighborDiscovery,
                PacketField::EtherMacDst,
                vec![0x33, 0x33, 0, 0, 0, 0],
            ),
            (
                TrapType::Lacp,
                PacketField::EtherMacDst,
                vec![0x01, 0x80, 0xc2, 0x00, 0x00, 0x02],
            ),
        ];
        let mut expected = 0;
        for (trap_type, field, bytes) in cases {
            fx.manager
                .create_hostif_trap(&trap(&fx, trap_type))
                .await
                .unwrap();
            expected += 1;
            let table = fx.engine.table(TRAP_TABLE);
            assert_eq!(table.len(), expected);
            let (entry, actions) = table.last().unwrap();
            let EntryDesc::Flow(fields) = entry else {
                panic!("Expected a flow entry");
            };
            assert_eq!(fields[0].field, field);
            assert_eq!(fields[0].bytes, bytes);
            assert_eq!(actions, &vec![ActionDesc::transmit_immediate(cpu.clone())]);
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_bgp_trap_entries() {
        for trap_type in [TrapType::Bgp, TrapType::Bgpv6] {
            let fx = Fixture::local();
            let cpu = ObjectId::from(fx.cpu);
            fx.manager
                .create_hostif_trap(&trap(&fx, trap_type))
                .await
                .unwrap();
            let transmit = vec![ActionDesc::transmit_immediate(cpu.clone())];
            assert_eq!(
                fx.engine.table(TRAP_TABLE),
                vec![
                    (
                        EntryDesc::flow(FieldMatch::masked(
                            PacketField::L4PortSrc,
                            &[0, 179],
                            &[0xff, 0xff]
                        )),
                        transmit.clone()
                    ),
                    (
                        EntryDesc::flow(FieldMatch::masked(
                            PacketField::L4PortDst,
                            &[0, 179],
                            &[0xff, 0xff]
                        )),
                        transmit
                    ),
                ]
            );
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_ip2me_trap_has_no_entries() {
        let fx = Fixture::local();
        let id = fx
            .manager
            .create_hostif_trap(&trap(&fx, TrapType::Ip2me))
            .await
            .unwrap();
        assert!(!id.is_null());
        assert_eq!(fx.engine.num_entries(), 0);
        assert_eq!(fx.engine.num_requests(), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_trap_failures() {
        let fx = Fixture::local();
        assert!(matches!(
            fx.manager
                .create_hostif_trap(&trap(&fx, TrapType::Stp))
                .await,
            Err(HostifError::InvalidArgument(_))
        ));
        let mut req = trap(&fx, TrapType::Lldp);
        req.packet_action = PacketAction::Forward;
        assert!(matches!(
            fx.manager.create_hostif_trap(&req).await,
            Err(HostifError::InvalidArgument(_))
        ));
        let mut req = trap(&fx, TrapType::Lldp);
        req.switch = fx.port;
        assert!(matches!(
            fx.manager.create_hostif_trap(&req).await,
            Err(HostifError::Internal(_))
        ));
        assert_eq!(fx.engine.num_entries(), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_trap_groups() {
        let fx = Fixture::local();
        let group = fx
            .manager
            .create_hostif_trap_group(&CreateHostifTrapGroupRequest {
                switch: fx.switch,
                queue: Some(4),
            })
            .await
            .unwrap();
        assert_eq!(fx.manager.trap_group_queue(group).await, Some(4));

        let mut set = SetHostifTrapGroupAttributeRequest {
            oid: group,
            queue: Some(7),
        };
        fx.manager.set_hostif_trap_group_attribute(&set).await.unwrap();
        assert_eq!(fx.manager.trap_group_queue(group).await, Some(7));

        set.oid = Oid::new(1000);
        assert!(matches!(
            fx.manager.set_hostif_trap_group_attribute(&set).await,
            Err(HostifError::NotFound(_))
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_user_defined_trap() {
        let fx = Fixture::local();
        let mut req = CreateHostifUserDefinedTrapRequest {
            switch: fx.switch,
            trap_type: UserDefinedTrapType::Acl,
        };
        let first = fx.manager.create_hostif_user_defined_trap(&req).unwrap();
        let second = fx.manager.create_hostif_user_defined_trap(&req).unwrap();
        assert!(second > first);
        req.trap_type = UserDefinedTrapType::Router;
        assert!(matches!(
            fx.manager.create_hostif_user_defined_trap(&req),
            Err(HostifError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_hostif_table_entries() {
        let fx = Fixture::local();
        let hostif = fx
            .manager
            .create_hostif(&fx.netdev("eth1", fx.port))
            .await
            .unwrap();
        let trap_id = Oid::new(500);
        let mut req = CreateHostifTableEntryRequest {
            switch: fx.switch,
            entry_type: HostifTableEntryType::TrapId,
            trap_id,
            host_if: hostif,
        };
        fx.manager.create_hostif_table_entry(&req).await.unwrap();
        assert_eq!(fx.manager.trap_hostif(trap_id).await, Some(hostif));
        assert_eq!(
            fx.engine.table(TRAP_ID_TO_HOSTIF_TABLE),
            vec![(
                EntryDesc::exact(FieldMatch::exact_u64(PacketField::TrapId, 500)),
                vec![ActionDesc::set_u64(PacketField::HostPortId, hostif.as_u64())]
            )]
        );

        // a failed entry is not recorded
        fx.engine.fail(FakeOp::TableEntryAdd);
        req.trap_id = Oid::new(501);
        assert!(fx.manager.create_hostif_table_entry(&req).await.is_err());
        assert_eq!(fx.manager.trap_hostif(req.trap_id).await, None);
        fx.engine.recover(FakeOp::TableEntryAdd);

        req.entry_type = HostifTableEntryType::Wildcard;
        req.trap_id = Oid::new(502);
        fx.manager.create_hostif_table_entry(&req).await.unwrap();
        assert_eq!(fx.manager.trap_hostif(req.trap_id).await, Some(WILDCARD_HOSTIF));
        assert_eq!(fx.engine.table(TRAP_ID_TO_HOSTIF_TABLE).len(), 1);

        req.entry_type = HostifTableEntryType::Vlan;
        assert!(matches!(
            fx.manager.create_hostif_table_entry(&req).await,
            Err(HostifError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_reset_clears_maps() {
        let fx = Fixture::local();
        let group = fx
            .manager
            .create_hostif_trap_group(&CreateHostifTrapGroupRequest {
                switch: fx.switch,
                queue: None,
            })
            .await
            .unwrap();
        let req = CreateHostifTableEntryRequest {
            switch: fx.switch,
            entry_type: HostifTableEntryType::Wildcard,
            trap_id: Oid::new(42),
            host_if: Oid::NULL,
        };
        fx.manager.create_hostif_table_entry(&req).await.unwrap();
        assert_eq!(fx.manager.trap_group_queue(group).await, Some(0));

        fx.manager.reset().await;
        assert_eq!(fx.manager.trap_group_queue(group).await, None);
        assert_eq!(fx.manager.trap_hostif(Oid::new(42)).await, None);
        assert!(logs_contain("Resetting host interfaces"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_get_unknown_hostif() {
        let fx = Fixture::local();
        assert!(matches!(
            fx.manager.get_hostif_attribute(Oid::new(999)),
            Err(HostifError::NotFound(_))
        ));
        assert!(matches!(
            fx.manager.get_hostif_attribute(fx.port),
            Err(HostifError::Internal(_))
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_netdev_kernel_ports() {
        let fx = Fixture::with_config(
            crate::HostifConfigBuilder::default()
                .netdev_type(crate::NetdevType::Kernel)
                .build()
                .unwrap(),
        );
        let id = fx
            .manager
            .create_hostif(&fx.netdev("eth1", fx.port))
            .await
            .unwrap();
        assert_eq!(
            fx.engine.port(&id.into()).unwrap().desc.kind,
            PortKind::Kernel {
                device_name: "eth1".to_string()
            }
        );
    }
}
