// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Names of the forwarding tables shared with the rest of the switch, and the keys
//! of the entries that host interfaces own in them.

use attrmgr::Oid;
use fwd::{ActionDesc, EntryDesc, FieldMatch, Nid, PacketField};

/// Classifies trapped packets
pub const TRAP_TABLE: &str = "trap-table";
/// Maps trap ids to the host interface receiving the trapped packets
pub const TRAP_ID_TO_HOSTIF_TABLE: &str = "hostiftable";
/// Sends packets from a remote host interface out of the port it stands for
pub const HOSTIF_TO_PORT_TABLE: &str = "hostif-to-port";
/// Tags packets received by a port with the remote host interface standing for it
pub const PORT_TO_HOSTIF_TABLE: &str = "port-to-hostif";

pub const INPUT_IFACE_TABLE: &str = "input-iface";
pub const INGRESS_VRF_TABLE: &str = "ingress-vrf";
pub const PRE_INGRESS_ACTION_TABLE: &str = "pre-ingress-table";
pub const INGRESS_ACTION_TABLE: &str = "ingress-table";
pub const FIB_SELECTOR_TABLE: &str = "fib-selector";

/// The host port id meaning "whatever host interface is the default"
pub const WILDCARD_HOSTIF: Oid = Oid::NULL;

/// The actions that packets received by the switch go through
#[must_use]
pub fn forwarding_pipeline() -> Vec<ActionDesc> {
    [
        INPUT_IFACE_TABLE,
        INGRESS_VRF_TABLE,
        PRE_INGRESS_ACTION_TABLE,
        INGRESS_ACTION_TABLE,
        FIB_SELECTOR_TABLE,
    ]
    .into_iter()
    .map(ActionDesc::lookup)
    .collect()
}

pub(crate) fn hostif_to_port_key(hostif: Oid) -> EntryDesc {
    EntryDesc::exact(FieldMatch::exact_u64(
        PacketField::HostPortId,
        hostif.as_u64(),
    ))
}

pub(crate) fn port_to_hostif_key(port: Nid) -> EntryDesc {
    EntryDesc::exact(FieldMatch::exact_u64(
        PacketField::PacketPortInput,
        port.as_u64(),
    ))
}

pub(crate) fn trap_id_key(trap: Oid) -> EntryDesc {
    EntryDesc::exact(FieldMatch::exact_u64(PacketField::TrapId, trap.as_u64()))
}

/// Tag packets with a host interface
pub(crate) fn set_hostif(hostif: Oid) -> ActionDesc {
    ActionDesc::set_u64(PacketField::HostPortId, hostif.as_u64())
}

#[cfg(test)]
mod tests {
    use super::forwarding_pipeline;
    use fwd::ActionType;

    #[test]
    fn test_pipeline_starts_with_input_interface() {
        let pipeline = forwarding_pipeline();
        assert_eq!(pipeline.len(), 5);
        assert!(
            pipeline
                .iter()
                .all(|action| matches!(action.action, ActionType::Lookup(_)))
        );
        assert_eq!(
            pipeline[0].action,
            ActionType::Lookup("input-iface".to_string())
        );
    }
}
