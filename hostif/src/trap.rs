// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Compilation of traps into trap table entries

use crate::HostifError;
use crate::msg::{PacketAction, TrapType};
use fwd::{ActionDesc, EntryDesc, FieldMatch, ObjectId, PacketField};

pub const ETHER_TYPE_ARP: [u8; 2] = [0x08, 0x06];
pub const ETHER_TYPE_LLDP: [u8; 2] = [0x88, 0xcc];
pub const UDLD_DST_MAC: [u8; 6] = [0x01, 0x00, 0x0c, 0xcc, 0xcc, 0xcc];
pub const LACP_DST_MAC: [u8; 6] = [0x01, 0x80, 0xc2, 0x00, 0x00, 0x02];
/// Neighbor discovery goes to IPv6 multicast MACs
pub const ND_DST_MAC: [u8; 6] = [0x33, 0x33, 0x00, 0x00, 0x00, 0x00];
pub const ND_DST_MAC_MASK: [u8; 6] = [0xff, 0xff, 0x00, 0x00, 0x00, 0x00];
pub const BGP_PORT: u16 = 179;

const FULL_MAC_MASK: [u8; 6] = [0xff; 6];
const FULL_ETHER_TYPE_MASK: [u8; 2] = [0xff; 2];

fn flow(field: PacketField, value: &[u8], mask: &[u8]) -> EntryDesc {
    EntryDesc::flow(FieldMatch::masked(field, value, mask))
}

/// The trap table keys that catch the packets of a trap type. IP2ME traps
/// have none: packets to local addresses are caught by routes to the cpu.
pub fn trap_entries(trap_type: TrapType) -> Result<Vec<EntryDesc>, HostifError> {
    let entries = match trap_type {
        TrapType::ArpRequest | TrapType::ArpResponse => vec![flow(
            PacketField::EtherType,
            &ETHER_TYPE_ARP,
            &FULL_ETHER_TYPE_MASK,
        )],
        TrapType::Udld => vec![flow(PacketField::EtherMacDst, &UDLD_DST_MAC, &FULL_MAC_MASK)],
        TrapType::Lldp => vec![flow(
            PacketField::EtherType,
            &ETHER_TYPE_LLDP,
            &FULL_ETHER_TYPE_MASK,
        )],
        TrapType::Ipv6NeighborDiscovery => vec![flow(
            PacketField::EtherMacDst,
            &ND_DST_MAC,
            &ND_DST_MAC_MASK,
        )],
        TrapType::Lacp => vec![flow(PacketField::EtherMacDst, &LACP_DST_MAC, &FULL_MAC_MASK)],
        TrapType::Ip2me => vec![],
        // TODO: only match packets sent to the management address
        TrapType::Bgp | TrapType::Bgpv6 => vec![
            EntryDesc::flow(FieldMatch::masked_u16(PacketField::L4PortSrc, BGP_PORT)),
            EntryDesc::flow(FieldMatch::masked_u16(PacketField::L4PortDst, BGP_PORT)),
        ],
        TrapType::Unspecified | TrapType::Stp | TrapType::Dhcp => {
            return Err(HostifError::InvalidArgument(format!(
                "unknown trap type: {trap_type:?}"
            )));
        }
    };
    Ok(entries)
}

/// The actions of each of the `count` entries of a trap. Trapping and copying both
/// transmit to the cpu port immediately, skipping any pending actions.
pub fn trap_actions(
    action: PacketAction,
    cpu_port: &ObjectId,
    count: usize,
) -> Result<Vec<Vec<ActionDesc>>, HostifError> {
    match action {
        PacketAction::Trap | PacketAction::Copy => Ok((0..count)
            .map(|_| vec![ActionDesc::transmit_immediate(cpu_port.clone())])
            .collect()),
        other => Err(HostifError::InvalidArgument(format!(
            "unknown action type: {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::{trap_actions, trap_entries};
    use crate::HostifError;
    use crate::msg::{PacketAction, TrapType};
    use fwd::{ActionDesc, EntryDesc, FieldMatch, ObjectId, PacketField};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_entry_constants() {
        assert_eq!(
            trap_entries(TrapType::ArpRequest).unwrap(),
            vec![EntryDesc::flow(FieldMatch::masked(
                PacketField::EtherType,
                &[0x08, 0x06],
                &[0xff, 0xff]
            ))]
        );
        assert_eq!(
            trap_entries(TrapType::Ipv6NeighborDiscovery).unwrap(),
            vec![EntryDesc::flow(FieldMatch::masked(
                PacketField::EtherMacDst,
                &[0x33, 0x33, 0, 0, 0, 0],
                &[0xff, 0xff, 0, 0, 0, 0]
            ))]
        );
        assert!(trap_entries(TrapType::Ip2me).unwrap().is_empty());
        assert!(matches!(
            trap_entries(TrapType::Dhcp),
            Err(HostifError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_one_action_list_per_entry() {
        let cpu = ObjectId::new("2");
        let actions = trap_actions(PacketAction::Copy, &cpu, 2).unwrap();
        assert_eq!(
            actions,
            vec![vec![ActionDesc::transmit_immediate(cpu.clone())]; 2]
        );
        assert!(matches!(
            trap_actions(PacketAction::Drop, &cpu, 1),
            Err(HostifError::InvalidArgument(_))
        ));
    }
}
