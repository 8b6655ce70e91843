// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Messages exchanged with the clients of the host interface services.
//!
//! Enumerations keep the unspecified and unsupported values of the API so that
//! requests carrying them can be rejected with a meaningful error.

use attrmgr::{HostifAttribute, Oid};
use bytes::Bytes;
use tonic::{Code, Status};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostifType {
    Unspecified,
    Netdev,
    Fd,
    Genetlink,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapType {
    Unspecified,
    Stp,
    Lacp,
    Lldp,
    Udld,
    ArpRequest,
    ArpResponse,
    Dhcp,
    Ipv6NeighborDiscovery,
    Ip2me,
    Bgp,
    Bgpv6,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketAction {
    Unspecified,
    Drop,
    Forward,
    Copy,
    CopyCancel,
    Trap,
    Log,
    Deny,
    Transit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserDefinedTrapType {
    Unspecified,
    Acl,
    Router,
    Neighbor,
    Fdb,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostifTableEntryType {
    Unspecified,
    Port,
    Lag,
    Vlan,
    TrapId,
    Wildcard,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateHostifRequest {
    pub switch: Oid,
    pub hostif_type: HostifType,
    pub name: String,
    pub genetlink_mcgrp_name: Option<String>,
    /// The port (or cpu port) the interface stands for
    pub obj_id: Oid,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateHostifResponse {
    pub oid: Oid,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoveHostifRequest {
    pub oid: Oid,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemoveHostifResponse {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetHostifAttributeRequest {
    pub oid: Oid,
    pub oper_status: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SetHostifAttributeResponse {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetHostifAttributeRequest {
    pub oid: Oid,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetHostifAttributeResponse {
    pub attr: HostifAttribute,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateHostifTrapRequest {
    pub switch: Oid,
    pub trap_type: TrapType,
    pub packet_action: PacketAction,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateHostifTrapResponse {
    pub oid: Oid,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateHostifTrapGroupRequest {
    pub switch: Oid,
    pub queue: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateHostifTrapGroupResponse {
    pub oid: Oid,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetHostifTrapGroupAttributeRequest {
    pub oid: Oid,
    pub queue: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SetHostifTrapGroupAttributeResponse {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateHostifUserDefinedTrapRequest {
    pub switch: Oid,
    pub trap_type: UserDefinedTrapType,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateHostifUserDefinedTrapResponse {
    pub oid: Oid,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateHostifTableEntryRequest {
    pub switch: Oid,
    pub entry_type: HostifTableEntryType,
    pub trap_id: Oid,
    pub host_if: Oid,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateHostifTableEntryResponse {}

/// A frame travelling between the cpu port and the packet client
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostPacket {
    /// The host interface the frame comes from or goes to
    pub host_port: u64,
    pub frame: Bytes,
}

/// Messages from the packet client. The first one opens the stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PacketIn {
    Init,
    Packet(HostPacket),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacketOut {
    pub packet: HostPacket,
}

/// Type-specific description of a port created by the remote agent
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostPort {
    Genetlink { family: String, group: String },
    Netdev { name: String },
}

/// A port creation or destruction order to the remote agent
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostPortControlMessage {
    pub create: bool,
    pub port_id: Oid,
    pub dataplane_port: Oid,
    pub port: Option<HostPort>,
}

/// The outcome of a port control message, as reported by the agent
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlStatus {
    pub code: Code,
    pub message: String,
}

impl ControlStatus {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            code: Code::Ok,
            message: String::new(),
        }
    }
    #[must_use]
    pub fn error(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
    pub fn into_result(self) -> Result<(), Status> {
        match self.code {
            Code::Ok => Ok(()),
            code => Err(Status::new(code, self.message)),
        }
    }
}

/// Messages from the remote agent. The first one opens the stream; every other one
/// answers the last control message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostPortControlRequest {
    Init,
    Status(ControlStatus),
}
