// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Port descriptors

use crate::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    Cpu,
    Kernel,
    Tap,
    Genetlink,
    Fake,
}

/// Type-specific description of a port
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortKind {
    /// A metadata-only port: it does no packet io but describes a generic netlink family/group.
    Genetlink { family: String, group: String },
    /// A port backed by an existing kernel network device
    Kernel { device_name: String },
    /// A port backed by a tap device
    Tap { device_name: String },
    Cpu,
}

impl PortKind {
    #[must_use]
    pub fn port_type(&self) -> PortType {
        match self {
            PortKind::Genetlink { .. } => PortType::Genetlink,
            PortKind::Kernel { .. } => PortType::Kernel,
            PortKind::Tap { .. } => PortType::Tap,
            PortKind::Cpu => PortType::Cpu,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDesc {
    pub port_id: ObjectId,
    pub kind: PortKind,
}

impl PortDesc {
    #[must_use]
    pub fn new(port_id: ObjectId, kind: PortKind) -> Self {
        Self { port_id, kind }
    }
    #[must_use]
    pub fn port_type(&self) -> PortType {
        self.kind.port_type()
    }
}

impl Display for PortDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            PortKind::Genetlink { family, group } => {
                write!(f, "port {} (genetlink {family}/{group})", self.port_id)
            }
            PortKind::Kernel { device_name } => {
                write!(f, "port {} (kernel {device_name})", self.port_id)
            }
            PortKind::Tap { device_name } => write!(f, "port {} (tap {device_name})", self.port_id),
            PortKind::Cpu => write!(f, "port {} (cpu)", self.port_id),
        }
    }
}

/// Administrative state of a port
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortState {
    EnabledUp,
    DisabledDown,
}

/// The direction in which a packet is processed by a port
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortAction {
    Input,
    Output,
}
