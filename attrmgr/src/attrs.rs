// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Typed attribute bags

use crate::Oid;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortOperStatus {
    Unknown,
    Up,
    Down,
    Testing,
    NotPresent,
}

/// The type of a host interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostifType {
    Genetlink,
    Netdev,
}

impl Display for HostifType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostifType::Genetlink => write!(f, "genetlink"),
            HostifType::Netdev => write!(f, "netdev"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchAttribute {
    pub cpu_port: Option<Oid>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortAttribute {
    pub oper_status: Option<PortOperStatus>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostifAttribute {
    pub hostif_type: Option<HostifType>,
    pub name: Option<String>,
    pub obj_id: Option<Oid>,
    pub oper_status: Option<bool>,
}

/// The attributes of a single object. An object keeps the same kind of bag for its whole life.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attributes {
    Switch(SwitchAttribute),
    Port(PortAttribute),
    Hostif(HostifAttribute),
}

fn merge<T: Clone>(dst: &mut Option<T>, src: Option<&T>) {
    if let Some(value) = src {
        *dst = Some(value.clone());
    }
}

impl Attributes {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Attributes::Switch(_) => "switch",
            Attributes::Port(_) => "port",
            Attributes::Hostif(_) => "hostif",
        }
    }

    /// Overwrite the attributes that are set in `other`, leaving the rest untouched.
    /// Returns false if the two bags are of distinct kinds, in which case nothing is merged.
    pub(crate) fn merge_from(&mut self, other: &Attributes) -> bool {
        match (self, other) {
            (Attributes::Switch(dst), Attributes::Switch(src)) => {
                merge(&mut dst.cpu_port, src.cpu_port.as_ref());
            }
            (Attributes::Port(dst), Attributes::Port(src)) => {
                merge(&mut dst.oper_status, src.oper_status.as_ref());
            }
            (Attributes::Hostif(dst), Attributes::Hostif(src)) => {
                merge(&mut dst.hostif_type, src.hostif_type.as_ref());
                merge(&mut dst.name, src.name.as_ref());
                merge(&mut dst.obj_id, src.obj_id.as_ref());
                merge(&mut dst.oper_status, src.oper_status.as_ref());
            }
            _ => return false,
        }
        true
    }
}

impl From<SwitchAttribute> for Attributes {
    fn from(value: SwitchAttribute) -> Self {
        Attributes::Switch(value)
    }
}
impl From<PortAttribute> for Attributes {
    fn from(value: PortAttribute) -> Self {
        Attributes::Port(value)
    }
}
impl From<HostifAttribute> for Attributes {
    fn from(value: HostifAttribute) -> Self {
        Attributes::Hostif(value)
    }
}
