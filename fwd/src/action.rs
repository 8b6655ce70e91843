// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Actions applied to packets

use crate::{ObjectId, PacketField};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateType {
    Set,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    /// Continue processing with a lookup in the named table
    Lookup(String),
    /// Transmit out of a port. Immediate transmission skips any pending actions.
    Transmit { port: ObjectId, immediate: bool },
    /// Write a value to a packet field
    Update {
        field: PacketField,
        kind: UpdateType,
        value: Vec<u8>,
    },
    /// Swap the input and output ports of a packet to the related port
    SwapOutputInternalExternal,
    Output,
    Drop,
}

/// A single action in an action list.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionDesc {
    pub action: ActionType,
}

impl ActionDesc {
    #[must_use]
    pub fn lookup(table: impl Into<String>) -> Self {
        Self {
            action: ActionType::Lookup(table.into()),
        }
    }
    #[must_use]
    pub fn transmit(port: ObjectId) -> Self {
        Self {
            action: ActionType::Transmit {
                port,
                immediate: false,
            },
        }
    }
    #[must_use]
    pub fn transmit_immediate(port: ObjectId) -> Self {
        Self {
            action: ActionType::Transmit {
                port,
                immediate: true,
            },
        }
    }
    #[must_use]
    pub fn set_u64(field: PacketField, value: u64) -> Self {
        Self {
            action: ActionType::Update {
                field,
                kind: UpdateType::Set,
                value: value.to_be_bytes().to_vec(),
            },
        }
    }
    #[must_use]
    pub fn swap_output_internal_external() -> Self {
        Self {
            action: ActionType::SwapOutputInternalExternal,
        }
    }
    #[must_use]
    pub fn output() -> Self {
        Self {
            action: ActionType::Output,
        }
    }
    #[must_use]
    pub fn drop_packet() -> Self {
        Self {
            action: ActionType::Drop,
        }
    }
}

impl From<ActionType> for ActionDesc {
    fn from(action: ActionType) -> Self {
        Self { action }
    }
}
