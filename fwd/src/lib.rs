// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The API of the software forwarding engine, as consumed by the SAI server.
//!
//! The forwarding engine owns ports and classification tables. This crate only describes
//! the requests that can be issued to it ([`ForwardingEngine`]) together with the objects
//! those requests carry: port descriptors, packet-field matches, actions and table entries.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod action;
mod engine;
mod events;
mod field;
mod ids;
mod port;
mod table;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use action::{ActionDesc, ActionType, UpdateType};
pub use engine::{CpuFrame, CpuPortSink, FwdError, ForwardingEngine, PacketHeaderId, SinkFn};
pub use events::{PortEvent, PortEventBus};
pub use field::{FieldMatch, PacketField};
pub use ids::{ContextId, Nid, ObjectId};
pub use port::{PortAction, PortDesc, PortKind, PortState, PortType};
pub use table::{EntryDesc, TableEntryAddRequest, TableEntryRemoveRequest};

/// Attribute that links a host interface port and the port it stands for, so that
/// swap actions know where to send packets.
pub const SWAP_ACTION_RELATED_PORT: &str = "swap-action-related-port";
