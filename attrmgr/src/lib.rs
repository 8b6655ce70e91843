// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Object identifiers and typed attribute storage for SAI objects.
//!
//! Every SAI-level object (switch, port, host interface, trap, ...) is identified by an [`Oid`]
//! allocated by an [`AttributeStore`]. The store also keeps the typed attribute bags of
//! those objects and resolves the references between them that the host-interface code needs,
//! like the CPU port of a switch.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod attrs;
mod oid;
mod store;

pub use attrs::{Attributes, HostifAttribute, HostifType, PortAttribute, PortOperStatus, SwitchAttribute};
pub use oid::Oid;
pub use store::{AttrError, AttrMgr, AttributeStore};
