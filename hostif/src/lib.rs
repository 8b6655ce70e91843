// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Host interfaces of the SAI server.
//!
//! The [`HostifManager`] turns host interface, trap and trap group objects into
//! forwarding engine ports and table entries. Host interface ports are either
//! created in-process or, in remote mode, by an agent attached through the host
//! port control stream. The cpu packet stream connects the cpu port of the engine
//! to a packet client.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod bridge;
mod config;
mod errors;
mod manager;
pub mod msg;
mod remote;
mod service;
pub mod tables;
pub mod trap;

#[cfg(test)]
mod testfixture;

pub use config::{
    DEFAULT_PACKET_QUEUE_CAPACITY, DEFAULT_REMOTE_TIMEOUT, HostifConfig, HostifConfigBuilder,
    HostifConfigBuilderError, NetdevType,
};
pub use errors::HostifError;
pub use manager::HostifManager;
pub use service::{HostifServer, HostifService, PacketIoService};
