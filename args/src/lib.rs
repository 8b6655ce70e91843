// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Command line arguments of the SAI server that concern host interfaces

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub use clap::Parser;
use std::num::NonZero;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_REMOTE_PORT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_CPU_PACKET_QUEUE: usize = 1024;
pub const DEFAULT_TRACING: &str = "info";

/// The technology used for the ports that back local netdev host interfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostifNetdevType {
    Kernel,
    Tap,
}

fn parse_tracing_filter(value: &str) -> Result<String, String> {
    EnvFilter::try_new(value)
        .map(|_| value.to_owned())
        .map_err(|e| format!("bad tracing filter '{value}': {e}"))
}

#[derive(Parser, Debug, serde::Serialize)]
#[command(name = "SAI server host interfaces")]
#[command(about = "Host interface, trap and cpu packet io support of the SAI server", long_about = None)]
pub struct CmdArgs {
    #[arg(
        long,
        default_value_t = false,
        help = "Delegate the lifecycle of host interface ports to a remote agent over the host port control channel"
    )]
    remote_cpu_port: bool,

    #[arg(
        long,
        value_enum,
        default_value_t = HostifNetdevType::Tap,
        help = "Type of port created for local netdev host interfaces"
    )]
    hostif_netdev_type: HostifNetdevType,

    #[arg(
        long,
        value_name = "MILLISECONDS",
        default_value_t = DEFAULT_REMOTE_PORT_TIMEOUT_MS,
        help = "Max time to wait for the remote agent to acknowledge a port control message. 0 waits forever"
    )]
    remote_port_timeout_ms: u64,

    #[arg(
        long,
        value_name = "N",
        default_value = "1024",
        help = "Max number of frames from the cpu packet client queued for injection"
    )]
    cpu_packet_queue: NonZero<usize>,

    #[arg(
        long,
        value_name = "tracing filter",
        default_value = DEFAULT_TRACING,
        value_parser = parse_tracing_filter,
        help = "Tracing filter as a comma-separated sequence of directives, with level one in [off,error,warn,info,debug,trace].
E.g. warn,saiserver_hostif=debug will log warnings and above for everything but debug messages for host interfaces"
    )]
    tracing: String,
}

impl CmdArgs {
    #[must_use]
    pub fn remote_cpu_port(&self) -> bool {
        self.remote_cpu_port
    }
    #[must_use]
    pub fn hostif_netdev_type(&self) -> HostifNetdevType {
        self.hostif_netdev_type
    }
    /// The bound on remote port control exchanges. `None` if they are unbounded.
    #[must_use]
    pub fn remote_port_timeout(&self) -> Option<Duration> {
        match self.remote_port_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
    #[must_use]
    pub fn cpu_packet_queue(&self) -> usize {
        self.cpu_packet_queue.get()
    }
    /// The tracing filter directives, already validated
    #[must_use]
    pub fn tracing(&self) -> &str {
        &self.tracing
    }
}
