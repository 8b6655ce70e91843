// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration of the host interface manager

use args::{CmdArgs, HostifNetdevType};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;

pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PACKET_QUEUE_CAPACITY: usize = 1024;

/// The kind of port created for local netdev host interfaces
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetdevType {
    Kernel,
    #[default]
    Tap,
}

impl From<HostifNetdevType> for NetdevType {
    fn from(value: HostifNetdevType) -> Self {
        match value {
            HostifNetdevType::Kernel => NetdevType::Kernel,
            HostifNetdevType::Tap => NetdevType::Tap,
        }
    }
}

/// Host interface settings. N.B. we derive a builder type `HostifConfigBuilder`
/// and provide defaults for each field.
#[derive(Builder, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct HostifConfig {
    /// Host interface ports are created by a remote agent
    #[builder(default = false)]
    pub remote_cpu_port: bool,

    #[builder(default)]
    pub netdev_type: NetdevType,

    /// Bound on a single exchange with the remote agent. `None` waits forever.
    #[builder(setter(into), default = Some(DEFAULT_REMOTE_TIMEOUT))]
    pub remote_timeout: Option<Duration>,

    /// Max frames from the cpu packet client waiting to be injected
    #[builder(default = DEFAULT_PACKET_QUEUE_CAPACITY)]
    pub packet_queue_capacity: usize,
}

impl HostifConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.packet_queue_capacity == Some(0) {
            return Err("packet queue capacity must be positive".to_string());
        }
        if self.remote_timeout == Some(Some(Duration::ZERO)) {
            return Err("remote timeout must be positive".to_string());
        }
        Ok(())
    }
}

impl Default for HostifConfig {
    fn default() -> Self {
        Self {
            remote_cpu_port: false,
            netdev_type: NetdevType::default(),
            remote_timeout: Some(DEFAULT_REMOTE_TIMEOUT),
            packet_queue_capacity: DEFAULT_PACKET_QUEUE_CAPACITY,
        }
    }
}

impl From<&CmdArgs> for HostifConfig {
    fn from(args: &CmdArgs) -> Self {
        Self {
            remote_cpu_port: args.remote_cpu_port(),
            netdev_type: args.hostif_netdev_type().into(),
            remote_timeout: args.remote_port_timeout(),
            packet_queue_capacity: args.cpu_packet_queue(),
        }
    }
}

impl Display for HostifConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        writeln!(f, "Host interface config")?;
        writeln!(f, "  remote cpu port : {}", self.remote_cpu_port)?;
        writeln!(f, "  netdev type     : {:?}", self.netdev_type)?;
        match self.remote_timeout {
            Some(timeout) => writeln!(f, "  remote timeout  : {timeout:?}")?,
            None => writeln!(f, "  remote timeout  : none")?,
        }
        writeln!(f, "  packet queue    : {}", self.packet_queue_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::{HostifConfig, HostifConfigBuilder, NetdevType};
    use args::{CmdArgs, Parser};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_builder_defaults() {
        let config = HostifConfigBuilder::default().build().unwrap();
        assert_eq!(config, HostifConfig::default());
        assert_eq!(config.netdev_type, NetdevType::Tap);
        assert_eq!(config.remote_timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_builder_validation() {
        assert!(
            HostifConfigBuilder::default()
                .packet_queue_capacity(0)
                .build()
                .is_err()
        );
        assert!(
            HostifConfigBuilder::default()
                .remote_timeout(Duration::ZERO)
                .build()
                .is_err()
        );
        let config = HostifConfigBuilder::default()
            .remote_cpu_port(true)
            .remote_timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        assert!(config.remote_cpu_port);
        assert_eq!(config.remote_timeout, Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_from_args() {
        let args = CmdArgs::try_parse_from([
            "saiserver",
            "--remote-cpu-port",
            "--hostif-netdev-type",
            "kernel",
            "--remote-port-timeout-ms",
            "0",
            "--cpu-packet-queue",
            "8",
        ])
        .unwrap();
        let config = HostifConfig::from(&args);
        assert_eq!(
            config,
            HostifConfig {
                remote_cpu_port: true,
                netdev_type: NetdevType::Kernel,
                remote_timeout: None,
                packet_queue_capacity: 8,
            }
        );
    }
}
