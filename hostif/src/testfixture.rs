// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A switch with a cpu port and a front panel port, wired to a fake forwarding
//! engine, plus a scripted remote agent.

#![allow(clippy::missing_panics_doc)]

use crate::msg::{
    ControlStatus, CreateHostifRequest, HostPortControlMessage, HostPortControlRequest, HostifType,
};
use crate::{HostifConfig, HostifConfigBuilder, HostifError, HostifManager};
use attrmgr::{AttrMgr, AttributeStore, Oid, PortAttribute, PortOperStatus, SwitchAttribute};
use fwd::testing::FakeEngine;
use fwd::{ObjectId, PortDesc, PortKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Status;
use tracing::Instrument;

pub(crate) struct Fixture {
    pub attrs: Arc<AttrMgr>,
    pub engine: Arc<FakeEngine>,
    pub switch: Oid,
    pub cpu: Oid,
    pub port: Oid,
    pub manager: Arc<HostifManager>,
}

impl Fixture {
    pub fn local() -> Self {
        Self::with_config(HostifConfig::default())
    }

    pub fn remote(timeout: Duration) -> Self {
        Self::with_config(
            HostifConfigBuilder::default()
                .remote_cpu_port(true)
                .remote_timeout(timeout)
                .build()
                .unwrap(),
        )
    }

    pub fn with_config(config: HostifConfig) -> Self {
        let attrs = Arc::new(AttrMgr::new());
        let switch = attrs.next_id();
        let cpu = attrs.next_id();
        attrs
            .store(
                switch,
                SwitchAttribute {
                    cpu_port: Some(cpu),
                }
                .into(),
            )
            .unwrap();
        attrs
            .store(
                cpu,
                PortAttribute {
                    oper_status: Some(PortOperStatus::Up),
                }
                .into(),
            )
            .unwrap();
        let engine = Arc::new(FakeEngine::with_cpu_port(ObjectId::from(cpu).as_str()));
        let manager = Arc::new(HostifManager::new(config, attrs.clone(), engine.clone()));
        let mut fixture = Self {
            attrs,
            engine,
            switch,
            cpu,
            port: Oid::NULL,
            manager,
        };
        fixture.port = fixture.port_named("swp1");
        fixture
    }

    /// Add a front panel port that is up
    pub fn port_named(&self, name: &str) -> Oid {
        let port = self.attrs.next_id();
        self.attrs
            .store(
                port,
                PortAttribute {
                    oper_status: Some(PortOperStatus::Up),
                }
                .into(),
            )
            .unwrap();
        self.engine
            .add_port(PortDesc::new(
                port.into(),
                PortKind::Kernel {
                    device_name: name.to_string(),
                },
            ))
            .unwrap();
        port
    }

    pub fn netdev(&self, name: &str, obj_id: Oid) -> CreateHostifRequest {
        CreateHostifRequest {
            switch: self.switch,
            hostif_type: HostifType::Netdev,
            name: name.to_string(),
            genetlink_mcgrp_name: None,
            obj_id,
        }
    }

    pub fn genetlink(&self, family: &str, group: &str) -> CreateHostifRequest {
        CreateHostifRequest {
            switch: self.switch,
            hostif_type: HostifType::Genetlink,
            name: family.to_string(),
            genetlink_mcgrp_name: Some(group.to_string()),
            obj_id: self.cpu,
        }
    }

    /// Open a control channel as a remote agent would
    pub async fn connect_agent(&self) -> Agent {
        let (tx, in_rx) = mpsc::channel(16);
        let (out_tx, rx) = mpsc::channel(16);
        tx.send(Ok(HostPortControlRequest::Init)).await.unwrap();
        let manager = self.manager.clone();
        let handle = tokio::spawn(
            async move {
                manager
                    .serve_host_port_control(ReceiverStream::new(in_rx), out_tx)
                    .await
            }
            .in_current_span(),
        );
        Agent { tx, rx, handle }
    }
}

/// The remote end of a control channel
pub(crate) struct Agent {
    pub tx: mpsc::Sender<Result<HostPortControlRequest, Status>>,
    pub rx: mpsc::Receiver<Result<HostPortControlMessage, Status>>,
    pub handle: JoinHandle<Result<(), HostifError>>,
}

impl Agent {
    /// Read the next control message without answering it
    pub async fn recv(&mut self) -> HostPortControlMessage {
        self.rx
            .recv()
            .await
            .expect("Control channel closed")
            .expect("Control channel failed")
    }

    pub fn try_recv(&mut self) -> Option<HostPortControlMessage> {
        self.rx.try_recv().ok().and_then(Result::ok)
    }

    /// Read the next control message and answer it
    pub async fn answer(&mut self, status: ControlStatus) -> HostPortControlMessage {
        let msg = self.recv().await;
        self.tx
            .send(Ok(HostPortControlRequest::Status(status)))
            .await
            .unwrap();
        msg
    }

    pub async fn ack(&mut self) -> HostPortControlMessage {
        self.answer(ControlStatus::ok()).await
    }
}

/// Wait until a control channel is ready to serve requests
pub(crate) async fn wait_attached(manager: &HostifManager) {
    while !manager.is_remote_attached().await {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}
