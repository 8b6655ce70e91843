// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! RPC surface of the host interface manager

use crate::msg::{
    CreateHostifRequest, CreateHostifResponse, CreateHostifTableEntryRequest,
    CreateHostifTableEntryResponse, CreateHostifTrapGroupRequest, CreateHostifTrapGroupResponse,
    CreateHostifTrapRequest, CreateHostifTrapResponse, CreateHostifUserDefinedTrapRequest,
    CreateHostifUserDefinedTrapResponse, GetHostifAttributeRequest, GetHostifAttributeResponse,
    HostPortControlMessage, HostPortControlRequest, PacketIn, PacketOut, RemoveHostifRequest,
    RemoveHostifResponse, SetHostifAttributeRequest, SetHostifAttributeResponse,
    SetHostifTrapGroupAttributeRequest, SetHostifTrapGroupAttributeResponse,
};
use crate::HostifManager;
use async_trait::async_trait;
use futures::Stream;
use futures::stream::BoxStream;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::{Instrument, error, info_span};

/// Messages queued towards the remote agent. Exchanges are sequential, so one suffices.
const CONTROL_STREAM_CAPACITY: usize = 1;

/// Host interface, trap and trap group requests
#[async_trait]
pub trait HostifService: Send + Sync + 'static {
    async fn create_hostif(
        &self,
        request: Request<CreateHostifRequest>,
    ) -> Result<Response<CreateHostifResponse>, Status>;

    async fn remove_hostif(
        &self,
        request: Request<RemoveHostifRequest>,
    ) -> Result<Response<RemoveHostifResponse>, Status>;

    async fn set_hostif_attribute(
        &self,
        request: Request<SetHostifAttributeRequest>,
    ) -> Result<Response<SetHostifAttributeResponse>, Status>;

    async fn get_hostif_attribute(
        &self,
        request: Request<GetHostifAttributeRequest>,
    ) -> Result<Response<GetHostifAttributeResponse>, Status>;

    async fn create_hostif_trap(
        &self,
        request: Request<CreateHostifTrapRequest>,
    ) -> Result<Response<CreateHostifTrapResponse>, Status>;

    async fn create_hostif_trap_group(
        &self,
        request: Request<CreateHostifTrapGroupRequest>,
    ) -> Result<Response<CreateHostifTrapGroupResponse>, Status>;

    async fn set_hostif_trap_group_attribute(
        &self,
        request: Request<SetHostifTrapGroupAttributeRequest>,
    ) -> Result<Response<SetHostifTrapGroupAttributeResponse>, Status>;

    async fn create_hostif_user_defined_trap(
        &self,
        request: Request<CreateHostifUserDefinedTrapRequest>,
    ) -> Result<Response<CreateHostifUserDefinedTrapResponse>, Status>;

    async fn create_hostif_table_entry(
        &self,
        request: Request<CreateHostifTableEntryRequest>,
    ) -> Result<Response<CreateHostifTableEntryResponse>, Status>;
}

/// The long-lived streams of the cpu packet client and of the remote port agent
#[async_trait]
pub trait PacketIoService: Send + Sync + 'static {
    type CpuPacketStreamStream: Stream<Item = Result<PacketOut, Status>> + Send + 'static;
    type HostPortControlStream: Stream<Item = Result<HostPortControlMessage, Status>>
        + Send
        + 'static;

    async fn cpu_packet_stream(
        &self,
        request: Request<BoxStream<'static, Result<PacketIn, Status>>>,
    ) -> Result<Response<Self::CpuPacketStreamStream>, Status>;

    async fn host_port_control(
        &self,
        request: Request<BoxStream<'static, Result<HostPortControlRequest, Status>>>,
    ) -> Result<Response<Self::HostPortControlStream>, Status>;
}

/// Serves both services from a shared [`HostifManager`]
#[derive(Clone)]
pub struct HostifServer {
    manager: Arc<HostifManager>,
}

impl HostifServer {
    #[must_use]
    pub fn new(manager: Arc<HostifManager>) -> Self {
        Self { manager }
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<HostifManager> {
        &self.manager
    }
}

#[async_trait]
impl HostifService for HostifServer {
    async fn create_hostif(
        &self,
        request: Request<CreateHostifRequest>,
    ) -> Result<Response<CreateHostifResponse>, Status> {
        let oid = self.manager.create_hostif(request.get_ref()).await?;
        Ok(Response::new(CreateHostifResponse { oid }))
    }

    async fn remove_hostif(
        &self,
        request: Request<RemoveHostifRequest>,
    ) -> Result<Response<RemoveHostifResponse>, Status> {
        self.manager.remove_hostif(request.into_inner().oid).await?;
        Ok(Response::new(RemoveHostifResponse {}))
    }

    async fn set_hostif_attribute(
        &self,
        request: Request<SetHostifAttributeRequest>,
    ) -> Result<Response<SetHostifAttributeResponse>, Status> {
        self.manager.set_hostif_attribute(request.get_ref()).await?;
        Ok(Response::new(SetHostifAttributeResponse {}))
    }

    async fn get_hostif_attribute(
        &self,
        request: Request<GetHostifAttributeRequest>,
    ) -> Result<Response<GetHostifAttributeResponse>, Status> {
        let attr = self.manager.get_hostif_attribute(request.into_inner().oid)?;
        Ok(Response::new(GetHostifAttributeResponse { attr }))
    }

    async fn create_hostif_trap(
        &self,
        request: Request<CreateHostifTrapRequest>,
    ) -> Result<Response<CreateHostifTrapResponse>, Status> {
        let oid = self.manager.create_hostif_trap(request.get_ref()).await?;
        Ok(Response::new(CreateHostifTrapResponse { oid }))
    }

    async fn create_hostif_trap_group(
        &self,
        request: Request<CreateHostifTrapGroupRequest>,
    ) -> Result<Response<CreateHostifTrapGroupResponse>, Status> {
        let oid = self
            .manager
            .create_hostif_trap_group(request.get_ref())
            .await?;
        Ok(Response::new(CreateHostifTrapGroupResponse { oid }))
    }

    async fn set_hostif_trap_group_attribute(
        &self,
        request: Request<SetHostifTrapGroupAttributeRequest>,
    ) -> Result<Response<SetHostifTrapGroupAttributeResponse>, Status> {
        self.manager
            .set_hostif_trap_group_attribute(request.get_ref())
            .await?;
        Ok(Response::new(SetHostifTrapGroupAttributeResponse {}))
    }

    async fn create_hostif_user_defined_trap(
        &self,
        request: Request<CreateHostifUserDefinedTrapRequest>,
    ) -> Result<Response<CreateHostifUserDefinedTrapResponse>, Status> {
        let oid = self
            .manager
            .create_hostif_user_defined_trap(request.get_ref())?;
        Ok(Response::new(CreateHostifUserDefinedTrapResponse { oid }))
    }

    async fn create_hostif_table_entry(
        &self,
        request: Request<CreateHostifTableEntryRequest>,
    ) -> Result<Response<CreateHostifTableEntryResponse>, Status> {
        self.manager
            .create_hostif_table_entry(request.get_ref())
            .await?;
        Ok(Response::new(CreateHostifTableEntryResponse {}))
    }
}

#[async_trait]
impl PacketIoService for HostifServer {
    type CpuPacketStreamStream = ReceiverStream<Result<PacketOut, Status>>;
    type HostPortControlStream = ReceiverStream<Result<HostPortControlMessage, Status>>;

    async fn cpu_packet_stream(
        &self,
        request: Request<BoxStream<'static, Result<PacketIn, Status>>>,
    ) -> Result<Response<Self::CpuPacketStreamStream>, Status> {
        let inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(self.manager.config().packet_queue_capacity);
        let failures = tx.clone();
        let manager = self.manager.clone();
        tokio::spawn(
            async move {
                if let Err(e) = manager.serve_cpu_packets(inbound, tx).await {
                    error!("Cpu packet stream failed: {e}");
                    let _ = failures.send(Err(e.into())).await;
                }
            }
            .instrument(info_span!("cpu-packets")),
        );
        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn host_port_control(
        &self,
        request: Request<BoxStream<'static, Result<HostPortControlRequest, Status>>>,
    ) -> Result<Response<Self::HostPortControlStream>, Status> {
        let inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(CONTROL_STREAM_CAPACITY);
        let failures = tx.clone();
        let manager = self.manager.clone();
        tokio::spawn(
            async move {
                if let Err(e) = manager.serve_host_port_control(inbound, tx).await {
                    error!("Host port control failed: {e}");
                    let _ = failures.send(Err(e.into())).await;
                }
            }
            .instrument(info_span!("host-port-control")),
        );
        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
