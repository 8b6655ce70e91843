// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The cpu packet bridge: moves frames between the cpu port of the forwarding
//! engine and a single packet client.
//!
//! Frames from the client are read by a separate task into a bounded queue. When
//! the queue is full that task waits, so a slow engine pushes back on the client.
//! Frames to the client never wait: they are dropped if the client is slow.

use crate::msg::{HostPacket, PacketIn, PacketOut};
use crate::tables::set_hostif;
use crate::{HostifError, HostifManager};
use attrmgr::Oid;
use fwd::{CpuFrame, CpuPortSink, FwdError, ObjectId, PacketHeaderId, PortAction, SinkFn};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tonic::Status;
#[allow(unused)]
use tracing::{Instrument, debug, error, info, instrument, warn};

/// Read frames from the client until it closes its stream or the bridge is cancelled
async fn receive_packets<S>(
    mut inbound: S,
    queue: mpsc::Sender<HostPacket>,
    cancel: CancellationToken,
) where
    S: Stream<Item = Result<PacketIn, Status>> + Unpin,
{
    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => return,
            next = inbound.next() => next,
        };
        match next {
            Some(Ok(PacketIn::Packet(packet))) => {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    sent = queue.send(packet) => if sent.is_err() {
                        return;
                    }
                }
            }
            Some(Ok(PacketIn::Init)) => debug!("Ignoring repeated init"),
            Some(Err(status)) => warn!("Failed to receive packet from client: {status}"),
            None => {
                info!("Packet client closed its stream");
                return;
            }
        }
    }
}

/// The sink only holds a weak sender: the client stream ends when the bridge returns.
fn client_sink(outbound: mpsc::WeakSender<Result<PacketOut, Status>>) -> SinkFn {
    Box::new(move |CpuFrame { host_port, frame }| {
        let Some(outbound) = outbound.upgrade() else {
            return Err(FwdError::SinkClosed);
        };
        let out = PacketOut {
            packet: HostPacket { host_port, frame },
        };
        match outbound.try_send(Ok(out)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!("Dropping frame for host port {host_port}: packet client is slow");
                Err(FwdError::SinkFull)
            }
            Err(TrySendError::Closed(_)) => Err(FwdError::SinkClosed),
        }
    })
}

impl HostifManager {
    /// Serve a packet client. Returns when the client goes away or another
    /// client takes over the cpu port.
    #[instrument(level = "info", skip_all)]
    pub async fn serve_cpu_packets<S>(
        &self,
        mut inbound: S,
        outbound: mpsc::Sender<Result<PacketOut, Status>>,
    ) -> Result<(), HostifError>
    where
        S: Stream<Item = Result<PacketIn, Status>> + Unpin + Send + 'static,
    {
        info!("Started cpu packet stream");
        match inbound.next().await {
            Some(Ok(_)) => {}
            Some(Err(status)) => return Err(HostifError::Transport(status.to_string())),
            None => {
                return Err(HostifError::Transport(
                    "packet stream closed before init".to_string(),
                ));
            }
        }
        let engine = self.engine();
        let cpu_port = engine.cpu_port().ok_or_else(|| {
            HostifError::FailedPrecondition("forwarding engine has no cpu port".to_string())
        })?;
        info!("Received init of cpu packet stream, cpu port is {cpu_port}");

        let cancel = CancellationToken::new();
        let (queue_tx, mut queue_rx) = mpsc::channel(self.config().packet_queue_capacity);
        let producer =
            tokio::spawn(receive_packets(inbound, queue_tx, cancel.clone()).in_current_span());
        engine.set_cpu_port_sink(CpuPortSink::new(
            client_sink(outbound.downgrade()),
            cancel.clone(),
        ));

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("Cpu packet stream cancelled");
                    break;
                }
                () = outbound.closed() => {
                    info!("Packet client stopped receiving");
                    break;
                }
                packet = queue_rx.recv() => {
                    let Some(packet) = packet else {
                        break;
                    };
                    self.inject_host_packet(&cpu_port, packet).await;
                }
            }
        }

        cancel.cancel();
        if let Err(e) = producer.await {
            error!("Packet receiver failed: {e}");
        }
        info!("Closed cpu packet stream");
        Ok(())
    }

    async fn inject_host_packet(&self, cpu_port: &ObjectId, packet: HostPacket) {
        let HostPacket { host_port, frame } = packet;
        let actions = vec![set_hostif(Oid::new(host_port))];
        if let Err(e) = self
            .engine()
            .inject_packet(
                cpu_port,
                PacketHeaderId::Ethernet,
                frame,
                actions,
                true,
                PortAction::Input,
            )
            .await
        {
            warn!("Failed to inject frame from host port {host_port}: {e}");
        }
    }
}
