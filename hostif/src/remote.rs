// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The host port control channel: a stream to the remote agent that creates and
//! destroys the ports of remote host interfaces.
//!
//! Once an agent opens the channel, every registered remote host interface is
//! created again on it. The manager then talks to the agent through a
//! [`RemotePortClient`], one exchange at a time. An exchange that fails on the
//! transport or takes longer than the configured timeout closes the channel.

use crate::msg::{HostPortControlMessage, HostPortControlRequest};
use crate::{HostifError, HostifManager};
use futures::{Stream, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tonic::Status;
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn};

/// A control message together with the channel to report its outcome
pub(crate) struct ControlExchange {
    msg: HostPortControlMessage,
    reply_tx: oneshot::Sender<Result<(), HostifError>>,
}

impl ControlExchange {
    fn new(msg: HostPortControlMessage) -> (Self, oneshot::Receiver<Result<(), HostifError>>) {
        let (reply_tx, reply_rx) = oneshot::channel();
        (Self { msg, reply_tx }, reply_rx)
    }
}

/// Issues control messages to the agent attached to a control channel
#[derive(Clone, Debug)]
pub(crate) struct RemotePortClient {
    tx: mpsc::Sender<ControlExchange>,
    /// Closes the channel serving this client
    cancel: CancellationToken,
}

impl RemotePortClient {
    fn new(tx: mpsc::Sender<ControlExchange>, cancel: CancellationToken) -> Self {
        Self { tx, cancel }
    }

    /// Send a message to the agent and wait for its answer
    pub(crate) async fn request(&self, msg: HostPortControlMessage) -> Result<(), HostifError> {
        let (exchange, reply_rx) = ControlExchange::new(msg);
        self.tx
            .send(exchange)
            .await
            .map_err(|_| HostifError::Transport("control channel is closed".to_string()))?;
        reply_rx.await.map_err(|_| {
            HostifError::Transport("control channel closed before answering".to_string())
        })?
    }

    fn same_channel(&self, other: &RemotePortClient) -> bool {
        self.tx.same_channel(&other.tx)
    }
}

/// Failures that end a control channel
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
enum ChannelError {
    #[error("{0}")]
    Closed(String),
    #[error("unexpected message from agent: {0}")]
    Unexpected(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("channel was cancelled")]
    Cancelled,
}

impl From<ChannelError> for HostifError {
    fn from(value: ChannelError) -> Self {
        match value {
            ChannelError::Timeout(timeout) => HostifError::Timeout(timeout),
            other => HostifError::Transport(other.to_string()),
        }
    }
}

struct ControlChannel<S> {
    inbound: S,
    outbound: mpsc::Sender<Result<HostPortControlMessage, Status>>,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl<S> ControlChannel<S>
where
    S: Stream<Item = Result<HostPortControlRequest, Status>> + Unpin,
{
    /// Send a message and wait for the status the agent answers with.
    /// Errors are fatal to the channel; the status reported by the agent is not.
    async fn exchange(
        &mut self,
        msg: &HostPortControlMessage,
    ) -> Result<Result<(), Status>, ChannelError> {
        debug!("Sending {msg:?}");
        let timeout = self.timeout;
        let inbound = &mut self.inbound;
        let outbound = &self.outbound;
        let exchange = async move {
            outbound
                .send(Ok(msg.clone()))
                .await
                .map_err(|_| ChannelError::Closed("agent stream is closed".to_string()))?;
            match inbound.next().await {
                Some(Ok(HostPortControlRequest::Status(status))) => Ok(status.into_result()),
                Some(Ok(other)) => Err(ChannelError::Unexpected(format!("{other:?}"))),
                Some(Err(status)) => Err(ChannelError::Closed(status.to_string())),
                None => Err(ChannelError::Closed("agent closed the stream".to_string())),
            }
        };
        let bounded = async {
            match timeout {
                Some(timeout) => tokio::time::timeout(timeout, exchange)
                    .await
                    .unwrap_or(Err(ChannelError::Timeout(timeout))),
                None => exchange.await,
            }
        };
        tokio::select! {
            () = self.cancel.cancelled() => Err(ChannelError::Cancelled),
            result = bounded => result,
        }
    }
}

impl HostifManager {
    /// Serve a control channel opened by a remote agent. Returns when the channel is
    /// cancelled (by a reset) or fails.
    #[instrument(level = "info", skip_all)]
    pub async fn serve_host_port_control<S>(
        &self,
        mut inbound: S,
        outbound: mpsc::Sender<Result<HostPortControlMessage, Status>>,
    ) -> Result<(), HostifError>
    where
        S: Stream<Item = Result<HostPortControlRequest, Status>> + Unpin + Send,
    {
        info!("Started host port control channel");
        match inbound.next().await {
            Some(Ok(_)) => {}
            Some(Err(status)) => return Err(HostifError::Transport(status.to_string())),
            None => {
                return Err(HostifError::Transport(
                    "control stream closed before init".to_string(),
                ));
            }
        }
        info!("Received init of host port control channel");

        let cancel = CancellationToken::new();
        let mut channel = ControlChannel {
            inbound,
            outbound,
            timeout: self.config().remote_timeout,
            cancel: cancel.clone(),
        };
        let (tx, mut rx) = mpsc::channel(1);
        let client = RemotePortClient::new(tx, cancel.clone());

        {
            let mut state = self.lock_state().await;
            self.add_closer(cancel.clone());
            let mut replayed = 0;
            for remote in state.remote_hostifs.values() {
                match channel.exchange(&remote.msg).await {
                    Ok(Ok(())) => replayed += 1,
                    Ok(Err(status)) => {
                        error!("Agent refused to replay {:?}: {status}", remote.msg);
                        cancel.cancel();
                        return Err(HostifError::Remote(status));
                    }
                    Err(e) => {
                        error!("Failed to replay host interfaces: {e}");
                        cancel.cancel();
                        return Err(e.into());
                    }
                }
            }
            if let Some(previous) = state.remote.replace(client.clone()) {
                info!("Closing previous host port control channel");
                previous.cancel.cancel();
            }
            info!("Initialized host port control channel, replayed {replayed} host interfaces");
        }

        let result = loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("Host port control cancelled");
                    break Ok(());
                }
                exchange = rx.recv() => {
                    let Some(ControlExchange { msg, reply_tx }) = exchange else {
                        break Ok(());
                    };
                    match channel.exchange(&msg).await {
                        Ok(result) => {
                            let _ = reply_tx.send(result.map_err(HostifError::Remote));
                        }
                        Err(ChannelError::Cancelled) => {
                            let _ = reply_tx.send(Err(ChannelError::Cancelled.into()));
                            info!("Host port control cancelled");
                            break Ok(());
                        }
                        Err(e) => {
                            error!("Host port control failed: {e}");
                            let _ = reply_tx.send(Err(e.clone().into()));
                            break Err(e.into());
                        }
                    }
                }
                unsolicited = channel.inbound.next() => match unsolicited {
                    Some(Ok(msg)) => warn!("Ignoring unsolicited {msg:?} from agent"),
                    Some(Err(status)) => {
                        error!("Host port control failed: {status}");
                        break Err(HostifError::Transport(status.to_string()));
                    }
                    None => {
                        info!("Agent closed host port control channel");
                        break Err(HostifError::Transport("agent closed the stream".to_string()));
                    }
                }
            }
        };

        // pending and future requests of this channel fail from now on
        drop(rx);
        cancel.cancel();
        let mut state = self.lock_state().await;
        if state
            .remote
            .as_ref()
            .is_some_and(|current| current.same_channel(&client))
        {
            state.remote = None;
            info!("Cleared host port control channel");
        }
        result
    }
}
