// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use attrmgr::{AttrError, Oid};
use fwd::FwdError;
use std::time::Duration;
use tonic::Status;

#[derive(Debug, thiserror::Error)]
pub enum HostifError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),
    #[error("No such object: {0}")]
    NotFound(Oid),
    #[error("Attribute failure: {0}")]
    Internal(#[from] AttrError),
    #[error("Forwarding failure: {0}")]
    Forwarding(#[from] FwdError),
    #[error("Remote agent failure: {0}")]
    Remote(Status),
    #[error("Port control transport failure: {0}")]
    Transport(String),
    #[error("No answer from remote agent within {0:?}")]
    Timeout(Duration),
}

impl From<HostifError> for Status {
    fn from(value: HostifError) -> Self {
        match value {
            HostifError::InvalidArgument(msg) => Status::invalid_argument(msg),
            HostifError::FailedPrecondition(msg) => Status::failed_precondition(msg),
            HostifError::NotFound(oid) => Status::not_found(format!("No such object: {oid}")),
            e @ (HostifError::Internal(_) | HostifError::Forwarding(_)) => {
                Status::internal(e.to_string())
            }
            HostifError::Remote(status) => status,
            e @ HostifError::Transport(_) => Status::unavailable(e.to_string()),
            e @ HostifError::Timeout(_) => Status::deadline_exceeded(e.to_string()),
        }
    }
}
