use thiserror::Error;

use crate::{chunk::ProtocolViolation, mutation::PartialFailure, status::Status};

/// Errors surfaced by reads, batched writes and consistency waits.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The chunk stream broke the reassembly protocol.
    #[error("read protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),
    /// The transport failed with a status that is not retried, or retries ran
    /// out.
    #[error("transport error: {0}")]
    Transport(#[from] Status),
    /// Some entries of a batched write failed permanently.
    #[error(transparent)]
    PartialFailure(#[from] PartialFailure),
    /// Generating or checking a consistency token failed.
    #[error("consistency check error: {0}")]
    Consistency(Status),
}

impl ClientError {
    /// Status carried by transport and consistency errors.
    pub fn status(&self) -> Option<&Status> {
        match self {
            ClientError::Transport(status) | ClientError::Consistency(status) => Some(status),
            ClientError::Protocol(_) | ClientError::PartialFailure(_) => None,
        }
    }
}
