//! Data-plane client core for a wide-column table service.
//!
//! Reads arrive as streamed chunks that are reassembled into rows and resumed
//! after transient failures without duplicates or gaps. Batched writes retry
//! only the entries that failed transiently. Replication can be awaited with a
//! consistency token. The RPC layer itself stays behind the traits in
//! [`transport`].

mod observability;

/// Chunk reassembly into committed rows.
pub mod chunk;

/// Waiting on replication consistency tokens.
pub mod consistency;

/// Crate-level error type.
pub mod error;

/// Timers driving retry delays and polling.
pub mod executor;

/// Batched row mutations.
pub mod mutation;

/// Retry, backoff and polling configuration.
pub mod option;

/// Resilient streaming reads.
pub mod read;

/// Row and cell model.
pub mod row;

/// Key ranges.
pub mod scan;

/// Transport status codes.
pub mod status;

/// Table handle tying transport, timer and options together.
pub mod table;

/// Contracts for the RPC layer.
pub mod transport;

#[cfg(test)]
mod test_util;

pub use crate::{
    chunk::{Checkpoint, Chunk, ChunkReassembler, ProtocolViolation},
    consistency::{ConsistencyToken, ConsistencyWaiter},
    error::ClientError,
    mutation::{BatchMutator, EntryOutcome, FailedEntry, Mutation, MutationEntry, PartialFailure},
    option::{Backoff, ClientOption, ConsistencyOption, RetryOption},
    read::{ReadRequest, RowFilter},
    row::{Cell, Row},
    scan::KeyRange,
    status::{Code, Status},
    table::Table,
};

#[cfg(feature = "tokio")]
pub use crate::executor::tokio::TokioTimer;
