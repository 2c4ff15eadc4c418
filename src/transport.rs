//! Contracts for the RPC layer this crate drives. Channel management, wire
//! encoding and authentication live behind these traits.

use futures_util::{future::BoxFuture, stream::BoxStream};

use crate::{
    chunk::Chunk,
    consistency::ConsistencyToken,
    mutation::{EntryOutcome, MutationEntry},
    read::ReadRequest,
    status::Status,
};

/// One message of a streamed read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadRowsResponse {
    /// The server accepted the request; sent at most once, before any chunk.
    Accepted,
    Chunks(Vec<Chunk>),
}

/// One message of a streamed batched write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutateRowsResponse {
    /// The server accepted the batch; sent at most once, before any outcome.
    Accepted,
    /// Outcomes for some entries of the submitted batch, indexed into it.
    Entries(Vec<EntryOutcome>),
}

pub trait ReadRowsTransport: Send + Sync {
    /// Start a read. The stream ends after the last chunk, or with an error.
    fn read_rows(&self, request: ReadRequest) -> BoxStream<'_, Result<ReadRowsResponse, Status>>;
}

pub trait MutateRowsTransport: Send + Sync {
    /// Submit a batch. The stream ends once every reported outcome was sent,
    /// or with an error.
    fn mutate_rows(
        &self,
        entries: Vec<MutationEntry>,
    ) -> BoxStream<'_, Result<MutateRowsResponse, Status>>;
}

pub trait ConsistencyTransport: Send + Sync {
    fn generate_consistency_token(&self) -> BoxFuture<'_, Result<ConsistencyToken, Status>>;

    /// Whether every write issued before `token` was generated is replicated.
    fn check_consistency<'a>(
        &'a self,
        token: &'a ConsistencyToken,
    ) -> BoxFuture<'a, Result<bool, Status>>;
}
