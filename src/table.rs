use std::sync::Arc;

use futures_core::Stream;

use crate::{
    consistency::{ConsistencyToken, ConsistencyWaiter},
    error::ClientError,
    executor::Timer,
    mutation::{BatchMutator, MutationEntry},
    option::ClientOption,
    read::{self, ReadRequest},
    row::Row,
    transport::{ConsistencyTransport, MutateRowsTransport, ReadRowsTransport},
};

/// Handle on one table: a transport, the timer driving retries, and the
/// options every operation started from it uses.
///
/// Cloning is cheap and clones share the transport.
pub struct Table<T: ?Sized, E> {
    transport: Arc<T>,
    timer: E,
    option: ClientOption,
}

impl<T: ?Sized, E: Clone> Clone for Table<T, E> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            timer: self.timer.clone(),
            option: self.option.clone(),
        }
    }
}

impl<T, E> Table<T, E>
where
    T: ?Sized,
    E: Timer,
{
    pub fn new(transport: Arc<T>, timer: E) -> Self {
        Self {
            transport,
            timer,
            option: ClientOption::default(),
        }
    }

    pub fn with_option(self, option: ClientOption) -> Self {
        Table { option, ..self }
    }

    pub fn option(&self) -> &ClientOption {
        &self.option
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }
}

impl<T, E> Table<T, E>
where
    T: ReadRowsTransport + ?Sized,
    E: Timer,
{
    /// Stream the rows selected by `request`, resuming transparently after
    /// retryable transport failures.
    pub fn read_rows(
        &self,
        request: ReadRequest,
    ) -> impl Stream<Item = Result<Row, ClientError>> + Send + '_ {
        read::read_rows(&*self.transport, &self.timer, &self.option.read_retry, request)
    }

    /// Collect every row selected by `request`.
    pub async fn get_rows(&self, request: ReadRequest) -> Result<Vec<Row>, ClientError> {
        read::get_rows(&*self.transport, &self.timer, &self.option.read_retry, request).await
    }
}

impl<T, E> Table<T, E>
where
    T: MutateRowsTransport + ?Sized,
    E: Timer,
{
    /// Apply a batch of row mutations, retrying only entries that failed
    /// transiently.
    pub async fn mutate(&self, entries: Vec<MutationEntry>) -> Result<(), ClientError> {
        BatchMutator::new(&*self.transport, &self.timer, &self.option.mutate_retry)
            .mutate(entries)
            .await
    }
}

impl<T, E> Table<T, E>
where
    T: ConsistencyTransport + ?Sized,
    E: Timer,
{
    pub async fn wait_for_consistency(&self, token: &ConsistencyToken) -> Result<bool, ClientError> {
        self.waiter().wait(token).await
    }

    /// Wait until every write issued before this call is replicated.
    pub async fn wait_for_replication(&self) -> Result<bool, ClientError> {
        self.waiter().wait_for_replication().await
    }

    fn waiter(&self) -> ConsistencyWaiter<'_, T, E> {
        ConsistencyWaiter::new(&*self.transport, &self.timer, &self.option.consistency)
    }
}
