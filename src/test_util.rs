use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use bytes::Bytes;
use futures_util::{
    future::{self, BoxFuture},
    stream::{self, BoxStream},
    FutureExt, StreamExt,
};

use crate::{
    chunk::Chunk,
    consistency::ConsistencyToken,
    executor::Timer,
    mutation::MutationEntry,
    read::ReadRequest,
    status::{Code, Status},
    transport::{
        ConsistencyTransport, MutateRowsResponse, MutateRowsTransport, ReadRowsResponse,
        ReadRowsTransport,
    },
};

/// A single cell laid out for chunking.
pub(crate) struct CellSpec {
    row_key: Bytes,
    family: String,
    qualifier: Bytes,
    timestamp_micros: i64,
    value: Bytes,
}

impl CellSpec {
    pub(crate) fn new(
        row_key: impl Into<Bytes>,
        family: impl Into<String>,
        qualifier: impl Into<Bytes>,
        timestamp_micros: i64,
        value: impl Into<Bytes>,
    ) -> Self {
        Self {
            row_key: row_key.into(),
            family: family.into(),
            qualifier: qualifier.into(),
            timestamp_micros,
            value: value.into(),
        }
    }
}

/// Split one cell's value across `pieces` chunks. Nothing is committed.
pub(crate) fn split_cell(cell: CellSpec, pieces: usize) -> Vec<Chunk> {
    let len = cell.value.len();
    let pieces = pieces.clamp(1, len.max(1));
    let bounds: Vec<usize> = (0..=pieces).map(|i| i * len / pieces).collect();

    bounds
        .windows(2)
        .enumerate()
        .map(|(i, window)| {
            let piece = cell.value.slice(window[0]..window[1]);
            if i > 0 {
                return Chunk::new().value(piece);
            }
            let head = Chunk::new()
                .row_key(cell.row_key.clone())
                .family(cell.family.clone())
                .qualifier(cell.qualifier.clone())
                .timestamp(cell.timestamp_micros)
                .value(piece);
            if pieces > 1 {
                head.value_size(len)
            } else {
                head
            }
        })
        .collect()
}

/// A committed row with `cells` single-chunk cells in family "f".
pub(crate) fn row_chunks(key: impl Into<Bytes>, cells: usize) -> Vec<Chunk> {
    let key = key.into();
    (0..cells)
        .map(|i| {
            let chunk = Chunk::new()
                .family("f")
                .qualifier(format!("q{i}"))
                .timestamp(1)
                .value(format!("{}-{i}", String::from_utf8_lossy(&key)));
            let chunk = if i == 0 {
                chunk.row_key(key.clone())
            } else {
                chunk
            };
            if i + 1 == cells {
                chunk.commit()
            } else {
                chunk
            }
        })
        .collect()
}

enum CheckScript {
    Ready(Result<bool, Status>),
    Pending,
}

/// Transport that replays scripted responses and records what it was asked.
#[derive(Default)]
pub(crate) struct FakeTransport {
    reads: Mutex<VecDeque<Vec<Result<ReadRowsResponse, Status>>>>,
    read_requests: Mutex<Vec<ReadRequest>>,
    mutates: Mutex<VecDeque<Vec<Result<MutateRowsResponse, Status>>>>,
    mutate_batches: Mutex<Vec<Vec<MutationEntry>>>,
    tokens: Mutex<VecDeque<Result<ConsistencyToken, Status>>>,
    checks: Mutex<VecDeque<CheckScript>>,
    checked_tokens: Mutex<Vec<ConsistencyToken>>,
}

impl FakeTransport {
    /// Responses for the next `read_rows` call.
    pub(crate) fn script_read(&self, responses: Vec<Result<ReadRowsResponse, Status>>) {
        self.reads.lock().unwrap().push_back(responses);
    }

    pub(crate) fn script_mutate(&self, responses: Vec<Result<MutateRowsResponse, Status>>) {
        self.mutates.lock().unwrap().push_back(responses);
    }

    pub(crate) fn script_token(&self, token: Result<ConsistencyToken, Status>) {
        self.tokens.lock().unwrap().push_back(token);
    }

    pub(crate) fn script_check(&self, result: Result<bool, Status>) {
        self.checks
            .lock()
            .unwrap()
            .push_back(CheckScript::Ready(result));
    }

    /// The next check never completes.
    pub(crate) fn script_check_pending(&self) {
        self.checks.lock().unwrap().push_back(CheckScript::Pending);
    }

    pub(crate) fn read_requests(&self) -> Vec<ReadRequest> {
        self.read_requests.lock().unwrap().clone()
    }

    pub(crate) fn mutate_batches(&self) -> Vec<Vec<MutationEntry>> {
        self.mutate_batches.lock().unwrap().clone()
    }

    pub(crate) fn checked_tokens(&self) -> Vec<ConsistencyToken> {
        self.checked_tokens.lock().unwrap().clone()
    }

    pub(crate) fn check_calls(&self) -> usize {
        self.checked_tokens.lock().unwrap().len()
    }
}

impl ReadRowsTransport for FakeTransport {
    fn read_rows(&self, request: ReadRequest) -> BoxStream<'_, Result<ReadRowsResponse, Status>> {
        self.read_requests.lock().unwrap().push(request);
        let responses = self.reads.lock().unwrap().pop_front().unwrap_or_default();
        stream::iter(responses).boxed()
    }
}

impl MutateRowsTransport for FakeTransport {
    fn mutate_rows(
        &self,
        entries: Vec<MutationEntry>,
    ) -> BoxStream<'_, Result<MutateRowsResponse, Status>> {
        self.mutate_batches.lock().unwrap().push(entries);
        let responses = self.mutates.lock().unwrap().pop_front().unwrap_or_default();
        stream::iter(responses).boxed()
    }
}

impl ConsistencyTransport for FakeTransport {
    fn generate_consistency_token(&self) -> BoxFuture<'_, Result<ConsistencyToken, Status>> {
        let token = self
            .tokens
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Status::new(Code::Internal, "unscripted token")));
        future::ready(token).boxed()
    }

    fn check_consistency<'a>(
        &'a self,
        token: &'a ConsistencyToken,
    ) -> BoxFuture<'a, Result<bool, Status>> {
        self.checked_tokens.lock().unwrap().push(token.clone());
        match self.checks.lock().unwrap().pop_front() {
            Some(CheckScript::Ready(result)) => future::ready(result).boxed(),
            Some(CheckScript::Pending) => future::pending::<Result<bool, Status>>().boxed(),
            None => future::ready(Err(Status::new(Code::Internal, "unscripted check"))).boxed(),
        }
    }
}

#[derive(Debug)]
struct Clock {
    base: Instant,
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

/// Virtual clock: a sleep completes on first poll and moves time forward.
#[derive(Clone, Debug)]
pub(crate) struct ManualTimer {
    clock: Arc<Mutex<Clock>>,
}

impl ManualTimer {
    pub(crate) fn new() -> Self {
        Self {
            clock: Arc::new(Mutex::new(Clock {
                base: Instant::now(),
                elapsed: Duration::ZERO,
                sleeps: Vec::new(),
            })),
        }
    }

    /// Every sleep that ran, in order.
    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.clock.lock().unwrap().sleeps.clone()
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.clock.lock().unwrap().elapsed
    }
}

impl Timer for ManualTimer {
    fn sleep(&self, dur: Duration) -> BoxFuture<'static, ()> {
        let clock = self.clock.clone();
        async move {
            let mut clock = clock.lock().unwrap();
            clock.sleeps.push(dur);
            clock.elapsed += dur;
        }
        .boxed()
    }

    fn now(&self) -> Instant {
        let clock = self.clock.lock().unwrap();
        clock.base + clock.elapsed
    }
}
