//! Reassembly of streamed read chunks into committed rows.
//!
//! A read response arrives as a sequence of [`Chunk`]s, each covering all or
//! part of one cell. Chunks omit the row key, family and qualifier when they
//! continue the context of the previous chunk, and a cell value may be split
//! across several chunks. [`ChunkReassembler`] is the state machine that turns
//! that sequence back into [`Row`]s, emitting a row only once its commit
//! marker arrives.

mod error;

use std::mem;

use bytes::{Bytes, BytesMut};

pub use self::error::ProtocolViolation;
use crate::{
    observability::log_debug,
    row::{Cell, Row},
};

/// One wire-level unit of a streamed read response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Chunk {
    pub row_key: Option<Bytes>,
    pub family_name: Option<String>,
    pub qualifier: Option<Bytes>,
    pub timestamp_micros: Option<i64>,
    pub labels: Vec<String>,
    pub value: Bytes,
    /// Total length of a value split across chunks, set on its first chunk.
    /// Zero means this chunk holds the whole value.
    pub value_size: usize,
    pub commit_row: bool,
    pub reset_row: bool,
    pub last_scanned_row_key: Option<Bytes>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_key(self, row_key: impl Into<Bytes>) -> Self {
        Chunk {
            row_key: Some(row_key.into()),
            ..self
        }
    }

    pub fn family(self, family_name: impl Into<String>) -> Self {
        Chunk {
            family_name: Some(family_name.into()),
            ..self
        }
    }

    pub fn qualifier(self, qualifier: impl Into<Bytes>) -> Self {
        Chunk {
            qualifier: Some(qualifier.into()),
            ..self
        }
    }

    pub fn timestamp(self, timestamp_micros: i64) -> Self {
        Chunk {
            timestamp_micros: Some(timestamp_micros),
            ..self
        }
    }

    pub fn labels(self, labels: Vec<String>) -> Self {
        Chunk { labels, ..self }
    }

    pub fn value(self, value: impl Into<Bytes>) -> Self {
        Chunk {
            value: value.into(),
            ..self
        }
    }

    pub fn value_size(self, value_size: usize) -> Self {
        Chunk { value_size, ..self }
    }

    pub fn commit(self) -> Self {
        Chunk {
            commit_row: true,
            ..self
        }
    }

    pub fn reset(self) -> Self {
        Chunk {
            reset_row: true,
            ..self
        }
    }

    pub fn last_scanned(self, row_key: impl Into<Bytes>) -> Self {
        Chunk {
            last_scanned_row_key: Some(row_key.into()),
            ..self
        }
    }

    /// A heartbeat that only reports how far the server has scanned.
    fn is_scan_marker(&self) -> bool {
        self.last_scanned_row_key.is_some()
            && self.row_key.is_none()
            && !self.commit_row
            && !self.reset_row
            && !self.carries_cell()
    }

    fn carries_cell(&self) -> bool {
        self.family_name.is_some()
            || self.qualifier.is_some()
            || self.timestamp_micros.is_some()
            || !self.labels.is_empty()
            || !self.value.is_empty()
            || self.value_size > 0
    }
}

/// Read-only snapshot of how far a read has progressed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Checkpoint {
    last_row_key: Option<Bytes>,
    last_scanned_row_key: Option<Bytes>,
}

impl Checkpoint {
    /// Key of the last row emitted.
    pub fn last_row_key(&self) -> Option<&Bytes> {
        self.last_row_key.as_ref()
    }

    /// Last key the server reported as scanned, possibly without a row.
    pub fn last_scanned_row_key(&self) -> Option<&Bytes> {
        self.last_scanned_row_key.as_ref()
    }

    /// Greatest key known to be fully delivered: a resumed read starts after it.
    pub fn resume_key(&self) -> Option<&Bytes> {
        match (&self.last_row_key, &self.last_scanned_row_key) {
            (Some(row), Some(scanned)) => Some(row.max(scanned)),
            (row, scanned) => row.as_ref().or(scanned.as_ref()),
        }
    }

    fn advance_scanned(&mut self, key: Bytes) {
        if self.last_scanned_row_key.as_ref().map_or(true, |seen| key > *seen) {
            self.last_scanned_row_key = Some(key);
        }
    }
}

/// Column and timestamp of the cell currently being assembled.
#[derive(Debug)]
struct CellHead {
    family: String,
    qualifier: Bytes,
    timestamp_micros: i64,
    labels: Vec<String>,
}

impl CellHead {
    fn into_cell(self, value: Bytes) -> Cell {
        Cell::new(self.family, self.qualifier, self.timestamp_micros, value).with_labels(self.labels)
    }
}

#[derive(Debug)]
struct PartialCell {
    head: CellHead,
    value: BytesMut,
    remaining: usize,
}

/// State of a row whose commit marker has not arrived yet.
#[derive(Debug)]
struct OpenRow {
    row: Row,
    family: Option<String>,
    qualifier: Option<Bytes>,
    partial: Option<PartialCell>,
}

impl OpenRow {
    fn new(key: Bytes) -> Self {
        Self {
            row: Row::empty(key),
            family: None,
            qualifier: None,
            partial: None,
        }
    }

    fn apply(&mut self, chunk: Chunk) -> Result<(), ProtocolViolation> {
        if let Some(mut partial) = self.partial.take() {
            if chunk.row_key.is_some()
                || chunk.family_name.is_some()
                || chunk.qualifier.is_some()
                || chunk.timestamp_micros.is_some()
            {
                return Err(ProtocolViolation::ContextChangeMidCell {
                    row_key: self.row.key().clone(),
                });
            }
            if chunk.value.len() > partial.remaining {
                return Err(ProtocolViolation::ValueOverflow {
                    row_key: self.row.key().clone(),
                    remaining: partial.remaining,
                    received: chunk.value.len(),
                });
            }
            partial.remaining -= chunk.value.len();
            partial.value.extend_from_slice(&chunk.value);
            if partial.remaining == 0 {
                self.row
                    .push_cell(partial.head.into_cell(partial.value.freeze()));
            } else {
                self.partial = Some(partial);
            }
            return Ok(());
        }

        // a bare commit closes the row without adding a cell
        if chunk.commit_row && !chunk.carries_cell() {
            return Ok(());
        }

        if let Some(family) = chunk.family_name {
            self.family = Some(family);
            self.qualifier = None;
        }
        if let Some(qualifier) = chunk.qualifier {
            self.qualifier = Some(qualifier);
        }
        let head = CellHead {
            family: self
                .family
                .clone()
                .ok_or(ProtocolViolation::MissingContext { field: "family" })?,
            qualifier: self
                .qualifier
                .clone()
                .ok_or(ProtocolViolation::MissingContext { field: "qualifier" })?,
            timestamp_micros: chunk.timestamp_micros.unwrap_or_default(),
            labels: chunk.labels,
        };

        let received = chunk.value.len();
        if chunk.value_size == 0 || received == chunk.value_size {
            self.row.push_cell(head.into_cell(chunk.value));
        } else if received < chunk.value_size {
            let mut value = BytesMut::with_capacity(chunk.value_size);
            value.extend_from_slice(&chunk.value);
            self.partial = Some(PartialCell {
                head,
                value,
                remaining: chunk.value_size - received,
            });
        } else {
            return Err(ProtocolViolation::ValueOverflow {
                row_key: self.row.key().clone(),
                remaining: chunk.value_size,
                received,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
enum State {
    #[default]
    AwaitingRow,
    RowOpen(OpenRow),
}

/// Turns an ordered chunk sequence into committed rows.
///
/// One reassembler serves exactly one read attempt; independent reads use
/// independent reassemblers.
#[derive(Debug, Default)]
pub struct ChunkReassembler {
    state: State,
    checkpoint: Checkpoint,
}

impl ChunkReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reassembler for a read resumed after `row_key`: every new row must sort
    /// after it.
    pub fn resume_after(row_key: Bytes) -> Self {
        Self {
            state: State::AwaitingRow,
            checkpoint: Checkpoint {
                last_row_key: None,
                last_scanned_row_key: Some(row_key),
            },
        }
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    pub fn is_row_open(&self) -> bool {
        matches!(self.state, State::RowOpen(_))
    }

    /// Feed the next chunk, returning the row it committed, if any.
    pub fn push(&mut self, chunk: Chunk) -> Result<Option<Row>, ProtocolViolation> {
        // reset overrides every other field of the chunk
        if chunk.reset_row {
            if let State::RowOpen(open) = mem::take(&mut self.state) {
                log_debug!(
                    component = "reassembler",
                    event = "row_reset",
                    row_key = ?open.row.key(),
                );
            }
            return Ok(None);
        }

        if chunk.is_scan_marker() {
            if let State::RowOpen(open) = &self.state {
                return Err(ProtocolViolation::ScanMarkerInsideRow {
                    row_key: open.row.key().clone(),
                });
            }
            if let Some(key) = chunk.last_scanned_row_key {
                self.checkpoint.advance_scanned(key);
            }
            return Ok(None);
        }

        let mut open = match mem::take(&mut self.state) {
            State::AwaitingRow => {
                let Some(key) = chunk.row_key.clone() else {
                    if chunk.commit_row {
                        return Err(ProtocolViolation::CommitWithoutRow);
                    }
                    return Err(ProtocolViolation::MissingContext { field: "row key" });
                };
                if let Some(previous) = self.checkpoint.resume_key() {
                    if key <= *previous {
                        return Err(ProtocolViolation::RowKeyOutOfOrder {
                            previous: previous.clone(),
                            current: key,
                        });
                    }
                }
                OpenRow::new(key)
            }
            State::RowOpen(open) => {
                if let Some(key) = &chunk.row_key {
                    if key != open.row.key() {
                        return Err(ProtocolViolation::RowKeyChanged {
                            open: open.row.key().clone(),
                            received: key.clone(),
                        });
                    }
                }
                open
            }
        };

        let commit = chunk.commit_row;
        let last_scanned = chunk.last_scanned_row_key.clone();
        open.apply(chunk)?;

        if !commit {
            self.state = State::RowOpen(open);
            return Ok(None);
        }
        if let Some(partial) = &open.partial {
            return Err(ProtocolViolation::TruncatedCell {
                row_key: open.row.key().clone(),
                remaining: partial.remaining,
            });
        }
        let row = open.row;
        self.checkpoint.last_row_key = Some(row.key().clone());
        if let Some(key) = last_scanned {
            self.checkpoint.advance_scanned(key);
        }
        Ok(Some(row))
    }

    /// Signal the end of the chunk sequence. Fails if a row is still open.
    pub fn finish(&self) -> Result<(), ProtocolViolation> {
        match &self.state {
            State::AwaitingRow => Ok(()),
            State::RowOpen(open) => Err(ProtocolViolation::IncompleteRow {
                row_key: open.row.key().clone(),
            }),
        }
    }
}

/// Lazily reassemble `chunks` with a fresh reassembler.
pub fn reassemble<I>(chunks: I) -> Rows<I::IntoIter>
where
    I: IntoIterator<Item = Chunk>,
{
    Rows {
        chunks: chunks.into_iter(),
        reassembler: ChunkReassembler::new(),
        done: false,
    }
}

/// Iterator over the rows of a chunk sequence. Yields at most one error, then
/// ends.
#[derive(Debug)]
pub struct Rows<I> {
    chunks: I,
    reassembler: ChunkReassembler,
    done: bool,
}

impl<I> Rows<I> {
    pub fn checkpoint(&self) -> &Checkpoint {
        self.reassembler.checkpoint()
    }
}

impl<I> Iterator for Rows<I>
where
    I: Iterator<Item = Chunk>,
{
    type Item = Result<Row, ProtocolViolation>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        for chunk in self.chunks.by_ref() {
            match self.reassembler.push(chunk) {
                Ok(Some(row)) => return Some(Ok(row)),
                Ok(None) => {}
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
        self.done = true;
        self.reassembler.finish().err().map(Err)
    }
}
