use bytes::Bytes;
use thiserror::Error;

/// A chunk sequence that breaks the reassembly protocol. Always fatal to the
/// read it occurred in; never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("chunk omits the {field} and no earlier chunk established one")]
    MissingContext { field: &'static str },
    #[error("row key {current:?} does not sort after {previous:?}")]
    RowKeyOutOfOrder { previous: Bytes, current: Bytes },
    #[error("row {open:?} must be committed before row {received:?} starts")]
    RowKeyChanged { open: Bytes, received: Bytes },
    #[error("commit marker received with no open row")]
    CommitWithoutRow,
    #[error("row {row_key:?} committed with {remaining} bytes of a split cell outstanding")]
    TruncatedCell { row_key: Bytes, remaining: usize },
    #[error("split cell in row {row_key:?} expected at most {remaining} more bytes, got {received}")]
    ValueOverflow {
        row_key: Bytes,
        remaining: usize,
        received: usize,
    },
    #[error("chunk continuing a split cell in row {row_key:?} carries row or column context")]
    ContextChangeMidCell { row_key: Bytes },
    #[error("scan marker received inside open row {row_key:?}")]
    ScanMarkerInsideRow { row_key: Bytes },
    #[error("chunk stream ended inside row {row_key:?}")]
    IncompleteRow { row_key: Bytes },
}
