//! Resilient reads: a row stream assembled from as many transport attempts as
//! it takes, without duplicates or gaps.

mod request;

use async_stream::stream;
use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;

pub use self::request::{ReadRequest, RowFilter};
use crate::{
    chunk::ChunkReassembler,
    error::ClientError,
    executor::Timer,
    observability::{log_debug, log_warn},
    option::RetryOption,
    row::Row,
    status::Status,
    transport::{ReadRowsResponse, ReadRowsTransport},
};

/// How much of the original request has been delivered across attempts.
#[derive(Debug, Default)]
struct ReadProgress {
    resume_key: Option<Bytes>,
    rows_read: u64,
}

/// Stream the rows selected by `request`.
///
/// Each attempt feeds its chunks through a fresh [`ChunkReassembler`] and
/// yields rows as soon as they commit. When an attempt fails with a retryable
/// status the next one asks only for keys after the last delivered (or
/// scanned) key. Dropping the stream stops all further attempts.
pub fn read_rows<'a, T, E>(
    transport: &'a T,
    timer: &'a E,
    option: &'a RetryOption,
    request: ReadRequest,
) -> impl Stream<Item = Result<Row, ClientError>> + Send + 'a
where
    T: ReadRowsTransport + ?Sized,
    E: Timer + ?Sized,
{
    stream! {
        let mut progress = ReadProgress::default();
        let mut retries = 0;
        let mut next_request = Some(request.clone());

        while let Some(attempt_request) = next_request.take() {
            log_debug!(
                component = "read",
                event = "read_attempt",
                attempt = retries + 1,
                resume_key = ?progress.resume_key,
            );
            let mut reassembler = match progress.resume_key.clone() {
                Some(key) => ChunkReassembler::resume_after(key),
                None => ChunkReassembler::new(),
            };
            let mut responses = transport.read_rows(attempt_request);
            let mut interrupted: Option<Status> = None;

            while let Some(response) = responses.next().await {
                let chunks = match response {
                    Ok(ReadRowsResponse::Accepted) => continue,
                    Ok(ReadRowsResponse::Chunks(chunks)) => chunks,
                    Err(status) => {
                        interrupted = Some(status);
                        break;
                    }
                };
                for chunk in chunks {
                    match reassembler.push(chunk) {
                        Ok(Some(row)) => {
                            progress.rows_read += 1;
                            yield Ok(row);
                        }
                        Ok(None) => {}
                        Err(violation) => {
                            yield Err(ClientError::Protocol(violation));
                            return;
                        }
                    }
                }
            }
            drop(responses);

            let Some(status) = interrupted else {
                match reassembler.finish() {
                    Ok(()) => log_debug!(
                        component = "read",
                        event = "read_complete",
                        attempts = retries + 1,
                        rows_read = progress.rows_read,
                    ),
                    Err(violation) => {
                        yield Err(ClientError::Protocol(violation));
                    }
                }
                return;
            };

            progress.resume_key = reassembler.checkpoint().resume_key().cloned();
            next_request = request.resume_after(progress.resume_key.as_ref(), progress.rows_read);
            if next_request.is_none() {
                log_debug!(
                    component = "read",
                    event = "read_complete_before_retry",
                    code = %status.code(),
                    rows_read = progress.rows_read,
                );
                return;
            }
            if !option.is_retryable(status.code()) || retries >= option.max_retries {
                log_warn!(
                    component = "read",
                    event = "read_failed",
                    code = %status.code(),
                    retries = retries,
                    rows_read = progress.rows_read,
                );
                yield Err(ClientError::Transport(status));
                return;
            }

            retries += 1;
            let delay = option.backoff.delay(retries);
            log_warn!(
                component = "read",
                event = "read_retry_scheduled",
                code = %status.code(),
                retry = retries,
                delay_ms = delay.as_millis() as u64,
                resume_key = ?progress.resume_key,
            );
            timer.sleep(delay).await;
        }
    }
}

/// Collect every row of `request`, failing on the first error.
pub async fn get_rows<T, E>(
    transport: &T,
    timer: &E,
    option: &RetryOption,
    request: ReadRequest,
) -> Result<Vec<Row>, ClientError>
where
    T: ReadRowsTransport + ?Sized,
    E: Timer + ?Sized,
{
    let rows = read_rows(transport, timer, option, request);
    futures_util::pin_mut!(rows);
    let mut out = Vec::new();
    while let Some(row) = rows.next().await {
        out.push(row?);
    }
    Ok(out)
}
