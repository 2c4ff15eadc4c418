//! Batched row writes with per-entry retries.

use std::mem;

use bytes::Bytes;
use futures_util::StreamExt;
use thiserror::Error;

use crate::{
    error::ClientError,
    executor::Timer,
    observability::{log_debug, log_warn},
    option::RetryOption,
    status::{Code, Status},
    transport::{MutateRowsResponse, MutateRowsTransport},
};

/// One change to a row. Values and qualifiers are already encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    /// Write `value` at `timestamp_micros`; `None` lets the server assign it.
    SetCell {
        family: String,
        qualifier: Bytes,
        timestamp_micros: Option<i64>,
        value: Bytes,
    },
    /// Delete cells of one column, optionally only those with timestamps in
    /// `[start_micros, end_micros)`.
    DeleteFromColumn {
        family: String,
        qualifier: Bytes,
        start_micros: Option<i64>,
        end_micros: Option<i64>,
    },
    DeleteFromFamily {
        family: String,
    },
    DeleteFromRow,
}

/// All mutations for one row key. The transport applies them in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationEntry {
    key: Bytes,
    mutations: Vec<Mutation>,
}

impl MutationEntry {
    pub fn new(key: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            mutations: Vec::new(),
        }
    }

    pub fn push(mut self, mutation: Mutation) -> Self {
        self.mutations.push(mutation);
        self
    }

    pub fn set_cell(
        self,
        family: impl Into<String>,
        qualifier: impl Into<Bytes>,
        timestamp_micros: Option<i64>,
        value: impl Into<Bytes>,
    ) -> Self {
        self.push(Mutation::SetCell {
            family: family.into(),
            qualifier: qualifier.into(),
            timestamp_micros,
            value: value.into(),
        })
    }

    pub fn delete_column(self, family: impl Into<String>, qualifier: impl Into<Bytes>) -> Self {
        self.push(Mutation::DeleteFromColumn {
            family: family.into(),
            qualifier: qualifier.into(),
            start_micros: None,
            end_micros: None,
        })
    }

    pub fn delete_family(self, family: impl Into<String>) -> Self {
        self.push(Mutation::DeleteFromFamily {
            family: family.into(),
        })
    }

    pub fn delete_row(self) -> Self {
        self.push(Mutation::DeleteFromRow)
    }

    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }
}

/// Status of one entry, indexed into the batch it was submitted with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryOutcome {
    pub index: usize,
    pub status: Status,
}

impl EntryOutcome {
    pub fn new(index: usize, status: Status) -> Self {
        Self { index, status }
    }
}

/// An entry that will not be retried, with the status that decided it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailedEntry {
    /// Position in the batch the caller submitted.
    pub index: usize,
    pub entry: MutationEntry,
    pub status: Status,
}

/// Every permanently failed entry of a batch, in submission order. Entries
/// missing from it were applied.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{} of {} mutation entries failed", .failed.len(), .total)]
pub struct PartialFailure {
    failed: Vec<FailedEntry>,
    total: usize,
}

impl PartialFailure {
    pub fn failed(&self) -> &[FailedEntry] {
        &self.failed
    }

    /// Size of the batch the caller submitted.
    pub fn total(&self) -> usize {
        self.total
    }

    /// The failed entries, ready to be resubmitted.
    pub fn into_entries(self) -> Vec<MutationEntry> {
        self.failed.into_iter().map(|failed| failed.entry).collect()
    }
}

#[derive(Debug)]
struct Pending {
    index: usize,
    entry: MutationEntry,
    last_status: Option<Status>,
}

impl Pending {
    fn fail(self, status: Status) -> FailedEntry {
        FailedEntry {
            index: self.index,
            entry: self.entry,
            status,
        }
    }

    /// Fail with the last status the entry reported, else with `fallback`.
    fn give_up(mut self, fallback: impl FnOnce() -> Status) -> FailedEntry {
        let status = self.last_status.take().unwrap_or_else(fallback);
        self.fail(status)
    }
}

/// Submits a batch and resubmits only the entries that failed transiently.
pub struct BatchMutator<'a, T: ?Sized, E: ?Sized> {
    transport: &'a T,
    timer: &'a E,
    option: &'a RetryOption,
}

impl<'a, T, E> BatchMutator<'a, T, E>
where
    T: MutateRowsTransport + ?Sized,
    E: Timer + ?Sized,
{
    pub fn new(transport: &'a T, timer: &'a E, option: &'a RetryOption) -> Self {
        Self {
            transport,
            timer,
            option,
        }
    }

    /// Apply `entries`. Fails with [`ClientError::PartialFailure`] when some
    /// entries could not be applied, or with the transport error when the
    /// batch as a whole could not be submitted.
    pub async fn mutate(&self, entries: Vec<MutationEntry>) -> Result<(), ClientError> {
        if entries.is_empty() {
            return Ok(());
        }
        let total = entries.len();
        let mut pending: Vec<Pending> = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| Pending {
                index,
                entry,
                last_status: None,
            })
            .collect();
        let mut failed = Vec::new();
        let mut any_outcome = false;
        let mut retries = 0;

        loop {
            log_debug!(
                component = "mutate",
                event = "mutate_attempt",
                attempt = retries + 1,
                entries = pending.len(),
            );
            let batch = pending.iter().map(|p| p.entry.clone()).collect();
            let mut responses = self.transport.mutate_rows(batch);
            let mut outcomes: Vec<Option<Status>> = vec![None; pending.len()];
            let mut accepted = false;
            let mut attempt_outcome = false;
            let mut interrupted = None;

            while let Some(response) = responses.next().await {
                match response {
                    Ok(MutateRowsResponse::Accepted) => accepted = true,
                    Ok(MutateRowsResponse::Entries(reported)) => {
                        for EntryOutcome { index, status } in reported {
                            let Some(slot) = outcomes.get_mut(index) else {
                                log_warn!(
                                    component = "mutate",
                                    event = "outcome_index_out_of_range",
                                    index = index,
                                    submitted = pending.len(),
                                );
                                continue;
                            };
                            *slot = Some(status);
                            attempt_outcome = true;
                        }
                    }
                    Err(status) => {
                        interrupted = Some(status);
                        break;
                    }
                }
            }
            drop(responses);

            if let Some(status) = &interrupted {
                if retries == 0 && !accepted && !attempt_outcome {
                    log_warn!(
                        component = "mutate",
                        event = "mutate_rejected",
                        code = %status.code(),
                    );
                    return Err(ClientError::Transport(status.clone()));
                }
            }
            any_outcome |= attempt_outcome;

            for (slot, outcome) in mem::take(&mut pending).into_iter().zip(outcomes) {
                match outcome {
                    Some(status) if status.code().is_ok() => {}
                    Some(status) if self.option.is_retryable(status.code()) => {
                        pending.push(Pending {
                            last_status: Some(status),
                            ..slot
                        });
                    }
                    Some(status) => {
                        log_warn!(
                            component = "mutate",
                            event = "entry_failed",
                            index = slot.index,
                            code = %status.code(),
                        );
                        failed.push(slot.fail(status));
                    }
                    None => pending.push(slot),
                }
            }

            if pending.is_empty() {
                break;
            }
            let budget_left = retries < self.option.max_retries;
            if let Some(status) = interrupted {
                if !(budget_left && self.option.is_retryable(status.code())) {
                    if !any_outcome {
                        return Err(ClientError::Transport(status));
                    }
                    failed.extend(pending.drain(..).map(|p| p.give_up(|| status.clone())));
                    break;
                }
            } else if !budget_left {
                failed.extend(pending.drain(..).map(|p| {
                    p.give_up(|| Status::new(Code::Unknown, "no outcome reported for entry"))
                }));
                break;
            }

            retries += 1;
            let delay = self.option.backoff.delay(retries);
            log_warn!(
                component = "mutate",
                event = "mutate_retry_scheduled",
                retry = retries,
                pending = pending.len(),
                delay_ms = delay.as_millis() as u64,
            );
            self.timer.sleep(delay).await;
        }

        if failed.is_empty() {
            return Ok(());
        }
        failed.sort_by_key(|failed| failed.index);
        Err(PartialFailure { failed, total }.into())
    }
}
