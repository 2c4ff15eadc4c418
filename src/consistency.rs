//! Waiting for writes to replicate.

use std::fmt;

use futures_util::future::{self, Either};

use crate::{
    error::ClientError,
    executor::Timer,
    observability::{log_debug, log_info},
    option::ConsistencyOption,
    transport::ConsistencyTransport,
};

/// Opaque marker covering every write issued before it was generated.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConsistencyToken(String);

impl ConsistencyToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConsistencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Polls `check_consistency` with a growing delay under one overall deadline.
pub struct ConsistencyWaiter<'a, T: ?Sized, E: ?Sized> {
    transport: &'a T,
    timer: &'a E,
    option: &'a ConsistencyOption,
}

impl<'a, T, E> ConsistencyWaiter<'a, T, E>
where
    T: ConsistencyTransport + ?Sized,
    E: Timer + ?Sized,
{
    pub fn new(transport: &'a T, timer: &'a E, option: &'a ConsistencyOption) -> Self {
        Self {
            transport,
            timer,
            option,
        }
    }

    /// Returns `Ok(true)` once `token` is consistent and `Ok(false)` if the
    /// deadline passes first. A timeout past the clock's range never expires.
    pub async fn wait(&self, token: &ConsistencyToken) -> Result<bool, ClientError> {
        let deadline = self.timer.now().checked_add(self.option.timeout);
        let mut polls: u32 = 0;

        loop {
            let remaining = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(self.timer.now());
                    if remaining.is_zero() {
                        return Ok(self.timed_out(polls));
                    }
                    Some(remaining)
                }
                None => None,
            };

            polls += 1;
            let check = self.transport.check_consistency(token);
            let result = match remaining {
                Some(remaining) => match future::select(check, self.timer.sleep(remaining)).await {
                    Either::Left((result, _)) => result,
                    Either::Right(_) => return Ok(self.timed_out(polls)),
                },
                None => check.await,
            };
            let consistent = result.map_err(ClientError::Consistency)?;
            log_debug!(
                component = "consistency",
                event = "consistency_poll",
                poll = polls,
                consistent = consistent,
            );
            if consistent {
                log_info!(
                    component = "consistency",
                    event = "consistency_reached",
                    polls = polls,
                );
                return Ok(true);
            }

            let delay = self.option.backoff.delay(polls);
            if let Some(deadline) = deadline {
                match self.timer.now().checked_add(delay) {
                    Some(wake) if wake < deadline => {}
                    _ => return Ok(self.timed_out(polls)),
                }
            }
            self.timer.sleep(delay).await;
        }
    }

    /// Generate a token for the writes issued so far and wait on it.
    pub async fn wait_for_replication(&self) -> Result<bool, ClientError> {
        let token = self
            .transport
            .generate_consistency_token()
            .await
            .map_err(ClientError::Consistency)?;
        log_debug!(
            component = "consistency",
            event = "consistency_token_generated",
            token = %token,
        );
        self.wait(&token).await
    }

    fn timed_out(&self, polls: u32) -> bool {
        log_info!(
            component = "consistency",
            event = "consistency_deadline_elapsed",
            polls = polls,
            timeout_ms = self.option.timeout.as_millis() as u64,
        );
        false
    }
}
