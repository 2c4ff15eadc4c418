use std::time::Duration;

use crate::status::Code;

/// Exponentially growing delay, capped at `max`.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    pub(crate) initial: Duration,
    pub(crate) max: Duration,
    pub(crate) multiplier: f64,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Backoff {
            initial,
            max,
            multiplier: 2.0,
        }
    }

    pub fn multiplier(self, multiplier: f64) -> Self {
        Backoff { multiplier, ..self }
    }

    /// Delay before the `attempt`-th retry, counting from 1.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.initial.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        if !scaled.is_finite() || scaled >= self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(scaled)
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::new(Duration::from_millis(10), Duration::from_secs(60))
    }
}

/// How a read or a batched write retries after a transient failure.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOption {
    pub(crate) max_retries: u32,
    pub(crate) retryable_codes: Vec<Code>,
    pub(crate) backoff: Backoff,
}

impl Default for RetryOption {
    fn default() -> Self {
        RetryOption {
            max_retries: 3,
            retryable_codes: vec![Code::DeadlineExceeded, Code::Aborted, Code::Unavailable],
            backoff: Backoff::default(),
        }
    }
}

impl RetryOption {
    pub fn max_retries(self, max_retries: u32) -> Self {
        RetryOption {
            max_retries,
            ..self
        }
    }

    pub fn retryable_codes(self, retryable_codes: impl IntoIterator<Item = Code>) -> Self {
        RetryOption {
            retryable_codes: retryable_codes.into_iter().collect(),
            ..self
        }
    }

    pub fn backoff(self, backoff: Backoff) -> Self {
        RetryOption { backoff, ..self }
    }

    pub(crate) fn is_retryable(&self, code: Code) -> bool {
        self.retryable_codes.contains(&code)
    }
}

/// How long, and how often, to poll for replication consistency.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyOption {
    pub(crate) timeout: Duration,
    pub(crate) backoff: Backoff,
}

impl Default for ConsistencyOption {
    fn default() -> Self {
        ConsistencyOption {
            timeout: Duration::from_secs(10 * 60),
            backoff: Backoff::new(Duration::from_secs(1), Duration::from_secs(5)),
        }
    }
}

impl ConsistencyOption {
    pub fn timeout(self, timeout: Duration) -> Self {
        ConsistencyOption { timeout, ..self }
    }

    pub fn backoff(self, backoff: Backoff) -> Self {
        ConsistencyOption { backoff, ..self }
    }
}

/// Caller configuration, read-only once an operation starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientOption {
    pub(crate) read_retry: RetryOption,
    pub(crate) mutate_retry: RetryOption,
    pub(crate) consistency: ConsistencyOption,
}

impl ClientOption {
    pub fn read_retry(self, read_retry: RetryOption) -> Self {
        ClientOption { read_retry, ..self }
    }

    pub fn mutate_retry(self, mutate_retry: RetryOption) -> Self {
        ClientOption {
            mutate_retry,
            ..self
        }
    }

    pub fn consistency(self, consistency: ConsistencyOption) -> Self {
        ClientOption {
            consistency,
            ..self
        }
    }
}
