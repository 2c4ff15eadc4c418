#[cfg(feature = "tokio")]
pub mod tokio;

use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;

/// Clock and delay source used by every retry loop and poller.
///
/// Delays between attempts are genuine suspension points: implementations must
/// hand control back to the runtime instead of spinning.
pub trait Timer: Send + Sync {
    /// Future that resolves once `dur` has elapsed.
    fn sleep(&self, dur: Duration) -> BoxFuture<'static, ()>;

    /// Current instant on this timer's clock.
    fn now(&self) -> Instant;
}

impl<T> Timer for &T
where
    T: Timer + ?Sized,
{
    fn sleep(&self, dur: Duration) -> BoxFuture<'static, ()> {
        (**self).sleep(dur)
    }

    fn now(&self) -> Instant {
        (**self).now()
    }
}

impl<T> Timer for std::sync::Arc<T>
where
    T: Timer + ?Sized,
{
    fn sleep(&self, dur: Duration) -> BoxFuture<'static, ()> {
        (**self).sleep(dur)
    }

    fn now(&self) -> Instant {
        (**self).now()
    }
}
