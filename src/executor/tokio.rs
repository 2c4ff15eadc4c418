use std::time::{Duration, Instant};

use futures_util::future::{BoxFuture, FutureExt};

use super::Timer;

/// [`Timer`] backed by the tokio time driver.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioTimer;

impl Timer for TokioTimer {
    fn sleep(&self, dur: Duration) -> BoxFuture<'static, ()> {
        tokio::time::sleep(dur).boxed()
    }

    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}
