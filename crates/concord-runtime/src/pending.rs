//! In-flight hand-off tracking
//!
//! Every hand-off is counted before it is queued and released after the
//! receiving peer has finished with it, including any hand-offs that peer
//! queued in turn. The count therefore only reaches zero once the whole
//! protocol run has drained.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use concord_core::{ConcordError, ConcordResult};
use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct Pending {
    count: AtomicUsize,
    idle: Notify,
}

impl Pending {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one hand-off about to be queued
    #[inline]
    pub fn begin(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    /// Release one hand-off
    pub fn end(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Release one hand-off when the returned guard drops, unwinding included
    pub fn release_on_drop(&self) -> Release<'_> {
        Release(self)
    }

    pub fn in_flight(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Wait until no hand-off is in flight
    pub async fn wait_idle(&self, timeout: Duration) -> ConcordResult<()> {
        let drained = async {
            loop {
                let notified = self.idle.notified();
                tokio::pin!(notified);
                // Register before checking so a wake-up between the check
                // and the await is not lost
                notified.as_mut().enable();

                if self.in_flight() == 0 {
                    return;
                }
                notified.await;
            }
        };

        tokio::time::timeout(timeout, drained)
            .await
            .map_err(|_| ConcordError::Timeout)
    }
}

/// Guard returned by [`Pending::release_on_drop`]
#[must_use = "the hand-off is released as soon as the guard drops"]
pub struct Release<'a>(&'a Pending);

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.0.end();
    }
}
