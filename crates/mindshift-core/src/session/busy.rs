//! Single in-flight request guard.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct BusyInner {
    busy: AtomicBool,
    released: Notify,
}

/// Shared busy flag for one session.
///
/// True from the moment a request to the authority is claimed until its
/// reply has been applied. A [`BusyPermit`] represents the claim and clears
/// the flag when dropped.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag {
    inner: Arc<BusyInner>,
}

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Claims the flag, or returns `None` if a request is already in flight.
    pub fn try_acquire(&self) -> Option<BusyPermit> {
        self.inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyPermit {
                inner: self.inner.clone(),
            })
    }

    /// Waits until the flag is clear, then claims it.
    pub async fn acquire(&self) -> BusyPermit {
        loop {
            let released = self.inner.released.notified();
            if let Some(permit) = self.try_acquire() {
                return permit;
            }
            released.await;
        }
    }
}

/// Proof that the holder owns the session's single in-flight slot.
#[derive(Debug)]
pub struct BusyPermit {
    inner: Arc<BusyInner>,
}

impl BusyPermit {
    /// True if this permit was issued by `flag`.
    pub fn belongs_to(&self, flag: &BusyFlag) -> bool {
        Arc::ptr_eq(&self.inner, &flag.inner)
    }
}

impl Drop for BusyPermit {
    fn drop(&mut self) {
        self.inner.busy.store(false, Ordering::Release);
        self.inner.released.notify_waiters();
    }
}
