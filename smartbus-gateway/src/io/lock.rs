//! Stream exclusion lock.
//!
//! The reader holds this lock from the first sync byte of a frame until the
//! whole frame has been read; the writer holds it while a frame is written.
//! A write therefore never lands in the middle of a frame being received.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Semaphore, SemaphorePermit};

/// Single-permit lock with acquisition counters.
pub struct StreamLock {
    semaphore: Semaphore,
    acquisitions: AtomicU64,
    releases: AtomicU64,
}

impl StreamLock {
    pub fn new() -> Self {
        Self {
            semaphore: Semaphore::new(1),
            acquisitions: AtomicU64::new(0),
            releases: AtomicU64::new(0),
        }
    }

    /// Wait for the lock.
    ///
    /// Returns `None` only if the lock has been closed.
    pub async fn acquire(&self) -> Option<StreamLockGuard<'_>> {
        let permit = self.semaphore.acquire().await.ok()?;
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        Some(StreamLockGuard {
            _permit: permit,
            lock: self,
        })
    }

    /// Close the lock; pending and future acquisitions fail. Held guards
    /// still release normally.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_locked(&self) -> bool {
        self.semaphore.available_permits() == 0
    }

    /// Number of times the lock has been taken.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// Number of times the lock has been given back.
    pub fn releases(&self) -> u64 {
        self.releases.load(Ordering::SeqCst)
    }
}

impl Default for StreamLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Held lock; released on drop.
pub struct StreamLockGuard<'a> {
    _permit: SemaphorePermit<'a>,
    lock: &'a StreamLock,
}

impl Drop for StreamLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.releases.fetch_add(1, Ordering::SeqCst);
    }
}
