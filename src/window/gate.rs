//! Counting admission gate bounding in-flight requests.
//!
//! Permits are detached from the semaphore on acquisition and returned
//! explicitly with [`AdmissionGate::release`], because the slot outlives the
//! task that acquired it: whichever task resolves the entry releases it.

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use thiserror::Error;
use tokio::sync::{Semaphore, TryAcquireError};

/// Returned to acquirers once the gate has been interrupted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("admission gate interrupted")]
pub struct GateClosed;

/// RAII guard counting tasks blocked in [`AdmissionGate::acquire`].
struct Waiting<'a>(&'a AtomicUsize);

impl<'a> Waiting<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) { self.0.fetch_sub(1, Ordering::Relaxed); }
}

/// Permit pool with a forced-interrupt mode for shutdown.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bearerbox::window::gate::{AdmissionGate, GateClosed};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let gate = AdmissionGate::new(1);
/// assert_eq!(gate.acquire(Duration::ZERO).await, Ok(true));
/// assert_eq!(gate.acquire(Duration::ZERO).await, Ok(false));
///
/// gate.interrupt_all();
/// assert_eq!(gate.acquire(Duration::ZERO).await, Err(GateClosed));
/// # }
/// ```
#[derive(Debug)]
pub struct AdmissionGate {
    permits: Semaphore,
    capacity: usize,
    waiting: AtomicUsize,
}

impl AdmissionGate {
    /// Create a gate with `capacity` permits.
    ///
    /// The capacity is clamped to at least one permit.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            permits: Semaphore::new(capacity),
            capacity,
            waiting: AtomicUsize::new(0),
        }
    }

    /// Wait up to `timeout` for a permit.
    ///
    /// Returns `Ok(true)` when a permit was taken and `Ok(false)` when the
    /// timeout elapsed first; nothing is consumed in that case. A zero
    /// timeout never suspends.
    ///
    /// # Errors
    ///
    /// Returns [`GateClosed`] if the gate is, or becomes, interrupted while
    /// waiting.
    pub async fn acquire(&self, timeout: Duration) -> Result<bool, GateClosed> {
        match self.permits.try_acquire() {
            Ok(permit) => {
                permit.forget();
                return Ok(true);
            }
            Err(TryAcquireError::Closed) => return Err(GateClosed),
            Err(TryAcquireError::NoPermits) if timeout.is_zero() => return Ok(false),
            Err(TryAcquireError::NoPermits) => {}
        }

        let _waiting = Waiting::new(&self.waiting);
        match tokio::time::timeout(timeout, self.permits.acquire()).await {
            Ok(Ok(permit)) => {
                permit.forget();
                Ok(true)
            }
            Ok(Err(_)) => Err(GateClosed),
            Err(_elapsed) => Ok(false),
        }
    }

    /// Return one permit to the pool.
    pub fn release(&self) { self.permits.add_permits(1); }

    /// Wake every blocked and future acquirer with [`GateClosed`].
    ///
    /// Idempotent.
    pub fn interrupt_all(&self) { self.permits.close(); }

    /// Force the available permits to zero.
    pub fn drain(&self) { self.permits.forget_permits(self.permits.available_permits()); }

    #[must_use]
    pub fn is_interrupted(&self) -> bool { self.permits.is_closed() }

    #[must_use]
    pub fn capacity(&self) -> usize { self.capacity }

    /// Permits currently free.
    #[must_use]
    pub fn available(&self) -> usize { self.permits.available_permits() }

    /// Tasks currently suspended in [`acquire`](Self::acquire).
    #[must_use]
    pub fn pending_acquirers(&self) -> usize { self.waiting.load(Ordering::Relaxed) }
}
