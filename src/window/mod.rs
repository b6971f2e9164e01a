//! Bounded correlation window for in-flight requests.
//!
//! A [`Window`] tracks at most one [`RequestPromise`] per key and at most
//! `N` promises overall. Entries are admitted through an [`AdmissionGate`]
//! and resolved exactly once, by completion, failure, cancellation or expiry.
//!
//! Resolution races on the same key are settled by the table alone: every
//! terminal path starts with a conditional `DashMap` removal and only the
//! caller that removed the entry resolves it. Unrelated keys live in
//! different shards and never contend.
//!
//! ```
//! use std::time::Duration;
//!
//! use bearerbox::window::Window;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let window: Window<u32, &str, &str> = Window::new(1);
//! let first = window.offer(1, "ping", Duration::ZERO, None).await;
//! let second = window.offer(2, "ping", Duration::ZERO, None).await;
//! assert!(second.cause().is_some());
//!
//! window.complete(&1, "pong");
//! assert_eq!(first.response(), Some(&"pong"));
//! assert_eq!(window.size(), 0);
//! # }
//! ```

use std::{
    fmt,
    hash::Hash,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use tracing::{debug, trace};

pub mod error;
pub mod gate;
pub mod promise;

pub use error::RequestError;
use gate::{AdmissionGate, GateClosed};
pub use promise::{CallerHint, Outcome, RequestPromise};

/// Bounds required of a window key.
pub trait WindowKey: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> WindowKey for T where T: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

/// Receives promises that failed because their deadline passed.
#[async_trait]
pub trait ExpiryListener<K, R, P>: Send + Sync {
    /// Called once per expired request, after the promise has failed with
    /// [`RequestError::Expired`] and its slot has been released.
    async fn on_expired(&self, promise: RequestPromise<K, R, P>);
}

pub(crate) struct WindowInner<K, R, P> {
    entries: DashMap<K, RequestPromise<K, R, P>>,
    gate: AdmissionGate,
    next_seq: AtomicU64,
    listener: Option<Arc<dyn ExpiryListener<K, R, P>>>,
}

/// Keyed table of in-flight requests bound to an admission gate.
///
/// Cloning is cheap and yields a handle on the same window.
pub struct Window<K, R, P>(Arc<WindowInner<K, R, P>>);

impl<K, R, P> Clone for Window<K, R, P> {
    fn clone(&self) -> Self { Self(Arc::clone(&self.0)) }
}

impl<K: Eq + Hash, R, P> fmt::Debug for Window<K, R, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("size", &self.0.entries.len())
            .field("max_size", &self.0.gate.capacity())
            .finish_non_exhaustive()
    }
}

impl<K, R, P> Window<K, R, P>
where
    K: WindowKey,
    R: Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    /// Create a window admitting at most `max_size` concurrent requests.
    #[must_use]
    pub fn new(max_size: usize) -> Self { Self::build(max_size, None) }

    /// Create a window that reports expired requests to `listener`.
    #[must_use]
    pub fn with_listener(max_size: usize, listener: Arc<dyn ExpiryListener<K, R, P>>) -> Self {
        Self::build(max_size, Some(listener))
    }

    fn build(max_size: usize, listener: Option<Arc<dyn ExpiryListener<K, R, P>>>) -> Self {
        Self(Arc::new(WindowInner {
            entries: DashMap::new(),
            gate: AdmissionGate::new(max_size),
            next_seq: AtomicU64::new(0),
            listener,
        }))
    }

    pub(crate) fn from_inner(inner: Arc<WindowInner<K, R, P>>) -> Self { Self(inner) }

    /// Admit and register a request.
    ///
    /// Waits up to `admission_timeout` for a free slot. The returned promise
    /// is already failed when:
    ///
    /// - no slot freed in time ([`RequestError::AdmissionTimeout`], no slot
    ///   consumed);
    /// - `key` is still in flight ([`RequestError::DuplicateKey`], occupancy
    ///   unchanged);
    /// - the window was destroyed ([`RequestError::Interrupted`]).
    ///
    /// With `expiry` set, the request fails with [`RequestError::Expired`]
    /// if it is still unresolved once `expiry` has passed.
    pub async fn offer(
        &self,
        key: K,
        request: R,
        admission_timeout: Duration,
        expiry: Option<Duration>,
    ) -> RequestPromise<K, R, P> {
        let seq = self.0.next_seq.fetch_add(1, Ordering::Relaxed);
        let promise = RequestPromise::new(seq, key.clone(), request, Arc::downgrade(&self.0));

        match self.0.gate.acquire(admission_timeout).await {
            Ok(true) => {}
            Ok(false) => {
                trace!(?key, "no window slot within admission timeout");
                promise.resolve(Outcome::Failed(RequestError::AdmissionTimeout));
                return promise;
            }
            Err(GateClosed) => {
                promise.resolve(Outcome::Failed(RequestError::Interrupted));
                return promise;
            }
        }

        match self.0.entries.entry(key) {
            Entry::Occupied(occupied) => {
                debug!(key = ?occupied.key(), "rejecting offer for a key already in flight");
                drop(occupied);
                self.0.gate.release();
                promise.resolve(Outcome::Failed(RequestError::DuplicateKey));
                return promise;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(promise.clone());
            }
        }
        crate::metrics::inc_in_flight();

        if self.0.gate.is_interrupted() {
            // destroy() may have taken its snapshot before this insert
            self.finish(promise.key(), Some(seq), Outcome::Cancelled);
            return promise;
        }
        if let Some(expiry) = expiry {
            self.arm_deadline(&promise, expiry);
        }
        promise
    }

    fn arm_deadline(&self, promise: &RequestPromise<K, R, P>, expiry: Duration) {
        let window = Arc::downgrade(&self.0);
        let key = promise.key().clone();
        let seq = promise.seq();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(expiry).await;
            if let Some(inner) = window.upgrade() {
                Window::from_inner(inner).expire(&key, seq).await;
            }
        });
        promise.arm(timer.abort_handle());
        if promise.is_done() && !promise.is_expired() {
            promise.disarm();
        }
    }

    async fn expire(&self, key: &K, seq: u64) {
        let Some((_, promise)) = self.0.entries.remove_if(key, |_, entry| entry.seq() == seq) else {
            return;
        };
        self.0.gate.release();
        crate::metrics::dec_in_flight();
        promise.resolve(Outcome::Failed(RequestError::Expired));
        crate::metrics::inc_expired();
        debug!(?key, "request expired");
        if let Some(listener) = &self.0.listener {
            listener.on_expired(promise).await;
        }
    }

    /// Remove the entry, release its slot, then resolve it.
    fn finish(
        &self,
        key: &K,
        seq: Option<u64>,
        outcome: Outcome<P>,
    ) -> Option<RequestPromise<K, R, P>> {
        let (_, promise) = match seq {
            Some(seq) => self.0.entries.remove_if(key, |_, entry| entry.seq() == seq),
            None => self.0.entries.remove(key),
        }?;
        self.0.gate.release();
        crate::metrics::dec_in_flight();
        promise.disarm();
        promise.resolve(outcome);
        Some(promise)
    }

    /// Resolve the request registered under `key` with `response`.
    ///
    /// `None` means the key is not in flight, for instance because it
    /// already expired or was cancelled. That is a late arrival, not an
    /// error.
    pub fn complete(&self, key: &K, response: P) -> Option<RequestPromise<K, R, P>> {
        self.finish(key, None, Outcome::Completed(response))
    }

    /// Fail the request registered under `key`.
    pub fn fail(&self, key: &K, error: RequestError) -> Option<RequestPromise<K, R, P>> {
        self.finish(key, None, Outcome::Failed(error))
    }

    /// Cancel the request registered under `key`.
    pub fn cancel(&self, key: &K) -> Option<RequestPromise<K, R, P>> {
        self.finish(key, None, Outcome::Cancelled)
    }

    /// Fail `promise` only if it is still the entry registered under its key.
    pub(crate) fn fail_exact(
        &self,
        promise: &RequestPromise<K, R, P>,
        error: RequestError,
    ) -> Option<RequestPromise<K, R, P>> {
        self.finish(promise.key(), Some(promise.seq()), Outcome::Failed(error))
    }

    pub(crate) fn cancel_exact(&self, key: &K, seq: u64) -> Option<RequestPromise<K, R, P>> {
        self.finish(key, Some(seq), Outcome::Cancelled)
    }

    /// Fail every request in flight at call time, in offer order.
    pub fn fail_all(&self, error: &RequestError) -> Vec<RequestPromise<K, R, P>> {
        self.drain_with(|| Outcome::Failed(error.clone()))
    }

    /// Cancel every request in flight at call time, in offer order.
    pub fn cancel_all(&self) -> Vec<RequestPromise<K, R, P>> { self.drain_with(|| Outcome::Cancelled) }

    fn drain_with(&self, outcome: impl Fn() -> Outcome<P>) -> Vec<RequestPromise<K, R, P>> {
        let snapshot: Vec<(K, u64)> = self
            .0
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().seq()))
            .collect();
        let mut resolved: Vec<_> = snapshot
            .into_iter()
            .filter_map(|(key, seq)| self.finish(&key, Some(seq), outcome()))
            .collect();
        resolved.sort_by_key(RequestPromise::seq);
        resolved
    }

    /// Stop admitting requests and cancel everything in flight.
    ///
    /// Blocked and future offers fail with [`RequestError::Interrupted`].
    pub fn destroy(&self) -> Vec<RequestPromise<K, R, P>> {
        self.0.gate.drain();
        self.0.gate.interrupt_all();
        let cancelled = self.cancel_all();
        // cancelled entries hand their slots back
        self.0.gate.drain();
        cancelled
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool { self.0.gate.is_interrupted() }

    /// Capacity of the window.
    #[must_use]
    pub fn max_size(&self) -> usize { self.0.gate.capacity() }

    /// Requests currently in flight.
    #[must_use]
    pub fn size(&self) -> usize { self.0.entries.len() }

    /// Slots currently free.
    #[must_use]
    pub fn free_size(&self) -> usize { self.0.gate.available() }

    /// Offers currently waiting for a slot.
    #[must_use]
    pub fn pending_offer_count(&self) -> usize { self.0.gate.pending_acquirers() }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool { self.0.entries.contains_key(key) }

    /// Promise registered under `key`, if in flight.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<RequestPromise<K, R, P>> {
        self.0.entries.get(key).map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
mod tests;
