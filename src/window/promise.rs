//! Handle on the eventual outcome of one admitted request.
//!
//! A promise is shared between the caller and the owning [`Window`]. Only
//! the window can resolve it; the public [`RequestPromise::cancel`] routes
//! through the window so table removal and slot release stay consistent.

use std::{
    fmt,
    sync::{
        Arc,
        OnceLock,
        Weak,
        atomic::{AtomicU8, Ordering},
    },
    time::Duration,
};

use tokio::{sync::Notify, task::AbortHandle};

use super::{RequestError, Window, WindowInner, WindowKey};

/// Terminal state of a request.
#[derive(Clone, Debug)]
pub enum Outcome<P> {
    /// A response arrived.
    Completed(P),
    /// The request failed; see [`RequestError`].
    Failed(RequestError),
    /// The request was cancelled, explicitly or by window shutdown.
    Cancelled,
}

/// Whether a caller was observing the promise when it resolved.
///
/// The session uses this to decide who handles a response: the waiting
/// caller, the handler's response callback, or the unexpected-response
/// callback when the caller gave up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum CallerHint {
    /// Nobody has waited on the promise.
    NotWaiting = 0,
    /// A caller is currently suspended in [`RequestPromise::wait`].
    Waiting = 1,
    /// A caller waited and gave up.
    GaveUp = 2,
}

impl CallerHint {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Waiting,
            2 => Self::GaveUp,
            _ => Self::NotWaiting,
        }
    }
}

pub(super) struct PromiseState<K, R, P> {
    seq: u64,
    key: K,
    request: R,
    outcome: OnceLock<Outcome<P>>,
    resolved: Notify,
    hint: AtomicU8,
    deadline: OnceLock<AbortHandle>,
    window: Weak<WindowInner<K, R, P>>,
}

/// Eventual outcome of one request offered to a [`Window`].
pub struct RequestPromise<K, R, P>(Arc<PromiseState<K, R, P>>);

impl<K, R, P> Clone for RequestPromise<K, R, P> {
    fn clone(&self) -> Self { Self(Arc::clone(&self.0)) }
}

impl<K: fmt::Debug, R, P> fmt::Debug for RequestPromise<K, R, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestPromise")
            .field("key", &self.0.key)
            .field("seq", &self.0.seq)
            .field("done", &self.0.outcome.get().is_some())
            .finish_non_exhaustive()
    }
}

impl<K, R, P> RequestPromise<K, R, P>
where
    K: WindowKey,
    R: Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    pub(super) fn new(seq: u64, key: K, request: R, window: Weak<WindowInner<K, R, P>>) -> Self {
        Self(Arc::new(PromiseState {
            seq,
            key,
            request,
            outcome: OnceLock::new(),
            resolved: Notify::new(),
            hint: AtomicU8::new(CallerHint::NotWaiting as u8),
            deadline: OnceLock::new(),
            window,
        }))
    }

    /// Wait for resolution.
    ///
    /// Returns `true` once the promise is resolved and `false` if `timeout`
    /// elapsed first. `None` waits indefinitely. A timed-out wait marks the
    /// caller as having given up until the next call.
    pub async fn wait(&self, timeout: Option<Duration>) -> bool {
        if self.is_done() {
            return true;
        }
        self.set_hint(CallerHint::Waiting);
        let resolved = self.wait_resolved();
        let done = match timeout {
            Some(limit) => tokio::time::timeout(limit, resolved).await.is_ok(),
            None => {
                resolved.await;
                true
            }
        };
        if !done {
            self.set_hint(CallerHint::GaveUp);
        }
        done
    }

    async fn wait_resolved(&self) {
        let notified = self.0.resolved.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_done() {
            return;
        }
        notified.await;
    }

    /// Cancel the request through its owning window.
    ///
    /// Returns `false` if the promise was already resolved or the window is
    /// gone.
    pub fn cancel(&self) -> bool {
        let Some(inner) = self.0.window.upgrade() else {
            return false;
        };
        Window::from_inner(inner)
            .cancel_exact(&self.0.key, self.0.seq)
            .is_some()
    }

    #[must_use]
    pub fn is_done(&self) -> bool { self.0.outcome.get().is_some() }

    #[must_use]
    pub fn is_success(&self) -> bool { matches!(self.outcome(), Some(Outcome::Completed(_))) }

    #[must_use]
    pub fn is_cancelled(&self) -> bool { matches!(self.outcome(), Some(Outcome::Cancelled)) }

    /// Terminal state, or `None` while in flight.
    #[must_use]
    pub fn outcome(&self) -> Option<&Outcome<P>> { self.0.outcome.get() }

    /// Response, if the request completed.
    #[must_use]
    pub fn response(&self) -> Option<&P> {
        match self.outcome() {
            Some(Outcome::Completed(response)) => Some(response),
            _ => None,
        }
    }

    /// Failure cause, if the request failed.
    #[must_use]
    pub fn cause(&self) -> Option<&RequestError> {
        match self.outcome() {
            Some(Outcome::Failed(err)) => Some(err),
            _ => None,
        }
    }

    #[must_use]
    pub fn key(&self) -> &K { &self.0.key }

    /// The request this promise was offered with.
    #[must_use]
    pub fn request(&self) -> &R { &self.0.request }

    #[must_use]
    pub fn caller_hint(&self) -> CallerHint { CallerHint::from_u8(self.0.hint.load(Ordering::Acquire)) }

    /// Record whether a caller is observing the promise.
    pub fn set_hint(&self, hint: CallerHint) { self.0.hint.store(hint as u8, Ordering::Release); }

    pub(super) fn seq(&self) -> u64 { self.0.seq }

    /// Record the terminal state. Only the first call has any effect.
    pub(super) fn resolve(&self, outcome: Outcome<P>) -> bool {
        if self.0.outcome.set(outcome).is_err() {
            return false;
        }
        self.0.resolved.notify_waiters();
        true
    }

    pub(super) fn arm(&self, handle: AbortHandle) {
        if self.0.deadline.set(handle).is_err() {
            tracing::warn!(key = ?self.0.key, "deadline armed twice; keeping the first");
        }
    }

    pub(super) fn disarm(&self) {
        if let Some(handle) = self.0.deadline.get() {
            handle.abort();
        }
    }

    pub(super) fn is_expired(&self) -> bool {
        matches!(self.cause(), Some(RequestError::Expired))
    }
}
