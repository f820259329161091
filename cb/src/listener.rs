//! Listener handles and the ordered listener list shared by both channel kinds
//!
//! A [`Listener`] is a cheap-to-clone handle around a callback. Identity is
//! the handle, not the closure: clones of one handle are the same listener,
//! two handles built from identical closures are different listeners. Keep the
//! handle around to unregister later.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use tracing::warn;

/// Result returned by fallible listeners
pub type ListenerResult = eyre::Result<()>;

/// What happened when a single listener was invoked
pub(crate) enum Invocation {
    Delivered,
    Failed(eyre::Report),
    /// Receiver of a weak listener is gone
    Stale,
}

type Callback<T> = dyn Fn(&T) -> Invocation + Send + Sync;

/// A callback registered against a channel
pub struct Listener<T> {
    callback: Arc<Callback<T>>,
}

/// Listener for a [`crate::VoidChannel`]
pub type VoidListener = Listener<()>;

impl<T: 'static> Listener<T> {
    /// Create a listener from an infallible callback
    pub fn new(f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(move |value: &T| {
                f(value);
                Invocation::Delivered
            }),
        }
    }

    /// Create a listener whose failures are logged and counted by the channel
    pub fn fallible(f: impl Fn(&T) -> ListenerResult + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(move |value: &T| match f(value) {
                Ok(()) => Invocation::Delivered,
                Err(e) => Invocation::Failed(e),
            }),
        }
    }

    /// Create a listener bound to a receiver it does not keep alive
    ///
    /// Once every strong reference to `receiver` is dropped the listener is
    /// skipped and pruned from the channel on its next raise.
    pub fn weak<R>(receiver: &Arc<R>, f: impl Fn(&R, &T) + Send + Sync + 'static) -> Self
    where
        R: Send + Sync + 'static,
    {
        let receiver: Weak<R> = Arc::downgrade(receiver);
        Self {
            callback: Arc::new(move |value: &T| match receiver.upgrade() {
                Some(r) => {
                    f(&r, value);
                    Invocation::Delivered
                }
                None => Invocation::Stale,
            }),
        }
    }

    /// Invoke with panic isolation
    pub(crate) fn invoke(&self, value: &T) -> Invocation {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.callback)(value))) {
            Ok(outcome) => outcome,
            Err(payload) => Invocation::Failed(eyre::eyre!("listener panicked: {}", panic_message(&*payload))),
        }
    }
}

impl Listener<()> {
    /// Create a void listener from a closure taking no arguments
    pub fn from_action(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self::new(move |_: &()| f())
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl<T> Clone for Listener<T> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<T> PartialEq for Listener<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }
}

impl<T> Eq for Listener<T> {}

impl<T> fmt::Debug for Listener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("ptr", &Arc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}

/// Outcome of a single raise
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RaiseReport {
    /// Listeners whose callback ran to completion or failed
    pub invoked: usize,
    /// Listeners that returned an error or panicked
    pub failed: usize,
    /// Weak listeners skipped because their receiver was dropped
    pub stale: usize,
}

impl RaiseReport {
    /// True when every invoked listener succeeded
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Ordered, deduplicated listener list
#[derive(Debug)]
pub(crate) struct ListenerList<T> {
    entries: Vec<Listener<T>>,
}

impl<T: 'static> ListenerList<T> {
    pub(crate) fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Append unless already present; returns true if added
    pub(crate) fn insert(&mut self, listener: &Listener<T>) -> bool {
        if self.entries.contains(listener) {
            return false;
        }
        self.entries.push(listener.clone());
        true
    }

    /// Remove if present; returns true if removed
    pub(crate) fn remove(&mut self, listener: &Listener<T>) -> bool {
        match self.entries.iter().position(|l| l == listener) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<Listener<T>> {
        self.entries.clone()
    }

    pub(crate) fn prune(&mut self, stale: &[Listener<T>]) {
        self.entries.retain(|l| !stale.contains(l));
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Invoke a snapshot most-recently-registered first
///
/// Returns the report and the weak listeners found stale.
pub(crate) fn dispatch<T: 'static>(
    channel: &str,
    snapshot: &[Listener<T>],
    value: &T,
) -> (RaiseReport, Vec<Listener<T>>) {
    let mut report = RaiseReport::default();
    let mut stale = Vec::new();

    for listener in snapshot.iter().rev() {
        match listener.invoke(value) {
            Invocation::Delivered => report.invoked += 1,
            Invocation::Failed(e) => {
                report.invoked += 1;
                report.failed += 1;
                warn!(channel, error = %e, "listener failed, continuing dispatch");
            }
            Invocation::Stale => {
                report.stale += 1;
                stale.push(listener.clone());
            }
        }
    }

    (report, stale)
}
