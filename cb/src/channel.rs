//! Channel<T> - a named event category carrying a payload of type T
//!
//! # Dispatch
//!
//! `raise` stores the value as the channel's last value, copies the listener
//! list, releases the lock and invokes the copy most-recently-registered
//! first. Because the copy is taken before the first callback runs:
//!
//! - a listener unregistered mid-dispatch still fires in that raise if it had
//!   not fired yet, and is gone from the next one;
//! - a listener registered mid-dispatch first fires on the next raise;
//! - listeners may re-enter the channel (register, unregister, raise, reset)
//!   without deadlocking.
//!
//! A listener that returns an error or panics is logged and counted in the
//! [`RaiseReport`]; the remaining listeners still run.
//!
//! # Lifecycle
//!
//! See [`crate::lifecycle`]. An active channel is attached to an
//! [`Environment`]: the environment's reset signal clears the last value, its
//! session-end signal deactivates the channel.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ChannelError;
use crate::lifecycle::{Environment, LifecycleHooks, LifecycleState};
use crate::listener::{Listener, ListenerList, RaiseReport, VoidListener, dispatch, panic_message};
use crate::payload::{Payload, PayloadKind, PayloadValue};

/// Notification run after every raise, with the channel name
///
/// Used by tooling to refresh views that display last values. A panicking
/// hook is logged and does not escape `raise`.
pub type RefreshHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Stable identity of a channel instance for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(Uuid);

impl ChannelId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tunables shared by every channel created through a catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOptions {
    /// Nested raise depth on one channel at which a warning is logged (0 = never)
    pub reentrancy_warn_depth: usize,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            reentrancy_warn_depth: crate::DEFAULT_REENTRANCY_WARN_DEPTH,
        }
    }
}

/// Tracks how many raises of one channel are in flight
///
/// The count spans all callers of the channel, so with several threads raising
/// concurrently it over-reports recursion. It only ever produces a warning.
pub(crate) struct DepthGuard<'a> {
    depth: &'a AtomicUsize,
}

impl<'a> DepthGuard<'a> {
    pub(crate) fn enter(depth: &'a AtomicUsize, channel: &str, options: &ChannelOptions) -> Self {
        let current = depth.fetch_add(1, Ordering::SeqCst) + 1;
        let limit = options.reentrancy_warn_depth;
        if limit > 0 && current == limit + 1 {
            warn!(channel, depth = current, limit, "raise nested past warning depth, possible recursive raise");
        }
        Self { depth }
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

pub(crate) fn run_refresh(hook: &RefreshHook, channel: &str) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| hook(channel))) {
        warn!(channel, panic = %panic_message(&*payload), "refresh hook panicked");
    }
}

pub(crate) fn lock<S>(state: &Mutex<S>) -> MutexGuard<'_, S> {
    // Listeners never run under the lock, so a poisoned state is still consistent
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct ChannelState<T> {
    listeners: ListenerList<T>,
    last_value: T,
    lifecycle: LifecycleState,
    hooks: Option<LifecycleHooks>,
    refresh: Option<RefreshHook>,
}

struct ChannelInner<T> {
    id: ChannelId,
    name: String,
    options: ChannelOptions,
    depth: AtomicUsize,
    state: Mutex<ChannelState<T>>,
}

impl<T> Drop for ChannelInner<T> {
    fn drop(&mut self) {
        let state = match self.state.get_mut() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(hooks) = state.hooks.take() {
            hooks.detach();
        }
    }
}

/// A named channel carrying payloads of type `T`
///
/// Cloning yields another handle to the same channel.
pub struct Channel<T: Payload> {
    inner: Arc<ChannelInner<T>>,
}

impl<T: Payload> Channel<T> {
    /// Create an inactive channel with default options
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, ChannelOptions::default())
    }

    pub fn with_options(name: impl Into<String>, options: ChannelOptions) -> Self {
        let name = name.into();
        let id = ChannelId::generate();
        debug!(%id, %name, kind = %T::KIND, "Channel::new: creating channel");
        Self {
            inner: Arc::new(ChannelInner {
                id,
                name,
                options,
                depth: AtomicUsize::new(0),
                state: Mutex::new(ChannelState {
                    listeners: ListenerList::new(),
                    last_value: T::default(),
                    lifecycle: LifecycleState::Inactive,
                    hooks: None,
                    refresh: None,
                }),
            }),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    fn state(&self) -> MutexGuard<'_, ChannelState<T>> {
        lock(&self.inner.state)
    }

    /// Register a listener and return the current last value
    ///
    /// Registering a listener that is already registered changes nothing.
    pub fn register_listener(&self, listener: &Listener<T>) -> T {
        let mut state = self.state();
        let added = state.listeners.insert(listener);
        debug!(channel = %self.inner.name, added, count = state.listeners.len(), "Channel::register_listener");
        state.last_value.clone()
    }

    /// Remove a listener; absent listeners are ignored
    pub fn unregister_listener(&self, listener: &Listener<T>) {
        let mut state = self.state();
        let removed = state.listeners.remove(listener);
        debug!(channel = %self.inner.name, removed, count = state.listeners.len(), "Channel::unregister_listener");
    }

    /// Store `value` as the last value and notify every listener
    pub fn raise(&self, value: T) -> RaiseReport {
        let _depth = DepthGuard::enter(&self.inner.depth, &self.inner.name, &self.inner.options);

        let (snapshot, refresh) = {
            let mut state = self.state();
            state.last_value = value.clone();
            (state.listeners.snapshot(), state.refresh.clone())
        };

        let (report, stale) = dispatch(&self.inner.name, &snapshot, &value);
        if !stale.is_empty() {
            self.state().listeners.prune(&stale);
        }
        debug!(
            channel = %self.inner.name,
            invoked = report.invoked,
            failed = report.failed,
            stale = report.stale,
            "Channel::raise"
        );

        if let Some(refresh) = refresh {
            run_refresh(&refresh, &self.inner.name);
        }
        report
    }

    /// Restore the default last value and detach from the environment
    ///
    /// Listeners stay registered. Calling reset on a detached channel only
    /// clears the last value again.
    pub fn reset(&self) {
        let hooks = {
            let mut state = self.state();
            state.last_value = T::default();
            state.lifecycle = LifecycleState::Inactive;
            state.hooks.take()
        };
        if let Some(hooks) = hooks {
            hooks.detach();
        }
        debug!(channel = %self.inner.name, "Channel::reset");
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.state().listeners.len()
    }

    /// Payload of the most recent raise since the last reset
    pub fn last_value(&self) -> T {
        self.state().last_value.clone()
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.state().lifecycle
    }

    /// True while attached to an environment's signals
    pub fn is_attached(&self) -> bool {
        self.state().hooks.is_some()
    }

    /// Attach to `env` and start from the default last value
    ///
    /// Activating an already active channel re-attaches rather than adding a
    /// second set of hooks.
    pub fn on_activated(&self, env: &Environment) {
        let previous = self.state().hooks.take();
        if let Some(previous) = previous {
            previous.detach();
        }

        let on_reset = {
            let weak = Arc::downgrade(&self.inner);
            VoidListener::from_action(move || {
                if let Some(inner) = weak.upgrade() {
                    Channel { inner }.on_environment_reset();
                }
            })
        };
        let on_session_end = {
            let weak = Arc::downgrade(&self.inner);
            VoidListener::from_action(move || {
                if let Some(inner) = weak.upgrade() {
                    Channel { inner }.on_deactivated();
                }
            })
        };
        let hooks = LifecycleHooks::attach(env, Some(on_reset), on_session_end);

        let displaced = {
            let mut state = self.state();
            state.last_value = T::default();
            state.lifecycle = LifecycleState::Active;
            state.hooks.replace(hooks)
        };
        if let Some(displaced) = displaced {
            displaced.detach();
        }
        debug!(channel = %self.inner.name, "Channel::on_activated");
    }

    /// Detach from the environment and clear the last value
    pub fn on_deactivated(&self) {
        self.reset();
        debug!(channel = %self.inner.name, "Channel::on_deactivated");
    }

    /// Environment reset signal: clear the last value, keep listeners
    pub fn on_environment_reset(&self) {
        self.state().last_value = T::default();
        debug!(channel = %self.inner.name, "Channel::on_environment_reset");
    }

    /// Permanent teardown: deactivate and release every listener
    pub fn teardown(&self) {
        self.reset();
        self.state().listeners.clear();
        debug!(channel = %self.inner.name, "Channel::teardown");
    }

    pub fn set_refresh_hook(&self, hook: Option<RefreshHook>) {
        self.state().refresh = hook;
    }
}

impl<T: Payload> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Payload> PartialEq for Channel<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Payload> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("kind", &T::KIND)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Type-erased view of a channel, used by the catalog and tooling
pub trait AnyChannel: Send + Sync + fmt::Debug {
    fn id(&self) -> ChannelId;

    fn name(&self) -> &str;

    fn payload_kind(&self) -> PayloadKind;

    fn listener_count(&self) -> usize;

    fn lifecycle(&self) -> LifecycleState;

    /// Last value, or `None` for channels without a payload
    fn last_value(&self) -> Option<PayloadValue>;

    /// Default payload of this channel's kind
    fn default_value(&self) -> PayloadValue;

    /// Raise a tagged value; fails if its kind does not match the channel
    fn raise_value(&self, value: &PayloadValue) -> Result<RaiseReport, ChannelError>;

    fn on_activated(&self, env: &Environment);

    fn on_deactivated(&self);

    fn on_environment_reset(&self);

    fn teardown(&self);

    fn set_refresh_hook(&self, hook: Option<RefreshHook>);

    fn as_any(&self) -> &dyn Any;
}

impl<T: Payload> AnyChannel for Channel<T> {
    fn id(&self) -> ChannelId {
        Channel::id(self)
    }

    fn name(&self) -> &str {
        Channel::name(self)
    }

    fn payload_kind(&self) -> PayloadKind {
        T::KIND
    }

    fn listener_count(&self) -> usize {
        Channel::listener_count(self)
    }

    fn lifecycle(&self) -> LifecycleState {
        Channel::lifecycle(self)
    }

    fn last_value(&self) -> Option<PayloadValue> {
        Some(Channel::last_value(self).to_value())
    }

    fn default_value(&self) -> PayloadValue {
        T::default().to_value()
    }

    fn raise_value(&self, value: &PayloadValue) -> Result<RaiseReport, ChannelError> {
        let payload = T::from_value(value)?;
        Ok(self.raise(payload))
    }

    fn on_activated(&self, env: &Environment) {
        Channel::on_activated(self, env)
    }

    fn on_deactivated(&self) {
        Channel::on_deactivated(self)
    }

    fn on_environment_reset(&self) {
        Channel::on_environment_reset(self)
    }

    fn teardown(&self) {
        Channel::teardown(self)
    }

    fn set_refresh_hook(&self, hook: Option<RefreshHook>) {
        Channel::set_refresh_hook(self, hook)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
