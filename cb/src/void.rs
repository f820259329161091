//! VoidChannel - a channel without payload or last value
//!
//! Same registration and dispatch rules as [`crate::Channel`].

use std::any::Any;
use std::fmt;
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::channel::{AnyChannel, ChannelId, ChannelOptions, DepthGuard, RefreshHook, lock, run_refresh};
use crate::error::ChannelError;
use crate::lifecycle::{Environment, LifecycleHooks, LifecycleState};
use crate::listener::{ListenerList, RaiseReport, VoidListener, dispatch};
use crate::payload::{PayloadKind, PayloadValue, mismatch};

struct VoidState {
    listeners: ListenerList<()>,
    lifecycle: LifecycleState,
    hooks: Option<LifecycleHooks>,
    refresh: Option<RefreshHook>,
}

struct VoidInner {
    id: ChannelId,
    name: String,
    options: ChannelOptions,
    depth: AtomicUsize,
    state: Mutex<VoidState>,
}

impl Drop for VoidInner {
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

/// A named channel whose raises carry no payload
#[derive(Clone)]
pub struct VoidChannel {
    inner: Arc<VoidInner>,
}

impl VoidChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, ChannelOptions::default())
    }

    pub fn with_options(name: impl Into<String>, options: ChannelOptions) -> Self {
        let name = name.into();
        let id = ChannelId::generate();
        debug!(%id, %name, "VoidChannel::new: creating channel");
        Self {
            inner: Arc::new(VoidInner {
                id,
                name,
                options,
                depth: AtomicUsize::new(0),
                state: Mutex::new(VoidState {
                    listeners: ListenerList::new(),
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

    fn state(&self) -> MutexGuard<'_, VoidState> {
        lock(&self.inner.state)
    }

    /// Register a listener; already registered listeners are ignored
    pub fn register_listener(&self, listener: &VoidListener) {
        let mut state = self.state();
        let added = state.listeners.insert(listener);
        debug!(channel = %self.inner.name, added, count = state.listeners.len(), "VoidChannel::register_listener");
    }

    /// Remove a listener; absent listeners are ignored
    pub fn unregister_listener(&self, listener: &VoidListener) {
        let mut state = self.state();
        let removed = state.listeners.remove(listener);
        debug!(channel = %self.inner.name, removed, count = state.listeners.len(), "VoidChannel::unregister_listener");
    }

    /// Notify every listener, most recently registered first
    pub fn raise(&self) -> RaiseReport {
        let _depth = DepthGuard::enter(&self.inner.depth, &self.inner.name, &self.inner.options);

        let (snapshot, refresh) = {
            let state = self.state();
            (state.listeners.snapshot(), state.refresh.clone())
        };

        let (report, stale) = dispatch(&self.inner.name, &snapshot, &());
        if !stale.is_empty() {
            self.state().listeners.prune(&stale);
        }
        debug!(
            channel = %self.inner.name,
            invoked = report.invoked,
            failed = report.failed,
            "VoidChannel::raise"
        );

        if let Some(refresh) = refresh {
            run_refresh(&refresh, &self.inner.name);
        }
        report
    }

    pub fn listener_count(&self) -> usize {
        self.state().listeners.len()
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.state().lifecycle
    }

    /// True while attached to an environment's session-end signal
    pub fn is_attached(&self) -> bool {
        self.state().hooks.is_some()
    }

    /// Attach to `env`'s session-end signal and mark active
    ///
    /// There is no last value, so the reset signal is not subscribed.
    pub fn on_activated(&self, env: &Environment) {
        let previous = self.state().hooks.take();
        if let Some(previous) = previous {
            previous.detach();
        }

        let on_session_end = {
            let weak = Arc::downgrade(&self.inner);
            VoidListener::from_action(move || {
                if let Some(inner) = weak.upgrade() {
                    VoidChannel { inner }.on_deactivated();
                }
            })
        };
        let hooks = LifecycleHooks::attach(env, None, on_session_end);

        let displaced = {
            let mut state = self.state();
            state.lifecycle = LifecycleState::Active;
            state.hooks.replace(hooks)
        };
        if let Some(displaced) = displaced {
            displaced.detach();
        }
        debug!(channel = %self.inner.name, "VoidChannel::on_activated");
    }

    /// Detach from the environment and mark inactive
    pub fn on_deactivated(&self) {
        let hooks = {
            let mut state = self.state();
            state.lifecycle = LifecycleState::Inactive;
            state.hooks.take()
        };
        if let Some(hooks) = hooks {
            hooks.detach();
        }
        debug!(channel = %self.inner.name, "VoidChannel::on_deactivated");
    }

    /// Permanent teardown: deactivate and release every listener
    pub fn teardown(&self) {
        self.on_deactivated();
        self.state().listeners.clear();
        debug!(channel = %self.inner.name, "VoidChannel::teardown");
    }

    pub fn set_refresh_hook(&self, hook: Option<RefreshHook>) {
        self.state().refresh = hook;
    }
}

impl PartialEq for VoidChannel {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for VoidChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoidChannel")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl AnyChannel for VoidChannel {
    fn id(&self) -> ChannelId {
        VoidChannel::id(self)
    }

    fn name(&self) -> &str {
        VoidChannel::name(self)
    }

    fn payload_kind(&self) -> PayloadKind {
        PayloadKind::Void
    }

    fn listener_count(&self) -> usize {
        VoidChannel::listener_count(self)
    }

    fn lifecycle(&self) -> LifecycleState {
        VoidChannel::lifecycle(self)
    }

    fn last_value(&self) -> Option<PayloadValue> {
        None
    }

    fn default_value(&self) -> PayloadValue {
        PayloadValue::Void
    }

    fn raise_value(&self, value: &PayloadValue) -> Result<RaiseReport, ChannelError> {
        match value {
            PayloadValue::Void => Ok(self.raise()),
            other => Err(mismatch(PayloadKind::Void, other)),
        }
    }

    fn on_activated(&self, env: &Environment) {
        VoidChannel::on_activated(self, env)
    }

    fn on_deactivated(&self) {
        VoidChannel::on_deactivated(self)
    }

    fn on_environment_reset(&self) {}

    fn teardown(&self) {
        VoidChannel::teardown(self)
    }

    fn set_refresh_hook(&self, hook: Option<RefreshHook>) {
        VoidChannel::set_refresh_hook(self, hook)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
