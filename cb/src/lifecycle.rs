//! Lifecycle coordination between channels and their host environment
//!
//! The host (game loop, editor, test harness) owns an [`Environment`] and
//! fires its two signals:
//!
//! - **reset** (`load_scene`): cached last values are cleared, subscriptions
//!   survive.
//! - **session end** (`end_session`): attached channels deactivate, which
//!   clears the last value and detaches them from both signals. Void
//!   channels have no last value and subscribe to this signal only.
//!
//! ```text
//!              on_activated(env)
//!   Inactive ─────────────────────▶ Active ──┐ reset signal:
//!      ▲                               │  ◀──┘ clear last value
//!      └───────────────────────────────┘
//!        on_deactivated / session end /
//!        reset() / teardown
//! ```
//!
//! Hooks hold a weak reference to the channel, so an environment never keeps
//! a channel alive.

use std::fmt;

use tracing::debug;

use crate::listener::{RaiseReport, VoidListener};
use crate::void::VoidChannel;

/// Whether a channel is attached to an environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Inactive,
    Active,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Inactive => write!(f, "inactive"),
            LifecycleState::Active => write!(f, "active"),
        }
    }
}

/// The host's lifecycle signal source
#[derive(Debug, Clone)]
pub struct Environment {
    reset: VoidChannel,
    session_end: VoidChannel,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            reset: VoidChannel::new("environment.reset"),
            session_end: VoidChannel::new("environment.session_end"),
        }
    }

    /// Signal fired on scene/level change
    pub fn reset_signal(&self) -> &VoidChannel {
        &self.reset
    }

    /// Signal fired when the host leaves an active session
    pub fn session_signal(&self) -> &VoidChannel {
        &self.session_end
    }

    /// Fire the reset signal
    pub fn load_scene(&self) -> RaiseReport {
        debug!("Environment::load_scene");
        self.reset.raise()
    }

    /// Fire the session-end signal
    pub fn end_session(&self) -> RaiseReport {
        debug!("Environment::end_session");
        self.session_end.raise()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// A channel's subscriptions to one environment
///
/// Channels without transient state skip the reset hook.
pub(crate) struct LifecycleHooks {
    reset_signal: VoidChannel,
    on_reset: Option<VoidListener>,
    session_signal: VoidChannel,
    on_session_end: VoidListener,
}

impl LifecycleHooks {
    pub(crate) fn attach(env: &Environment, on_reset: Option<VoidListener>, on_session_end: VoidListener) -> Self {
        if let Some(on_reset) = &on_reset {
            env.reset.register_listener(on_reset);
        }
        env.session_end.register_listener(&on_session_end);
        Self {
            reset_signal: env.reset.clone(),
            on_reset,
            session_signal: env.session_end.clone(),
            on_session_end,
        }
    }

    pub(crate) fn detach(self) {
        if let Some(on_reset) = &self.on_reset {
            self.reset_signal.unregister_listener(on_reset);
        }
        self.session_signal.unregister_listener(&self.on_session_end);
    }
}
