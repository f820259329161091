//! ChannelBus - typed publish/subscribe channels
//!
//! Producers and consumers communicate through named channels instead of
//! holding references to each other. A producer raises a value on a channel,
//! every registered listener receives it, and the channel remembers the last
//! value it raised.
//!
//! # Architecture
//!
//! ```text
//! KindRegistry ──creates──▶ ChannelCatalog ──name──▶ Channel<T> / VoidChannel
//!                                  │                       │
//!                                  │ activate_all          │ raise(value)
//!                                  ▼                       ▼
//!                             Environment            Listener<T> ...
//!                        (reset / session end)   (most recent first)
//! ```
//!
//! # Example
//!
//! ```
//! use channelbus::{Channel, Environment, Listener};
//!
//! let env = Environment::new();
//! let health = Channel::<i32>::new("player-health");
//! health.on_activated(&env);
//!
//! let hud = Listener::new(|hp: &i32| println!("hp = {}", hp));
//! assert_eq!(health.register_listener(&hud), 0);
//!
//! let report = health.raise(75);
//! assert_eq!(report.invoked, 1);
//! assert_eq!(health.last_value(), 75);
//!
//! env.load_scene();
//! assert_eq!(health.last_value(), 0);
//! ```

pub mod catalog;
pub mod channel;
pub mod cli;
pub mod config;
pub mod error;
pub mod inspector;
pub mod lifecycle;
pub mod listener;
pub mod payload;
pub mod registry;
mod void;

pub use catalog::{ChannelCatalog, ChannelInfo, ChannelManifest, ManifestEntry};
pub use channel::{AnyChannel, Channel, ChannelId, ChannelOptions, RefreshHook};
pub use error::ChannelError;
pub use inspector::{ChannelDiagnostics, Inspector, inspect};
pub use lifecycle::{Environment, LifecycleState};
pub use listener::{Listener, ListenerResult, RaiseReport, VoidListener};
pub use payload::{Payload, PayloadKind, PayloadValue, Vector2, Vector3};
pub use registry::{ChannelFactory, ChannelKind, KindRegistry};
pub use void::VoidChannel;

/// Default nested raise depth at which a channel logs a reentrancy warning
pub const DEFAULT_REENTRANCY_WARN_DEPTH: usize = 32;
