//! Inspector - diagnostics and manual raising for tooling
//!
//! Scratch values are the operator's pending test inputs, one per channel.
//! They live here, not on the channel, and are dropped by [`Inspector::clear`].

use std::collections::HashMap;

use tracing::debug;

use crate::channel::{AnyChannel, ChannelId};
use crate::error::ChannelError;
use crate::lifecycle::LifecycleState;
use crate::listener::RaiseReport;
use crate::payload::{PayloadKind, PayloadValue, mismatch};

/// Point-in-time diagnostics for one channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDiagnostics {
    pub id: ChannelId,
    pub name: String,
    pub payload: PayloadKind,
    pub lifecycle: LifecycleState,
    pub listener_count: usize,
    /// `None` for channels without a payload
    pub last_value: Option<PayloadValue>,
}

/// Read channel diagnostics
pub fn inspect(channel: &dyn AnyChannel) -> ChannelDiagnostics {
    ChannelDiagnostics {
        id: channel.id(),
        name: channel.name().to_string(),
        payload: channel.payload_kind(),
        lifecycle: channel.lifecycle(),
        listener_count: channel.listener_count(),
        last_value: channel.last_value(),
    }
}

/// Session-scoped tooling state
#[derive(Debug, Default)]
pub struct Inspector {
    scratch: HashMap<ChannelId, PayloadValue>,
}

impl Inspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current scratch value, seeded with the channel's default on first use
    pub fn scratch_value(&mut self, channel: &dyn AnyChannel) -> PayloadValue {
        self.scratch
            .entry(channel.id())
            .or_insert_with(|| channel.default_value())
            .clone()
    }

    /// Replace the scratch value; the value must match the channel's kind
    pub fn set_scratch(&mut self, channel: &dyn AnyChannel, value: PayloadValue) -> Result<(), ChannelError> {
        if value.kind() != channel.payload_kind() {
            return Err(mismatch(channel.payload_kind(), &value));
        }
        debug!(channel = channel.name(), %value, "Inspector::set_scratch");
        self.scratch.insert(channel.id(), value);
        Ok(())
    }

    /// Parse operator text into the scratch value
    ///
    /// On a parse error the previous scratch value is kept.
    pub fn edit_scratch(&mut self, channel: &dyn AnyChannel, input: &str) -> Result<PayloadValue, ChannelError> {
        let value = PayloadValue::parse(channel.payload_kind(), input)?;
        self.set_scratch(channel, value.clone())?;
        Ok(value)
    }

    /// Raise the channel with its scratch value
    pub fn raise_scratch(&mut self, channel: &dyn AnyChannel) -> Result<RaiseReport, ChannelError> {
        let value = self.scratch_value(channel);
        debug!(channel = channel.name(), %value, "Inspector::raise_scratch");
        channel.raise_value(&value)
    }

    /// Forget the scratch value of one channel
    pub fn forget(&mut self, id: ChannelId) {
        self.scratch.remove(&id);
    }

    /// Drop every scratch value (full reload)
    pub fn clear(&mut self) {
        self.scratch.clear();
    }

    pub fn len(&self) -> usize {
        self.scratch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scratch.is_empty()
    }
}
