//! Channel error types

use thiserror::Error;

use crate::payload::PayloadKind;

/// Errors raised by the catalog, registry and type-erased channel API
///
/// Listener failures are not represented here: they are isolated per
/// listener and reported through [`crate::RaiseReport`].
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Unknown channel kind: {kind}")]
    UnknownKind { kind: String },

    #[error("Channel kind already registered: {kind}")]
    DuplicateKind { kind: String },

    #[error("Channel already exists: {name}")]
    DuplicateChannel { name: String },

    #[error("Channel not found: {name}")]
    ChannelNotFound { name: String },

    #[error("Invalid channel name: {0:?}")]
    InvalidName(String),

    #[error("Payload mismatch: expected {expected}, got {actual}")]
    PayloadMismatch { expected: PayloadKind, actual: PayloadKind },

    #[error("Cannot parse {input:?} as {kind}: {reason}")]
    ParseValue {
        kind: PayloadKind,
        input: String,
        reason: String,
    },

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChannelError {
    /// Check if this error refers to a missing channel or kind
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ChannelError::ChannelNotFound { .. } | ChannelError::UnknownKind { .. }
        )
    }

    /// Check if this error was caused by a value of the wrong payload kind
    pub fn is_payload_error(&self) -> bool {
        matches!(
            self,
            ChannelError::PayloadMismatch { .. } | ChannelError::ParseValue { .. }
        )
    }
}
