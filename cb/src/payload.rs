//! Payload kinds and the tagged value type used by tooling
//!
//! Typed code works with `Channel<T>` directly. Everything that has to handle
//! channels of unknown type (the catalog, the inspector, the CLI) goes through
//! [`PayloadValue`], a tagged variant with one arm per [`PayloadKind`].

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ChannelError;

/// Tag identifying the payload type a channel carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    /// No payload (VoidChannel)
    Void,
    Bool,
    Int,
    Float,
    Ulong,
    Vector2,
    Vector3,
    /// Application-defined struct, identified by name
    Custom(&'static str),
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Void => "void",
            PayloadKind::Bool => "bool",
            PayloadKind::Int => "int",
            PayloadKind::Float => "float",
            PayloadKind::Ulong => "ulong",
            PayloadKind::Vector2 => "vector2",
            PayloadKind::Vector3 => "vector3",
            PayloadKind::Custom(name) => *name,
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 2D vector payload
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 3D vector payload
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// A payload of any kind, tagged with its kind
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    Void,
    Bool(bool),
    Int(i32),
    Float(f32),
    Ulong(u64),
    Vector2(Vector2),
    Vector3(Vector3),
    Custom {
        kind: &'static str,
        value: serde_json::Value,
    },
}

impl PayloadValue {
    /// Kind tag of this value
    pub fn kind(&self) -> PayloadKind {
        match self {
            PayloadValue::Void => PayloadKind::Void,
            PayloadValue::Bool(_) => PayloadKind::Bool,
            PayloadValue::Int(_) => PayloadKind::Int,
            PayloadValue::Float(_) => PayloadKind::Float,
            PayloadValue::Ulong(_) => PayloadKind::Ulong,
            PayloadValue::Vector2(_) => PayloadKind::Vector2,
            PayloadValue::Vector3(_) => PayloadKind::Vector3,
            PayloadValue::Custom { kind, .. } => PayloadKind::Custom(*kind),
        }
    }

    /// Default value of a built-in kind
    ///
    /// `None` for custom kinds: their default belongs to the Rust type, see
    /// [`crate::AnyChannel::default_value`].
    pub fn default_for(kind: PayloadKind) -> Option<Self> {
        let value = match kind {
            PayloadKind::Void => PayloadValue::Void,
            PayloadKind::Bool => PayloadValue::Bool(false),
            PayloadKind::Int => PayloadValue::Int(0),
            PayloadKind::Float => PayloadValue::Float(0.0),
            PayloadKind::Ulong => PayloadValue::Ulong(0),
            PayloadKind::Vector2 => PayloadValue::Vector2(Vector2::ZERO),
            PayloadKind::Vector3 => PayloadValue::Vector3(Vector3::ZERO),
            PayloadKind::Custom(_) => return None,
        };
        Some(value)
    }

    /// Wrap an application-defined payload
    ///
    /// A payload that cannot be represented as JSON is stored as `null`.
    pub fn custom<S: Serialize>(kind: PayloadKind, payload: &S) -> Self {
        let value = serde_json::to_value(payload).unwrap_or_else(|e| {
            warn!(%kind, error = %e, "PayloadValue::custom: payload not representable as JSON");
            serde_json::Value::Null
        });
        PayloadValue::Custom {
            kind: kind.as_str(),
            value,
        }
    }

    /// Decode an application-defined payload of the given kind
    pub fn to_custom<D: DeserializeOwned>(&self, kind: PayloadKind) -> Result<D, ChannelError> {
        match self {
            PayloadValue::Custom { kind: name, value } if PayloadKind::Custom(*name) == kind => {
                serde_json::from_value(value.clone()).map_err(|e| ChannelError::ParseValue {
                    kind,
                    input: value.to_string(),
                    reason: e.to_string(),
                })
            }
            other => Err(mismatch(kind, other)),
        }
    }

    /// Parse operator-entered text as a value of `kind`
    ///
    /// Vectors accept `x,y` / `x,y,z` with optional parentheses. Custom kinds
    /// take JSON. Void accepts only empty input.
    pub fn parse(kind: PayloadKind, input: &str) -> Result<Self, ChannelError> {
        let text = input.trim();
        let fail = |reason: String| ChannelError::ParseValue {
            kind,
            input: input.to_string(),
            reason,
        };

        match kind {
            PayloadKind::Void => {
                if text.is_empty() {
                    Ok(PayloadValue::Void)
                } else {
                    Err(fail("void channels take no value".to_string()))
                }
            }
            PayloadKind::Bool => text.parse().map(PayloadValue::Bool).map_err(|e| fail(e.to_string())),
            PayloadKind::Int => text.parse().map(PayloadValue::Int).map_err(|e| fail(e.to_string())),
            PayloadKind::Float => text.parse().map(PayloadValue::Float).map_err(|e| fail(e.to_string())),
            PayloadKind::Ulong => text.parse().map(PayloadValue::Ulong).map_err(|e| fail(e.to_string())),
            PayloadKind::Vector2 => {
                let c = parse_components(text, 2).map_err(fail)?;
                Ok(PayloadValue::Vector2(Vector2::new(c[0], c[1])))
            }
            PayloadKind::Vector3 => {
                let c = parse_components(text, 3).map_err(fail)?;
                Ok(PayloadValue::Vector3(Vector3::new(c[0], c[1], c[2])))
            }
            PayloadKind::Custom(name) => serde_json::from_str(text)
                .map(|value| PayloadValue::Custom { kind: name, value })
                .map_err(|e| fail(e.to_string())),
        }
    }
}

fn parse_components(text: &str, expected: usize) -> Result<Vec<f32>, String> {
    let inner = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')).unwrap_or(text);
    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    if parts.len() != expected {
        return Err(format!("expected {} components, found {}", expected, parts.len()));
    }
    parts
        .iter()
        .map(|p| p.parse::<f32>().map_err(|e| format!("{}: {}", p, e)))
        .collect()
}

impl fmt::Display for PayloadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadValue::Void => f.write_str("(none)"),
            PayloadValue::Bool(v) => write!(f, "{}", v),
            PayloadValue::Int(v) => write!(f, "{}", v),
            PayloadValue::Float(v) => write!(f, "{}", v),
            PayloadValue::Ulong(v) => write!(f, "{}", v),
            PayloadValue::Vector2(v) => write!(f, "({}, {})", v.x, v.y),
            PayloadValue::Vector3(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            PayloadValue::Custom { value, .. } => write!(f, "{}", value),
        }
    }
}

pub(crate) fn mismatch(expected: PayloadKind, actual: &PayloadValue) -> ChannelError {
    ChannelError::PayloadMismatch {
        expected,
        actual: actual.kind(),
    }
}

/// A type that can be carried by a `Channel<T>`
///
/// `Default` supplies the last value of a channel that was never raised or
/// has been reset.
pub trait Payload: Clone + Default + Send + Sync + 'static {
    /// Kind tag for this payload type
    const KIND: PayloadKind;

    fn to_value(&self) -> PayloadValue;

    fn from_value(value: &PayloadValue) -> Result<Self, ChannelError>;
}

impl Payload for bool {
    const KIND: PayloadKind = PayloadKind::Bool;

    fn to_value(&self) -> PayloadValue {
        PayloadValue::Bool(*self)
    }

    fn from_value(value: &PayloadValue) -> Result<Self, ChannelError> {
        match value {
            PayloadValue::Bool(v) => Ok(*v),
            other => Err(mismatch(Self::KIND, other)),
        }
    }
}

impl Payload for i32 {
    const KIND: PayloadKind = PayloadKind::Int;

    fn to_value(&self) -> PayloadValue {
        PayloadValue::Int(*self)
    }

    fn from_value(value: &PayloadValue) -> Result<Self, ChannelError> {
        match value {
            PayloadValue::Int(v) => Ok(*v),
            other => Err(mismatch(Self::KIND, other)),
        }
    }
}

impl Payload for f32 {
    const KIND: PayloadKind = PayloadKind::Float;

    fn to_value(&self) -> PayloadValue {
        PayloadValue::Float(*self)
    }

    fn from_value(value: &PayloadValue) -> Result<Self, ChannelError> {
        match value {
            PayloadValue::Float(v) => Ok(*v),
            other => Err(mismatch(Self::KIND, other)),
        }
    }
}

impl Payload for u64 {
    const KIND: PayloadKind = PayloadKind::Ulong;

    fn to_value(&self) -> PayloadValue {
        PayloadValue::Ulong(*self)
    }

    fn from_value(value: &PayloadValue) -> Result<Self, ChannelError> {
        match value {
            PayloadValue::Ulong(v) => Ok(*v),
            other => Err(mismatch(Self::KIND, other)),
        }
    }
}

impl Payload for Vector2 {
    const KIND: PayloadKind = PayloadKind::Vector2;

    fn to_value(&self) -> PayloadValue {
        PayloadValue::Vector2(*self)
    }

    fn from_value(value: &PayloadValue) -> Result<Self, ChannelError> {
        match value {
            PayloadValue::Vector2(v) => Ok(*v),
            other => Err(mismatch(Self::KIND, other)),
        }
    }
}

impl Payload for Vector3 {
    const KIND: PayloadKind = PayloadKind::Vector3;

    fn to_value(&self) -> PayloadValue {
        PayloadValue::Vector3(*self)
    }

    fn from_value(value: &PayloadValue) -> Result<Self, ChannelError> {
        match value {
            PayloadValue::Vector3(v) => Ok(*v),
            other => Err(mismatch(Self::KIND, other)),
        }
    }
}
