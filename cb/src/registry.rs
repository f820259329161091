//! KindRegistry - explicit table of channel kinds
//!
//! Each kind maps an id (`"int"`, `"vector3"`, ...) to its payload descriptor
//! and a constructor. Application payloads are added with
//! [`KindRegistry::register`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::channel::{AnyChannel, Channel, ChannelOptions};
use crate::error::ChannelError;
use crate::payload::{Payload, PayloadKind, Vector2, Vector3};
use crate::void::VoidChannel;

/// Constructor for a channel of one kind
pub type ChannelFactory = fn(&str, &ChannelOptions) -> Arc<dyn AnyChannel>;

/// A registered channel kind
#[derive(Debug, Clone, Copy)]
pub struct ChannelKind {
    pub id: &'static str,
    pub payload: PayloadKind,
    pub factory: ChannelFactory,
}

impl ChannelKind {
    pub fn create(&self, name: &str, options: &ChannelOptions) -> Arc<dyn AnyChannel> {
        (self.factory)(name, options)
    }
}

fn make_typed<T: Payload>(name: &str, options: &ChannelOptions) -> Arc<dyn AnyChannel> {
    Arc::new(Channel::<T>::with_options(name, options.clone()))
}

fn make_void(name: &str, options: &ChannelOptions) -> Arc<dyn AnyChannel> {
    Arc::new(VoidChannel::with_options(name, options.clone()))
}

/// Registry of the channel kinds a catalog can create
#[derive(Debug, Clone)]
pub struct KindRegistry {
    kinds: BTreeMap<&'static str, ChannelKind>,
}

impl KindRegistry {
    /// Create a registry with the built-in kinds
    pub fn standard() -> Self {
        let mut registry = Self::empty();

        registry.insert(ChannelKind {
            id: "void",
            payload: PayloadKind::Void,
            factory: make_void,
        });
        registry.insert(typed_kind::<bool>("bool"));
        registry.insert(typed_kind::<i32>("int"));
        registry.insert(typed_kind::<f32>("float"));
        registry.insert(typed_kind::<u64>("ulong"));
        registry.insert(typed_kind::<Vector2>("vector2"));
        registry.insert(typed_kind::<Vector3>("vector3"));

        registry
    }

    /// Create an empty registry (for testing)
    pub fn empty() -> Self {
        Self { kinds: BTreeMap::new() }
    }

    fn insert(&mut self, kind: ChannelKind) {
        self.kinds.insert(kind.id, kind);
    }

    /// Register a payload type under `id`
    pub fn register<T: Payload>(&mut self, id: &'static str) -> Result<(), ChannelError> {
        self.try_insert(typed_kind::<T>(id))
    }

    /// Register an additional payload-less kind under `id`
    pub fn register_void(&mut self, id: &'static str) -> Result<(), ChannelError> {
        self.try_insert(ChannelKind {
            id,
            payload: PayloadKind::Void,
            factory: make_void,
        })
    }

    fn try_insert(&mut self, kind: ChannelKind) -> Result<(), ChannelError> {
        if self.kinds.contains_key(kind.id) {
            return Err(ChannelError::DuplicateKind {
                kind: kind.id.to_string(),
            });
        }
        debug!(kind = kind.id, payload = %kind.payload, "KindRegistry::register");
        self.insert(kind);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&ChannelKind, ChannelError> {
        self.kinds
            .get(id)
            .ok_or_else(|| ChannelError::UnknownKind { kind: id.to_string() })
    }

    pub fn has_kind(&self, id: &str) -> bool {
        self.kinds.contains_key(id)
    }

    /// All kinds, sorted by id
    pub fn kinds(&self) -> Vec<&ChannelKind> {
        self.kinds.values().collect()
    }

    /// Construct a channel of kind `id`
    pub fn create(&self, id: &str, name: &str, options: &ChannelOptions) -> Result<Arc<dyn AnyChannel>, ChannelError> {
        Ok(self.get(id)?.create(name, options))
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn typed_kind<T: Payload>(id: &'static str) -> ChannelKind {
    ChannelKind {
        id,
        payload: T::KIND,
        factory: make_typed::<T>,
    }
}
