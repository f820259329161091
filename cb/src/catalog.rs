//! ChannelCatalog - named channel instances and their manifest
//!
//! The catalog is where producers and consumers meet: both look a channel up
//! by name instead of holding references to each other. Which channels exist
//! is described by a YAML manifest:
//!
//! ```yaml
//! channels:
//!   - name: player-health
//!     kind: int
//!   - name: level-complete
//!     kind: void
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::channel::{AnyChannel, Channel, ChannelOptions};
use crate::error::ChannelError;
use crate::lifecycle::Environment;
use crate::payload::{Payload, PayloadKind};
use crate::registry::KindRegistry;
use crate::void::VoidChannel;

/// One channel declaration in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub kind: String,
}

/// Persistent list of channel declarations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelManifest {
    #[serde(default)]
    pub channels: Vec<ManifestEntry>,
}

impl ChannelManifest {
    /// Load a manifest; a missing file is an empty manifest
    pub fn load(path: &Path) -> Result<Self, ChannelError> {
        if !path.exists() {
            debug!(?path, "ChannelManifest::load: no manifest, starting empty");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let manifest: ChannelManifest = serde_yaml::from_str(&content)?;
        debug!(?path, count = manifest.channels.len(), "ChannelManifest::load");
        Ok(manifest)
    }

    /// Save the manifest, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<(), ChannelError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        debug!(?path, count = self.channels.len(), "ChannelManifest::save");
        Ok(())
    }
}

struct CatalogEntry {
    kind: String,
    channel: Arc<dyn AnyChannel>,
}

/// Summary of one catalog entry, as returned by [`ChannelCatalog::list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub name: String,
    pub kind: String,
    pub payload: PayloadKind,
}

/// Named channel instances created from a [`KindRegistry`]
pub struct ChannelCatalog {
    registry: KindRegistry,
    options: ChannelOptions,
    entries: BTreeMap<String, CatalogEntry>,
}

impl ChannelCatalog {
    pub fn new(registry: KindRegistry, options: ChannelOptions) -> Self {
        Self {
            registry,
            options,
            entries: BTreeMap::new(),
        }
    }

    /// Build a catalog holding every channel declared in `manifest`
    pub fn from_manifest(
        manifest: &ChannelManifest,
        registry: KindRegistry,
        options: ChannelOptions,
    ) -> Result<Self, ChannelError> {
        let mut catalog = Self::new(registry, options);
        for entry in &manifest.channels {
            catalog.create(&entry.name, &entry.kind)?;
        }
        Ok(catalog)
    }

    /// Manifest describing the current catalog contents
    pub fn manifest(&self) -> ChannelManifest {
        ChannelManifest {
            channels: self
                .entries
                .iter()
                .map(|(name, entry)| ManifestEntry {
                    name: name.clone(),
                    kind: entry.kind.clone(),
                })
                .collect(),
        }
    }

    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    /// Create a channel of kind `kind` under `name`
    pub fn create(&mut self, name: &str, kind: &str) -> Result<Arc<dyn AnyChannel>, ChannelError> {
        let name = validate_name(name)?;
        if self.entries.contains_key(name) {
            return Err(ChannelError::DuplicateChannel { name: name.to_string() });
        }

        let channel = self.registry.create(kind, name, &self.options)?;
        info!(name, kind, id = %channel.id(), "Created channel");
        self.entries.insert(
            name.to_string(),
            CatalogEntry {
                kind: kind.to_string(),
                channel: Arc::clone(&channel),
            },
        );
        Ok(channel)
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn AnyChannel>, ChannelError> {
        self.entries
            .get(name)
            .map(|entry| Arc::clone(&entry.channel))
            .ok_or_else(|| ChannelError::ChannelNotFound { name: name.to_string() })
    }

    /// Look up a channel and recover its concrete payload type
    pub fn typed<T: Payload>(&self, name: &str) -> Result<Channel<T>, ChannelError> {
        let channel = self.get(name)?;
        channel
            .as_any()
            .downcast_ref::<Channel<T>>()
            .cloned()
            .ok_or(ChannelError::PayloadMismatch {
                expected: T::KIND,
                actual: channel.payload_kind(),
            })
    }

    /// Look up a payload-less channel
    pub fn void(&self, name: &str) -> Result<VoidChannel, ChannelError> {
        let channel = self.get(name)?;
        channel
            .as_any()
            .downcast_ref::<VoidChannel>()
            .cloned()
            .ok_or(ChannelError::PayloadMismatch {
                expected: PayloadKind::Void,
                actual: channel.payload_kind(),
            })
    }

    /// All channels, sorted by name
    pub fn list(&self) -> Vec<ChannelInfo> {
        self.entries
            .iter()
            .map(|(name, entry)| ChannelInfo {
                name: name.clone(),
                kind: entry.kind.clone(),
                payload: entry.channel.payload_kind(),
            })
            .collect()
    }

    /// Remove a channel and tear it down
    ///
    /// Handles held elsewhere stay valid but no longer have listeners.
    pub fn delete(&mut self, name: &str) -> Result<(), ChannelError> {
        let entry = self
            .entries
            .remove(name)
            .ok_or_else(|| ChannelError::ChannelNotFound { name: name.to_string() })?;
        entry.channel.teardown();
        info!(name, "Deleted channel");
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Activate every channel against `env`
    pub fn activate_all(&self, env: &Environment) {
        for entry in self.entries.values() {
            entry.channel.on_activated(env);
        }
        debug!(count = self.entries.len(), "ChannelCatalog::activate_all");
    }

    pub fn deactivate_all(&self) {
        for entry in self.entries.values() {
            entry.channel.on_deactivated();
        }
        debug!(count = self.entries.len(), "ChannelCatalog::deactivate_all");
    }
}

impl Default for ChannelCatalog {
    fn default() -> Self {
        Self::new(KindRegistry::standard(), ChannelOptions::default())
    }
}

fn validate_name(name: &str) -> Result<&str, ChannelError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed != name || name.chars().any(char::is_control) {
        return Err(ChannelError::InvalidName(name.to_string()));
    }
    Ok(name)
}
