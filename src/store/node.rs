//! Configuration node: the single entity at every level of the tree
//!
//! A node mirrors one filesystem path. File-backed nodes hold the parsed
//! key/value map of that file; directory-backed nodes hold child nodes keyed
//! by derived names. Every read brings the node up to date through the
//! refresh engine first, then serves from cache, so callers never reload
//! anything themselves.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::models::{default_config_root, ConfigValue, NodeOptions};
use crate::{CanopyError, Result};

/// Whether a node mirrors a regular file or a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeVariant {
    /// Leaf node holding one parsed document
    FileBacked,
    /// Interior node holding child nodes
    DirectoryBacked,
}

/// Cached, refreshable state of one node.
///
/// `entries` is the filesystem-derived layer and is rewritten by refreshes;
/// `overrides` is written only through the API and survives every refresh.
/// Both live under one mutex so the staleness check-then-act sequence and
/// the two-layer merge read are each atomic per node.
#[derive(Debug, Default)]
pub(crate) struct NodeState {
    pub(crate) entries: HashMap<String, ConfigValue>,
    pub(crate) overrides: HashMap<String, ConfigValue>,
    pub(crate) last_refreshed_at: Option<Instant>,
    pub(crate) last_known_good_at: Option<Instant>,
}

/// One entry in the configuration tree, mirroring a file or directory
pub struct ConfigNode {
    source_path: PathBuf,
    variant: NodeVariant,
    options: NodeOptions,
    state: Mutex<NodeState>,
}

impl ConfigNode {
    /// Open a node over `path` with default options.
    ///
    /// The path must exist; whether it is a directory or a regular file
    /// decides the node's variant. Contents are not read here: the first
    /// access triggers the first refresh.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(path, NodeOptions::default())
    }

    /// Open a node over `path` with explicit options
    pub fn with_options(path: impl AsRef<Path>, options: NodeOptions) -> Result<Self> {
        let path = path.as_ref();
        let metadata =
            fs::metadata(path).map_err(|_| CanopyError::InvalidPath(path.to_path_buf()))?;

        let variant = if metadata.is_dir() {
            NodeVariant::DirectoryBacked
        } else {
            NodeVariant::FileBacked
        };

        Ok(Self {
            source_path: path.to_path_buf(),
            variant,
            options,
            state: Mutex::new(NodeState::default()),
        })
    }

    /// Open the conventional configuration root (`~/.config/canopy`)
    pub fn from_default_root() -> Result<Self> {
        Self::new(default_config_root())
    }

    /// The filesystem path this node mirrors
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// The node's variant
    pub fn variant(&self) -> NodeVariant {
        self.variant
    }

    /// Whether this node mirrors a directory
    pub fn is_directory(&self) -> bool {
        self.variant == NodeVariant::DirectoryBacked
    }

    pub(crate) fn options(&self) -> &NodeOptions {
        &self.options
    }

    // A poisoned lock only means another thread panicked mid-refresh;
    // serving the surviving state beats propagating the panic.
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, NodeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up `key`, refreshing first. Overrides shadow filesystem-derived
    /// values; absent keys return `None`.
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        self.ensure_fresh();
        let state = self.lock_state();
        state
            .overrides
            .get(key)
            .or_else(|| state.entries.get(key))
            .cloned()
    }

    /// Set an in-memory override for `key`.
    ///
    /// Never touches the filesystem and is immediately visible to reads;
    /// the value persists across refreshes until [`delete`](Self::delete)d.
    pub fn set(&self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        let mut state = self.lock_state();
        state.overrides.insert(key.into(), value.into());
    }

    /// Remove `key` from both layers, returning whatever a read would have
    /// seen, or `None` if the key was absent.
    pub fn delete(&self, key: &str) -> Option<ConfigValue> {
        let mut state = self.lock_state();
        let overridden = state.overrides.remove(key);
        let derived = state.entries.remove(key);
        overridden.or(derived)
    }

    /// Whether `key` resolves through either layer, refreshing first
    pub fn has_key(&self, key: &str) -> bool {
        self.ensure_fresh();
        let state = self.lock_state();
        state.overrides.contains_key(key) || state.entries.contains_key(key)
    }

    /// Whether the cache is inside its staleness window.
    ///
    /// A pure probe: never triggers a refresh. False until the first access
    /// refreshes the node.
    pub fn is_current(&self) -> bool {
        let now = self.options.clock.now();
        let state = self.lock_state();
        state
            .last_refreshed_at
            .map_or(false, |at| now.duration_since(at) < self.options.staleness_threshold)
    }

    /// All currently visible keys, sorted, refreshing first
    pub fn keys(&self) -> Vec<String> {
        self.ensure_fresh();
        let state = self.lock_state();
        let mut keys: Vec<String> = state
            .entries
            .keys()
            .chain(state.overrides.keys())
            .cloned()
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Number of visible keys, refreshing first
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    /// Whether the node has no visible keys, refreshing first
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Snapshot of all visible keys to their values, refreshing first.
    ///
    /// Child nodes appear by reference, not deep-copied; serialize the
    /// snapshot to deep-render the subtree.
    pub fn to_map(&self) -> HashMap<String, ConfigValue> {
        self.ensure_fresh();
        let state = self.lock_state();
        let mut snapshot = state.entries.clone();
        for (key, value) in &state.overrides {
            snapshot.insert(key.clone(), value.clone());
        }
        snapshot
    }

    /// Snapshot filtered to the requested keys; unknown keys are simply
    /// absent from the result.
    pub fn slice<I, S>(&self, keys: I) -> HashMap<String, ConfigValue>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_fresh();
        let state = self.lock_state();
        let mut snapshot = HashMap::new();
        for key in keys {
            let key = key.as_ref();
            if let Some(value) = state.overrides.get(key).or_else(|| state.entries.get(key)) {
                snapshot.insert(key.to_string(), value.clone());
            }
        }
        snapshot
    }

    /// When the last consistent refresh attempt finished, if any
    pub fn last_refreshed_at(&self) -> Option<Instant> {
        self.lock_state().last_refreshed_at
    }

    /// When contents last parsed successfully, if ever
    pub fn last_known_good_at(&self) -> Option<Instant> {
        self.lock_state().last_known_good_at
    }
}

impl fmt::Debug for ConfigNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigNode")
            .field("source_path", &self.source_path)
            .field("variant", &self.variant)
            .finish_non_exhaustive()
    }
}

/// Serializes the node's current visible contents, deep-rendering child
/// nodes through their own refreshed snapshots.
impl Serialize for ConfigNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let snapshot = self.to_map();
        let mut map = serializer.serialize_map(Some(snapshot.len()))?;
        for (key, value) in &snapshot {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
