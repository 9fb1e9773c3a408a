//! Directory reconciliation: diffing observed entries against known children
//!
//! A directory-backed node's children are constructed lazily the first time
//! an entry is observed and are kept by reference across rescans, so an
//! unchanged subtree keeps its cached contents and its identity. Callers
//! may therefore cache derived state keyed on a child node reference.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::models::ConfigValue;
use crate::store::node::{ConfigNode, NodeState};

impl ConfigNode {
    /// Re-scan the backing directory and reconcile the child set.
    ///
    /// Surviving entries keep their node instance untouched (each child
    /// handles its own staleness on its own next access); new entries get
    /// a lazily constructed child inheriting this node's options; vanished
    /// entries are pruned. Override keys are never touched.
    pub(crate) fn reconcile_children(&self, state: &mut NodeState, now: Instant) {
        let listing = match fs::read_dir(self.source_path()) {
            Ok(listing) => listing,
            Err(err) => {
                self.options().warnings.warn(&format!(
                    "not updating configuration from {}: directory listing failed: {}",
                    self.source_path().display(),
                    err
                ));
                return;
            }
        };

        let mut observed: HashMap<String, PathBuf> = HashMap::new();
        for entry in listing.flatten() {
            let path = entry.path();
            // Follows symlinks; entries that resolve to neither a regular
            // file nor a directory are ignored.
            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(_) => continue,
            };
            if !metadata.is_file() && !metadata.is_dir() {
                continue;
            }
            if let Some(key) = child_key(&path, metadata.is_dir()) {
                observed.insert(key, path);
            }
        }

        // Prune children whose backing entry vanished or changed shape
        state.entries.retain(|key, value| match value {
            ConfigValue::Node(child) => observed
                .get(key)
                .map_or(false, |path| path == child.source_path()),
            _ => true,
        });

        // Lazily construct nodes for newly observed entries
        for (key, path) in observed {
            if state.entries.contains_key(&key) {
                continue;
            }
            match ConfigNode::with_options(&path, self.options().clone()) {
                Ok(child) => {
                    debug!(key = %key, path = %path.display(), "new configuration entry");
                    state.entries.insert(key, ConfigValue::Node(Arc::new(child)));
                }
                Err(err) => {
                    // Entry vanished between the listing and construction;
                    // the next rescan settles it.
                    debug!(path = %path.display(), error = %err, "skipping configuration entry");
                }
            }
        }

        state.last_known_good_at = Some(now);
    }
}

/// Derive the child key for one directory entry: file stem for regular
/// files (`test.conf` -> `test`), directory name verbatim for
/// subdirectories. Hidden entries produce no key.
fn child_key(path: &Path, is_dir: bool) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with('.') {
        return None;
    }
    if is_dir {
        return Some(name.to_string());
    }
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_keys_strip_final_extension() {
        assert_eq!(
            child_key(Path::new("/etc/canopy/test.conf"), false).unwrap(),
            "test"
        );
        assert_eq!(
            child_key(Path::new("/etc/canopy/bundle.tar.gz"), false).unwrap(),
            "bundle.tar"
        );
    }

    #[test]
    fn test_extensionless_files_keep_their_name() {
        assert_eq!(
            child_key(Path::new("/etc/canopy/README"), false).unwrap(),
            "README"
        );
    }

    #[test]
    fn test_directory_keys_are_verbatim() {
        assert_eq!(
            child_key(Path::new("/etc/canopy/clouds.d"), true).unwrap(),
            "clouds.d"
        );
    }

    #[test]
    fn test_hidden_entries_are_skipped() {
        assert!(child_key(Path::new("/etc/canopy/.hidden.conf"), false).is_none());
        assert!(child_key(Path::new("/etc/canopy/.git"), true).is_none());
    }

    #[test]
    fn test_key_case_is_preserved() {
        assert_eq!(
            child_key(Path::new("/etc/canopy/Clouds.conf"), false).unwrap(),
            "Clouds"
        );
    }
}
