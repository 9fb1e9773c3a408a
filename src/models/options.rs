//! Construction options for configuration nodes

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::logging::{TracingSink, WarningSink};
use crate::time::{Clock, SystemClock};

/// How long a node trusts its cache before becoming eligible for refresh.
///
/// One second keeps reads cheap while still picking up file edits within
/// roughly a second of landing on disk.
pub const DEFAULT_STALENESS_THRESHOLD: Duration = Duration::from_secs(1);

/// Options controlling a node's refresh behavior and collaborators
#[derive(Clone)]
pub struct NodeOptions {
    /// Minimum elapsed time before the node is eligible for re-refresh
    pub staleness_threshold: Duration,
    /// Time source for staleness checks
    pub clock: Arc<dyn Clock>,
    /// Collaborator receiving refresh warnings
    pub warnings: Arc<dyn WarningSink>,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            staleness_threshold: DEFAULT_STALENESS_THRESHOLD,
            clock: Arc::new(SystemClock),
            warnings: Arc::new(TracingSink),
        }
    }
}

impl NodeOptions {
    /// Default options with a custom staleness threshold
    pub fn with_staleness_threshold(threshold: Duration) -> Self {
        Self {
            staleness_threshold: threshold,
            ..Self::default()
        }
    }
}

impl fmt::Debug for NodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeOptions")
            .field("staleness_threshold", &self.staleness_threshold)
            .finish_non_exhaustive()
    }
}

/// Conventional root directory for configuration trees: `~/.config/canopy`
pub fn default_config_root() -> PathBuf {
    let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home_dir.join(".config").join("canopy")
}
