//! Refresh engine: staleness policy and cache re-derivation
//!
//! There is no background loop and no filesystem watcher. Staleness is
//! detected lazily at the moment of access: every read calls
//! [`ConfigNode::ensure_fresh`], which re-derives contents only once the
//! node's staleness window has elapsed. A bad edit degrades the node to
//! its last-known-good contents instead of failing readers.

use std::fs;
use std::io;
use std::time::Instant;

use tracing::debug;

use crate::store::node::{ConfigNode, NodeState, NodeVariant};
use crate::store::parser::{self, ParseError};

impl ConfigNode {
    /// Bring the node up to date if its staleness window has elapsed.
    ///
    /// Idempotent, cheap inside the window (one clock read, no I/O), and
    /// safe to call on every access. Steady-state failures are absorbed:
    /// a vanished path empties the filesystem-derived layer, an
    /// unparseable file keeps the previous contents and emits one warning
    /// through the node's sink.
    pub fn ensure_fresh(&self) {
        let now = self.options().clock.now();
        let mut state = self.lock_state();

        if let Some(at) = state.last_refreshed_at {
            if now.duration_since(at) < self.options().staleness_threshold {
                return;
            }
        }

        if !self.source_path().exists() {
            if !state.entries.is_empty() {
                debug!(
                    path = %self.source_path().display(),
                    "backing path vanished, clearing filesystem-derived contents"
                );
            }
            state.entries.clear();
            state.last_refreshed_at = Some(now);
            return;
        }

        match self.variant() {
            NodeVariant::FileBacked => self.refresh_file(&mut state, now),
            NodeVariant::DirectoryBacked => self.reconcile_children(&mut state, now),
        }

        state.last_refreshed_at = Some(now);
    }

    /// Re-parse the backing file, replacing the derived layer on success
    /// and retaining it on failure.
    fn refresh_file(&self, state: &mut NodeState, now: Instant) {
        match fs::read_to_string(self.source_path()) {
            Ok(content) => match parser::parse_document(&content) {
                Ok(entries) => {
                    state.entries = entries;
                    state.last_known_good_at = Some(now);
                }
                Err(err) => self.warn_not_updating(&err),
            },
            // Vanished between the existence check and the read
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                state.entries.clear();
            }
            Err(err) => self.warn_not_updating(&ParseError::Io(err)),
        }
    }

    fn warn_not_updating(&self, err: &ParseError) {
        self.options().warnings.warn(&format!(
            "not updating configuration from {}: parse failed: {}",
            self.source_path().display(),
            err
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::RecordingSink;
    use crate::models::NodeOptions;
    use crate::time::MockClock;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Clock whose reading is driven by a shared millisecond offset, so
    /// tests advance time without sleeping.
    fn scripted_clock(offset_ms: Arc<AtomicU64>) -> MockClock {
        let base = Instant::now();
        let mut clock = MockClock::new();
        clock
            .expect_now()
            .returning(move || base + Duration::from_millis(offset_ms.load(Ordering::SeqCst)));
        clock
    }

    struct Fixture {
        dir: TempDir,
        offset_ms: Arc<AtomicU64>,
        sink: Arc<RecordingSink>,
        node: ConfigNode,
    }

    fn file_fixture(initial: &str) -> Fixture {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.conf");
        fs::write(&path, initial).unwrap();

        let offset_ms = Arc::new(AtomicU64::new(0));
        let sink = Arc::new(RecordingSink::new());
        let options = NodeOptions {
            staleness_threshold: Duration::from_secs(1),
            clock: Arc::new(scripted_clock(offset_ms.clone())),
            warnings: sink.clone(),
        };
        let node = ConfigNode::with_options(&path, options).unwrap();

        Fixture {
            dir,
            offset_ms,
            sink,
            node,
        }
    }

    impl Fixture {
        fn conf_path(&self) -> std::path::PathBuf {
            self.dir.path().join("test.conf")
        }

        fn advance_ms(&self, ms: u64) {
            self.offset_ms.fetch_add(ms, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_refresh_skipped_inside_staleness_window() {
        let fx = file_fixture(r#"{"testkey": "testvalue0"}"#);

        assert_eq!(fx.node.get("testkey").unwrap().as_str(), Some("testvalue0"));

        // The file changes but the clock does not advance, so the cached
        // contents are served without re-reading.
        fs::write(fx.conf_path(), r#"{"testkey": "testvalue1"}"#).unwrap();
        assert_eq!(fx.node.get("testkey").unwrap().as_str(), Some("testvalue0"));

        fx.advance_ms(1500);
        assert_eq!(fx.node.get("testkey").unwrap().as_str(), Some("testvalue1"));
    }

    #[test]
    fn test_is_current_tracks_staleness_window() {
        let fx = file_fixture(r#"{"testkey": "testvalue0"}"#);
        assert!(!fx.node.is_current());

        fx.node.ensure_fresh();
        assert!(fx.node.is_current());

        fx.advance_ms(1500);
        assert!(!fx.node.is_current());
    }

    #[test]
    fn test_parse_failure_keeps_last_known_good() {
        let fx = file_fixture(r#"{"testkey": "testvalue0"}"#);

        assert_eq!(fx.node.get("testkey").unwrap().as_str(), Some("testvalue0"));
        let good_at = fx.node.last_known_good_at().unwrap();

        fs::write(fx.conf_path(), "bad json").unwrap();
        fx.advance_ms(1500);

        assert_eq!(fx.node.get("testkey").unwrap().as_str(), Some("testvalue0"));
        assert_eq!(fx.sink.messages().len(), 1);
        assert!(fx.sink.messages()[0].contains("not updating"));
        assert_eq!(fx.node.last_known_good_at(), Some(good_at));

        // Still inside the new window: no second read, no second warning
        fx.node.ensure_fresh();
        assert_eq!(fx.sink.messages().len(), 1);
    }

    #[test]
    fn test_recovery_after_file_repaired() {
        let fx = file_fixture(r#"{"testkey": "testvalue0"}"#);
        fx.node.ensure_fresh();

        fs::write(fx.conf_path(), "bad json").unwrap();
        fx.advance_ms(1500);
        fx.node.ensure_fresh();

        fs::write(fx.conf_path(), r#"{"testkey": "testvalue2"}"#).unwrap();
        fx.advance_ms(1500);
        assert_eq!(fx.node.get("testkey").unwrap().as_str(), Some("testvalue2"));
    }

    #[test]
    fn test_vanished_file_empties_derived_contents() {
        let fx = file_fixture(r#"{"testkey": "testvalue0"}"#);
        fx.node.set("session", "override");

        assert!(fx.node.has_key("testkey"));

        fs::remove_file(fx.conf_path()).unwrap();
        fx.advance_ms(1500);

        assert!(!fx.node.has_key("testkey"));
        // The override layer is untouched by the vanish
        assert_eq!(fx.node.get("session").unwrap().as_str(), Some("override"));
    }

    #[test]
    fn test_vanished_then_restored_file_reappears() {
        let fx = file_fixture(r#"{"testkey": "testvalue0"}"#);
        fx.node.ensure_fresh();

        fs::remove_file(fx.conf_path()).unwrap();
        fx.advance_ms(1500);
        assert!(!fx.node.has_key("testkey"));

        fs::write(fx.conf_path(), r#"{"testkey": "testvalue3"}"#).unwrap();
        fx.advance_ms(1500);
        assert_eq!(fx.node.get("testkey").unwrap().as_str(), Some("testvalue3"));
    }
}
