//! Canopy - Self-Refreshing Configuration Tree
//!
//! Canopy mirrors a filesystem hierarchy as a live configuration tree:
//! directories become nested configuration nodes, individual files become
//! leaf key/value maps, and the tree keeps itself consistent with the
//! filesystem without the caller ever reloading anything by hand.

pub mod logging;
pub mod models;
pub mod store;
pub mod time;

pub use models::*;
pub use store::*;

/// Result type alias for Canopy operations
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to Canopy operations
#[derive(thiserror::Error, Debug)]
pub enum CanopyError {
    #[error("Invalid configuration path: {}", .0.display())]
    InvalidPath(std::path::PathBuf),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}
