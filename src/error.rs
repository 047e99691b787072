//! Error types for AuthTabs
//!
//! This module defines the error taxonomy used throughout the crate,
//! using `thiserror` for ergonomic error handling.
//!
//! Most of these errors never reach callers of the lifecycle operations.
//! Tab tracking and auth broadcasting are best-effort: failures are logged
//! where they happen and the operation degrades to a no-op. The variants are
//! still typed so that log lines and the few fallible entry points (config
//! loading, tab creation, batch tracking) share one vocabulary.

use thiserror::Error;

/// Main error type for AuthTabs operations
#[derive(Error, Debug)]
pub enum AuthTabsError {
    /// A collaborator (usually the host tab manager) has not been wired up yet
    #[error("Not initialized: {0}")]
    NotInitialized(String),

    /// A batch tracking request exceeded the configured concurrent-tab limit
    #[error("Capacity exceeded: limit={limit}, requested={requested}")]
    CapacityExceeded {
        /// The configured maximum number of concurrently tracked tabs
        limit: usize,
        /// The size of the rejected batch
        requested: usize,
    },

    /// The host failed to open a tab
    #[error("Tab creation failed: {0}")]
    TabCreation(String),

    /// The host failed to remove a tab
    #[error("Tab removal failed: {0}")]
    TabRemoval(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for AuthTabs operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
