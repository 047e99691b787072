//! Ephemeral tab lifecycle
//!
//! # Module Layout
//!
//! - [`host`]       -- tab types and the host browser interface
//! - [`selection`]  -- visibility filters and replacement selection
//! - [`controller`] -- auto-close tracking with at-most-once close
//! - [`fake`]       -- in-memory host for tests

pub mod controller;
pub mod fake;
pub mod host;
pub mod selection;

pub use controller::{CloseReason, CompletionSignal, TabLifecycleController};
pub use host::{HostTabManager, Tab, TabId};
