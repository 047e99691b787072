//! authtabs - Window-scoped auth state and ephemeral tab lifecycle
//!
//! This library tracks per-window authentication state for a multi-window
//! browser and manages the hidden tabs an authentication flow opens, closing
//! each one exactly once when the flow completes, its content settles, or a
//! fallback timer expires.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `auth`: Window registry, auth state reducer and broadcasting store
//! - `tabs`: Host tab interface and the auto-close lifecycle controller
//! - `integration`: Facade wiring the store, controller and host together
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `logging`: tracing subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use authtabs::auth::{AuthStateStore, WindowRegistry};
//! use authtabs::tabs::fake::FakeTabManager;
//! use authtabs::{Config, IntegrationFacade, TabLifecycleController};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("authtabs.yaml")?;
//!     config.validate()?;
//!     authtabs::logging::init_logging(&config.logging)?;
//!
//!     let store = Arc::new(AuthStateStore::new(Arc::new(WindowRegistry::new())));
//!     let controller = TabLifecycleController::new(config.tabs.clone());
//!     let _facade = IntegrationFacade::new(Arc::new(FakeTabManager::new()), controller, store);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod integration;
pub mod logging;
pub mod tabs;

// Re-export commonly used types
pub use auth::{AuthAction, AuthState, AuthStateStore, WindowId, WindowRegistry};
pub use config::Config;
pub use error::{AuthTabsError, Result};
pub use integration::IntegrationFacade;
pub use tabs::{CompletionSignal, HostTabManager, Tab, TabId, TabLifecycleController};

#[cfg(test)]
pub mod test_utils;
