//! Registry of browser windows that receive auth broadcasts

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::info;

use crate::auth::state::WindowId;

/// Set of windows that want authentication broadcasts.
///
/// All operations are total and idempotent. [`all_windows`](Self::all_windows)
/// returns a copy, so callers can iterate while other tasks register or
/// unregister windows.
///
/// # Examples
///
/// ```
/// use authtabs::auth::{WindowId, WindowRegistry};
///
/// let registry = WindowRegistry::new();
/// let window = WindowId::new();
///
/// assert!(registry.register(window));
/// assert!(!registry.register(window));
/// assert!(registry.contains(&window));
/// assert_eq!(registry.all_windows(), vec![window]);
/// ```
#[derive(Debug, Default)]
pub struct WindowRegistry {
    windows: Mutex<HashSet<WindowId>>,
}

impl WindowRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn windows(&self) -> MutexGuard<'_, HashSet<WindowId>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a window. Returns `true` if it was not registered before.
    pub fn register(&self, window: WindowId) -> bool {
        let inserted = self.windows().insert(window);
        if inserted {
            info!(window = %window, "Registered window");
        }
        inserted
    }

    /// Unregisters a window. Returns `true` if it was registered.
    pub fn unregister(&self, window: &WindowId) -> bool {
        let removed = self.windows().remove(window);
        if removed {
            info!(window = %window, "Unregistered window");
        }
        removed
    }

    /// Whether `window` is currently registered
    pub fn contains(&self, window: &WindowId) -> bool {
        self.windows().contains(window)
    }

    /// Snapshot of the registered windows
    pub fn all_windows(&self) -> Vec<WindowId> {
        self.windows().iter().copied().collect()
    }

    /// Number of registered windows
    pub fn window_count(&self) -> usize {
        self.windows().len()
    }

    /// Removes every window (teardown and tests)
    pub fn clear(&self) {
        self.windows().clear();
        info!("Cleared all windows");
    }
}
