//! Serialized per-window authentication state store
//!
//! [`AuthStateStore`] owns the window to [`AuthState`] map. Every mutation goes
//! through [`AuthStateStore::dispatch`], which applies [`reduce`] under the map
//! lock and enqueues an [`AuthStateChange`] for asynchronous delivery.
//!
//! # Delivery
//!
//! Changes are queued on an unbounded channel while the map lock is still
//! held, so queue order is commit order. A single task spawned by
//! [`AuthStateStore::new`] drains the queue and calls each subscriber outside
//! any lock. Subscribers therefore observe the changes for one window in the
//! order they were dispatched, and a slow subscriber never delays the next
//! dispatch.
//!
//! A subscriber that panics is logged and skipped; the remaining subscribers
//! and later broadcasts are unaffected.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::auth::registry::WindowRegistry;
use crate::auth::state::{
    reduce, ActionType, AuthAction, AuthActionKind, AuthState, AuthStateChange, WindowId,
};

/// Callback invoked for every committed state change
pub type AuthObserver = Arc<dyn Fn(&AuthStateChange) + Send + Sync + 'static>;

/// Handle returned by [`AuthStateStore::subscribe`]
///
/// Identifiers are never reused, so unsubscribing a stale handle cannot
/// remove a newer subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    observer: AuthObserver,
}

type Subscribers = Arc<Mutex<Vec<Subscriber>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Window-scoped authentication state store
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use authtabs::auth::{AuthAction, AuthStateStore, WindowId, WindowRegistry};
///
/// # #[tokio::main]
/// # async fn main() {
/// let store = AuthStateStore::new(Arc::new(WindowRegistry::new()));
/// let window = WindowId::new();
///
/// store.dispatch(AuthAction::user_logged_in(window));
///
/// let state = store.get_state(&window).unwrap();
/// assert!(state.is_logged_in);
/// assert!(!state.auth_state_loaded);
/// # }
/// ```
pub struct AuthStateStore {
    registry: Arc<WindowRegistry>,
    states: Mutex<HashMap<WindowId, AuthState>>,
    subscribers: Subscribers,
    next_subscription: AtomicU64,
    broadcast_tx: mpsc::UnboundedSender<AuthStateChange>,
}

impl fmt::Debug for AuthStateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthStateStore")
            .field("windows", &lock(&self.states).len())
            .field("subscribers", &lock(&self.subscribers).len())
            .finish()
    }
}

impl AuthStateStore {
    /// Creates an empty store bound to `registry`.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime; the broadcast delivery
    /// task is spawned here.
    pub fn new(registry: Arc<WindowRegistry>) -> Self {
        let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();
        let subscribers: Subscribers = Arc::new(Mutex::new(Vec::new()));

        tokio::spawn(deliver_broadcasts(broadcast_rx, Arc::clone(&subscribers)));
        debug!("AuthStateStore initialized");

        Self {
            registry,
            states: Mutex::new(HashMap::new()),
            subscribers,
            next_subscription: AtomicU64::new(1),
            broadcast_tx,
        }
    }

    /// The registry this store broadcasts to
    pub fn registry(&self) -> &Arc<WindowRegistry> {
        &self.registry
    }

    /// Current state for `window`, or `None` if nothing was ever dispatched for it
    pub fn get_state(&self, window: &WindowId) -> Option<AuthState> {
        lock(&self.states).get(window).copied()
    }

    /// Snapshot of every window's state
    pub fn get_all_states(&self) -> HashMap<WindowId, AuthState> {
        lock(&self.states).clone()
    }

    /// Applies `action` to its window and schedules the broadcast.
    ///
    /// Dispatching for a window that was never registered is legal and
    /// initializes its state. Returns the committed state.
    pub fn dispatch(&self, action: AuthAction) -> AuthState {
        let action_type = action.action_type();
        let new_state = {
            let mut states = lock(&self.states);
            let new_state = reduce(states.get(&action.window), &action);
            states.insert(action.window, new_state);

            let change = AuthStateChange {
                window: action.window,
                state: new_state,
                action_type,
            };
            if self.broadcast_tx.send(change).is_err() {
                warn!(window = %action.window, "Broadcast delivery task has stopped");
            }
            new_state
        };

        debug!(
            window = %action.window,
            action = %action_type,
            is_logged_in = new_state.is_logged_in,
            "Dispatched auth action"
        );
        new_state
    }

    /// Dispatches one action per currently registered window.
    ///
    /// The registry is read once; windows registered afterwards are not part
    /// of this round. Returns the number of windows dispatched to.
    pub fn dispatch_to_all_registered_windows(
        &self,
        is_logged_in: bool,
        action_type: ActionType,
    ) -> usize {
        let windows = self.registry.all_windows();
        let kind = AuthActionKind::from_type(action_type, is_logged_in);

        for window in &windows {
            self.dispatch(AuthAction::new(*window, kind));
        }

        debug!(
            action = %action_type,
            windows = windows.len(),
            "Dispatched to all registered windows"
        );
        windows.len()
    }

    /// Registers `observer` for every subsequent broadcast.
    ///
    /// Observers are not scoped to a window; filter on
    /// [`AuthStateChange::window`] if needed.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&AuthStateChange) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        lock(&self.subscribers).push(Subscriber {
            id,
            observer: Arc::new(observer),
        });
        debug!(subscription = id.0, "Added auth state observer");
        id
    }

    /// Removes a subscriber. Unknown or already removed handles are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = lock(&self.subscribers);
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        let removed = subscribers.len() != before;
        if removed {
            debug!(subscription = id.0, "Removed auth state observer");
        }
        removed
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    /// Forgets the state for `window` (window teardown)
    pub fn remove_window_state(&self, window: &WindowId) {
        lock(&self.states).remove(window);
        debug!(window = %window, "Removed window state");
    }

    /// Forgets every window's state (teardown and tests)
    pub fn clear_all_states(&self) {
        lock(&self.states).clear();
        debug!("Cleared all states");
    }
}

async fn deliver_broadcasts(
    mut rx: mpsc::UnboundedReceiver<AuthStateChange>,
    subscribers: Subscribers,
) {
    while let Some(change) = rx.recv().await {
        let observers: Vec<(SubscriptionId, AuthObserver)> = lock(&subscribers)
            .iter()
            .map(|s| (s.id, Arc::clone(&s.observer)))
            .collect();

        for (id, observer) in observers {
            if catch_unwind(AssertUnwindSafe(|| observer(&change))).is_err() {
                warn!(
                    subscription = id.0,
                    window = %change.window,
                    "Auth state observer panicked; skipping"
                );
            }
        }
    }
    debug!("Broadcast delivery task finished");
}
