//! Auto-close lifecycle for ephemeral tabs
//!
//! [`TabLifecycleController`] tracks ephemeral tabs opened for an
//! authentication flow and closes each one exactly once, on whichever of
//! these fires first:
//!
//! 1. a completion signal ([`TabLifecycleController::handle_completion`]),
//!    which closes every tab tracked for that signal;
//! 2. a content-load event for the tab, acted on after a debounce delay
//!    ([`TabLifecycleController::handle_content_loaded`]);
//! 3. the tab's fallback timer.
//!
//! # Race resolution
//!
//! The tracked-tab map is the single source of truth. Every close path
//! removes the entry and cancels its timers while holding the map lock, and
//! only then hands the host removal off to a spawned task. Whichever path
//! removes the entry first performs the close; every other path finds no
//! entry and does nothing.
//!
//! Timers carry the generation of the entry they were armed for, so a timer
//! left over from an earlier tracking of the same tab id can never close a
//! newer entry. A claimed tab stays in a closing set until its host removal
//! finishes, so an explicit close ([`TabLifecycleController::claim_for_close`])
//! cannot race it.
//!
//! # Runtime
//!
//! Timers and host calls run on a Tokio runtime: the current one, or else the
//! one that was current when the controller was created. With neither,
//! operations log [`AuthTabsError::NotInitialized`] and leave the map as it
//! was.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::TabLifecycleConfig;
use crate::error::{AuthTabsError, Result};
use crate::tabs::host::{HostTabManager, Tab, TabId};
use crate::tabs::selection;

/// Signal whose arrival means "the flow these tabs were opened for is done"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CompletionSignal {
    /// An authentication state broadcast from the auth store
    AuthStateChanged,
    /// Any other host-defined completion event
    Named(String),
}

impl Default for CompletionSignal {
    fn default() -> Self {
        CompletionSignal::AuthStateChanged
    }
}

impl fmt::Display for CompletionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionSignal::AuthStateChanged => f.write_str("auth_state_changed"),
            CompletionSignal::Named(name) => f.write_str(name),
        }
    }
}

/// Which path closed a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Completion signal
    Completion,
    /// Debounced content-load heuristic
    ContentLoaded,
    /// Fallback timer
    FallbackTimeout,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CloseReason::Completion => "completion",
            CloseReason::ContentLoaded => "content_loaded",
            CloseReason::FallbackTimeout => "fallback_timeout",
        };
        f.write_str(s)
    }
}

/// Tracking entry. Its presence in the map means the tab is still open for
/// auto-close; `cancel` is the fallback timer handle and the parent of any
/// debounce timers.
#[derive(Debug)]
struct TrackedTab {
    tab_id: TabId,
    url: Option<Url>,
    signal: CompletionSignal,
    created_at: DateTime<Utc>,
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
struct TrackerState {
    tracked: HashMap<TabId, TrackedTab>,
    /// Claimed tabs whose host removal has not finished yet
    closing: HashSet<TabId>,
}

struct Inner {
    config: TabLifecycleConfig,
    state: Mutex<TrackerState>,
    host: RwLock<Option<Arc<dyn HostTabManager>>>,
    runtime: Option<Handle>,
    next_generation: AtomicU64,
}

/// Tracks ephemeral tabs and closes each exactly once
///
/// Cloning is cheap and every clone shares the same tracked-tab map.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use authtabs::config::TabLifecycleConfig;
/// use authtabs::tabs::fake::FakeTabManager;
/// use authtabs::tabs::{CompletionSignal, Tab, TabLifecycleController};
///
/// # #[tokio::main]
/// # async fn main() {
/// let host = Arc::new(FakeTabManager::with_tabs(vec![Tab::ephemeral("login")]));
/// let controller = TabLifecycleController::new(TabLifecycleConfig::default());
/// controller.set_host(host.clone());
///
/// controller.track_for_auto_close(&Tab::ephemeral("login"), CompletionSignal::AuthStateChanged, None);
/// assert_eq!(controller.tracked_tab_count(), 1);
///
/// controller.handle_completion(&CompletionSignal::AuthStateChanged);
/// host.wait_for_removals(1).await;
/// assert_eq!(controller.tracked_tab_count(), 0);
/// # }
/// ```
#[derive(Clone)]
pub struct TabLifecycleController {
    inner: Arc<Inner>,
}

impl fmt::Debug for TabLifecycleController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabLifecycleController")
            .field("config", &self.inner.config)
            .field("tracked", &self.tracked_tab_ids())
            .field("host_wired", &self.has_host())
            .finish()
    }
}

impl TabLifecycleController {
    /// Creates a controller with no host wired.
    ///
    /// If called inside a Tokio runtime, that runtime is remembered and used
    /// whenever a later call is made from outside any runtime.
    pub fn new(config: TabLifecycleConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(TrackerState::default()),
                host: RwLock::new(None),
                runtime: Handle::try_current().ok(),
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    /// The active configuration
    pub fn config(&self) -> &TabLifecycleConfig {
        &self.inner.config
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn runtime(&self, operation: &'static str) -> Option<Handle> {
        let runtime = Handle::try_current()
            .ok()
            .or_else(|| self.inner.runtime.clone());
        if runtime.is_none() {
            let error = AuthTabsError::NotInitialized("tokio runtime".to_string());
            warn!(operation, error = %error, "Skipping tab lifecycle operation");
        }
        runtime
    }

    fn host(&self) -> Option<Arc<dyn HostTabManager>> {
        self.inner
            .host
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wires the host tab manager used for removals and selection
    pub fn set_host(&self, host: Arc<dyn HostTabManager>) {
        *self
            .inner
            .host
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(host);
        debug!("Host tab manager wired");
    }

    /// Unwires the host. Later close sequences log and skip the removal.
    pub fn clear_host(&self) {
        *self
            .inner
            .host
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        debug!("Host tab manager cleared");
    }

    /// Whether a host is wired
    pub fn has_host(&self) -> bool {
        self.host().is_some()
    }

    /// Starts tracking `tab` for auto-close.
    ///
    /// The tab closes when `signal` fires, when a debounced content-load
    /// event arrives for it, or when `timeout` (default: the configured
    /// fallback timeout) elapses. Tracking a tab that is already tracked
    /// replaces the old entry and restarts its timer.
    ///
    /// # Returns
    ///
    /// `false` without tracking anything if the tab is not ephemeral or no
    /// runtime is available.
    pub fn track_for_auto_close(
        &self,
        tab: &Tab,
        signal: CompletionSignal,
        timeout: Option<Duration>,
    ) -> bool {
        if !tab.is_ephemeral {
            warn!(tab_id = %tab.id, "Attempted to set up auto-close for a visible tab");
            return false;
        }
        let Some(runtime) = self.runtime("track_for_auto_close") else {
            return false;
        };

        let timeout = timeout.unwrap_or_else(|| self.inner.config.fallback_timeout());
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();

        let replaced = {
            let mut state = self.state();
            let previous = state.tracked.insert(
                tab.id.clone(),
                TrackedTab {
                    tab_id: tab.id.clone(),
                    url: tab.url.clone(),
                    signal: signal.clone(),
                    created_at: Utc::now(),
                    generation,
                    cancel: cancel.clone(),
                },
            );
            if let Some(previous) = &previous {
                previous.cancel.cancel();
            }
            previous.is_some()
        };

        self.spawn_fallback_timer(&runtime, tab.id.clone(), generation, cancel, timeout);

        info!(
            tab_id = %tab.id,
            signal = %signal,
            timeout_ms = timeout.as_millis() as u64,
            replaced,
            "Auto-close set up for tab"
        );
        true
    }

    /// Tracks a batch of tabs, or none of them.
    ///
    /// # Errors
    ///
    /// Returns [`AuthTabsError::CapacityExceeded`] without tracking anything
    /// if the batch is larger than `max_concurrent_tabs`.
    pub fn try_track_multiple(
        &self,
        tabs: &[Tab],
        signal: CompletionSignal,
        timeout: Option<Duration>,
    ) -> Result<Vec<TabId>> {
        let limit = self.inner.config.max_concurrent_tabs;
        if tabs.len() > limit {
            return Err(AuthTabsError::CapacityExceeded {
                limit,
                requested: tabs.len(),
            }
            .into());
        }

        Ok(tabs
            .iter()
            .filter(|tab| self.track_for_auto_close(tab, signal.clone(), timeout))
            .map(|tab| tab.id.clone())
            .collect())
    }

    /// Tracks a batch of tabs, returning the ids that were tracked.
    ///
    /// An oversized batch is rejected as a whole: the rejection is logged
    /// and the result is empty.
    pub fn track_multiple(
        &self,
        tabs: &[Tab],
        signal: CompletionSignal,
        timeout: Option<Duration>,
    ) -> Vec<TabId> {
        match self.try_track_multiple(tabs, signal, timeout) {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Rejected batch auto-close request");
                Vec::new()
            }
        }
    }

    /// Stops tracking a tab without closing it.
    ///
    /// Returns `false` if the tab was not tracked, including when a close
    /// sequence already claimed it.
    pub fn cancel_auto_close(&self, tab_id: &TabId) -> bool {
        let entry = self.state().tracked.remove(tab_id);
        match entry {
            Some(entry) => {
                entry.cancel.cancel();
                info!(tab_id = %tab_id, "Cancelled auto-close for tab");
                true
            }
            None => {
                debug!(tab_id = %tab_id, "Cancel requested for untracked tab");
                false
            }
        }
    }

    /// Takes `tab_id` out of auto-close tracking so the caller can close it
    /// itself.
    ///
    /// Returns `false` while an auto-close of the tab is in flight; the
    /// caller must then leave the removal to it. Untracked tabs are free to
    /// close.
    pub fn claim_for_close(&self, tab_id: &TabId) -> bool {
        let mut state = self.state();
        if state.closing.contains(tab_id) {
            debug!(tab_id = %tab_id, "Tab is already being closed");
            return false;
        }
        if let Some(entry) = state.tracked.remove(tab_id) {
            entry.cancel.cancel();
            debug!(tab_id = %tab_id, "Tab claimed for explicit close");
        }
        true
    }

    /// Cancels tracking for each id; returns how many were tracked
    pub fn cancel_auto_close_many(&self, tab_ids: &[TabId]) -> usize {
        tab_ids
            .iter()
            .filter(|tab_id| self.cancel_auto_close(tab_id))
            .count()
    }

    /// Closes every tab tracked for `signal`. Returns how many were claimed.
    pub fn handle_completion(&self, signal: &CompletionSignal) -> usize {
        let Some(runtime) = self.runtime("handle_completion") else {
            return 0;
        };
        let claimed: Vec<TrackedTab> = {
            let mut state = self.state();
            let ids: Vec<TabId> = state
                .tracked
                .values()
                .filter(|entry| &entry.signal == signal)
                .map(|entry| entry.tab_id.clone())
                .collect();
            ids.iter()
                .filter_map(|id| state.claim(id))
                .collect()
        };

        let count = claimed.len();
        if count > 0 {
            info!(signal = %signal, tabs = count, "Completion signal received");
            self.spawn_close(&runtime, claimed, CloseReason::Completion);
        }
        count
    }

    /// Content-load heuristic for a single tab.
    ///
    /// If the tab is tracked, a debounce timer is armed; when it elapses and
    /// the same entry is still tracked, the tab is closed. Returns whether a
    /// debounce timer was armed.
    pub fn handle_content_loaded(&self, tab_id: &TabId, url: &Url) -> bool {
        let Some(runtime) = self.runtime("handle_content_loaded") else {
            return false;
        };
        let armed = {
            let state = self.state();
            state.tracked.get(tab_id).map(|entry| {
                debug!(
                    tab_id = %tab_id,
                    url = %url,
                    opened_url = ?entry.url.as_ref().map(Url::as_str),
                    "Content loaded in tracked tab"
                );
                (entry.generation, entry.cancel.child_token())
            })
        };

        let Some((generation, cancel)) = armed else {
            return false;
        };

        let weak = Arc::downgrade(&self.inner);
        let debounce = self.inner.config.debounce();
        let tab_id = tab_id.clone();
        runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(debounce) => {
                    if let Some(controller) = Self::upgrade(&weak) {
                        controller.close_if_current(&tab_id, Some(generation), CloseReason::ContentLoaded);
                    }
                }
            }
        });
        true
    }

    /// Closes a single tab if it is still tracked.
    ///
    /// Returns `false` when another path already closed or cancelled it, or
    /// when no runtime is available (the tab then stays tracked).
    pub fn handle_fallback_timeout(&self, tab_id: &TabId) -> bool {
        self.close_if_current(tab_id, None, CloseReason::FallbackTimeout)
    }

    /// Number of tracked tabs
    pub fn tracked_tab_count(&self) -> usize {
        self.state().tracked.len()
    }

    /// Tracked tab ids, sorted
    pub fn tracked_tab_ids(&self) -> Vec<TabId> {
        let mut ids: Vec<TabId> = self.state().tracked.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Whether `tab_id` is tracked
    pub fn is_tracked(&self, tab_id: &TabId) -> bool {
        self.state().tracked.contains_key(tab_id)
    }

    /// Cancels every timer and forgets every tab (teardown)
    pub fn cleanup_all(&self) {
        let drained: Vec<TrackedTab> = self
            .state()
            .tracked
            .drain()
            .map(|(_, entry)| entry)
            .collect();
        for entry in &drained {
            entry.cancel.cancel();
        }
        info!(tabs = drained.len(), "All auto-close observers and timers cleaned up");
    }

    fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn spawn_fallback_timer(
        &self,
        runtime: &Handle,
        tab_id: TabId,
        generation: u64,
        cancel: CancellationToken,
        timeout: Duration,
    ) {
        let weak = Arc::downgrade(&self.inner);
        runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    if let Some(controller) = Self::upgrade(&weak) {
                        info!(tab_id = %tab_id, "Fallback timeout reached for tab");
                        controller.close_if_current(&tab_id, Some(generation), CloseReason::FallbackTimeout);
                    }
                }
            }
        });
    }

    /// Claims the entry for `tab_id` (optionally only if it is still the
    /// given generation) and starts its close sequence.
    fn close_if_current(
        &self,
        tab_id: &TabId,
        generation: Option<u64>,
        reason: CloseReason,
    ) -> bool {
        let Some(runtime) = self.runtime("close") else {
            return false;
        };
        let claimed = {
            let mut state = self.state();
            let current = state
                .tracked
                .get(tab_id)
                .map_or(false, |entry| generation.map_or(true, |g| entry.generation == g));
            if current {
                state.claim(tab_id)
            } else {
                None
            }
        };

        match claimed {
            Some(entry) => {
                self.spawn_close(&runtime, vec![entry], reason);
                true
            }
            None => {
                debug!(tab_id = %tab_id, reason = %reason, "Tab no longer tracked; nothing to close");
                false
            }
        }
    }

    /// Hands claimed entries to a task that removes them from the host.
    /// Entries are already out of the map, marked closing, and their timers
    /// cancelled.
    fn spawn_close(&self, runtime: &Handle, entries: Vec<TrackedTab>, reason: CloseReason) {
        let Some(host) = self.host() else {
            let error = AuthTabsError::NotInitialized("host tab manager".to_string());
            let mut state = self.state();
            for entry in &entries {
                state.closing.remove(&entry.tab_id);
                warn!(tab_id = %entry.tab_id, reason = %reason, error = %error, "Cannot close tab");
            }
            return;
        };

        let controller = self.clone();
        runtime.spawn(async move {
            for entry in entries {
                let tab_id = entry.tab_id.clone();
                close_tab(host.as_ref(), entry, reason).await;
                controller.state().closing.remove(&tab_id);
            }
        });
    }
}

impl TrackerState {
    /// Moves a tracked entry into the closing set and cancels its timers
    fn claim(&mut self, tab_id: &TabId) -> Option<TrackedTab> {
        let entry = self.tracked.remove(tab_id)?;
        entry.cancel.cancel();
        self.closing.insert(tab_id.clone());
        Some(entry)
    }
}

async fn close_tab(host: &dyn HostTabManager, entry: TrackedTab, reason: CloseReason) {
    let tab_id = &entry.tab_id;
    let tabs = host.list_tabs();

    let Some(tab) = tabs.iter().find(|t| &t.id == tab_id) else {
        info!(tab_id = %tab_id, "Tab not found for closing");
        return;
    };
    if !tab.is_ephemeral {
        info!(tab_id = %tab_id, "Tab is no longer ephemeral, skipping close");
        return;
    }

    if let Err(e) = host.remove_tab(tab_id).await {
        warn!(tab_id = %tab_id, reason = %reason, error = %e, "Failed to close tab");
        return;
    }

    let tracked_ms = (Utc::now() - entry.created_at).num_milliseconds();
    info!(tab_id = %tab_id, reason = %reason, tracked_ms, "Tab closed");

    if host.current_selection().is_none() {
        let remaining = host.list_tabs();
        match selection::replacement_selection(&remaining) {
            Some(next) => {
                host.select_tab(&next);
                info!(tab_id = %next.id, "Selected replacement tab");
            }
            None => debug!(
                summary = %selection::visibility_summary(&remaining),
                "No visible tab to select"
            ),
        }
    }
}
