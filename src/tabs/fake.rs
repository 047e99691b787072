//! In-process fake host for unit and integration tests
//!
//! [`FakeTabManager`] implements [`HostTabManager`] over an in-memory tab
//! list. It records every removal and selection so tests can assert on the
//! exact calls the controller made, and it can be told to fail removals.
//!
//! # Example
//!
//! ```
//! use authtabs::tabs::fake::FakeTabManager;
//! use authtabs::tabs::{HostTabManager, Tab, TabId};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let host = FakeTabManager::with_tabs(vec![Tab::normal("home"), Tab::ephemeral("login")]);
//!
//! host.remove_tab(&TabId::new("login")).await.unwrap();
//!
//! assert_eq!(host.removed(), vec![TabId::new("login")]);
//! assert_eq!(host.list_tabs().len(), 1);
//! # }
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;
use url::Url;

use crate::error::{AuthTabsError, Result};
use crate::tabs::host::{HostTabManager, Tab, TabId};

#[derive(Debug, Default)]
struct FakeState {
    tabs: Vec<Tab>,
    selected: Option<TabId>,
    removed: Vec<TabId>,
    selections: Vec<TabId>,
}

/// In-memory [`HostTabManager`]
#[derive(Debug, Default)]
pub struct FakeTabManager {
    state: Mutex<FakeState>,
    next_id: AtomicU64,
    fail_removals: AtomicBool,
    removal_notify: Notify,
}

impl FakeTabManager {
    /// Empty host with nothing selected
    pub fn new() -> Self {
        Self::default()
    }

    /// Host pre-populated with `tabs`, nothing selected
    pub fn with_tabs(tabs: Vec<Tab>) -> Self {
        let host = Self::new();
        host.state().tabs = tabs;
        host
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a tab
    pub fn add_tab(&self, tab: Tab) {
        self.state().tabs.push(tab);
    }

    /// Sets the selection without recording it as a controller selection
    pub fn set_selected(&self, tab_id: Option<TabId>) {
        self.state().selected = tab_id;
    }

    /// Makes every later `remove_tab` call fail
    pub fn fail_removals(&self, fail: bool) {
        self.fail_removals.store(fail, Ordering::SeqCst);
    }

    /// Tab ids passed to successful `remove_tab` calls, in call order
    pub fn removed(&self) -> Vec<TabId> {
        self.state().removed.clone()
    }

    /// How many times `tab_id` was removed
    pub fn removal_count(&self, tab_id: &TabId) -> usize {
        self.state().removed.iter().filter(|id| *id == tab_id).count()
    }

    /// Tab ids passed to `select_tab`, in call order
    pub fn selections(&self) -> Vec<TabId> {
        self.state().selections.clone()
    }

    /// Looks up a tab by id
    pub fn tab(&self, tab_id: &TabId) -> Option<Tab> {
        self.state().tabs.iter().find(|t| &t.id == tab_id).cloned()
    }

    /// Waits until at least `count` removals have been recorded
    pub async fn wait_for_removals(&self, count: usize) {
        loop {
            let notified = self.removal_notify.notified();
            if self.state().removed.len() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl HostTabManager for FakeTabManager {
    async fn remove_tab(&self, tab_id: &TabId) -> Result<()> {
        if self.fail_removals.load(Ordering::SeqCst) {
            return Err(AuthTabsError::TabRemoval(tab_id.to_string()).into());
        }

        {
            let mut state = self.state();
            state.tabs.retain(|t| &t.id != tab_id);
            if state.selected.as_ref() == Some(tab_id) {
                state.selected = None;
            }
            state.removed.push(tab_id.clone());
        }
        self.removal_notify.notify_waiters();
        Ok(())
    }

    async fn open_tab(&self, url: &Url, ephemeral: bool) -> Result<Tab> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        let base = if ephemeral {
            Tab::ephemeral(format!("fake-tab-{}", n))
        } else {
            Tab::normal(format!("fake-tab-{}", n))
        };
        let tab = base.with_url(url.clone());
        self.state().tabs.push(tab.clone());
        Ok(tab)
    }

    fn list_tabs(&self) -> Vec<Tab> {
        self.state().tabs.clone()
    }

    fn select_tab(&self, tab: &Tab) {
        let mut state = self.state();
        state.selected = Some(tab.id.clone());
        state.selections.push(tab.id.clone());
    }

    fn current_selection(&self) -> Option<Tab> {
        let state = self.state();
        let selected = state.selected.as_ref()?;
        state.tabs.iter().find(|t| &t.id == selected).cloned()
    }

    fn set_ephemeral(&self, tab_id: &TabId, ephemeral: bool) {
        if let Some(tab) = self.state().tabs.iter_mut().find(|t| &t.id == tab_id) {
            tab.is_ephemeral = ephemeral;
            tab.is_visible = !ephemeral;
        }
    }
}
