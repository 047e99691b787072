//! Glue between the auth store, the lifecycle controller and the host
//!
//! [`IntegrationFacade`] is the surface the embedding browser talks to. It
//! wires the host into the controller, turns every auth broadcast into a
//! completion signal, and exposes the tab operations the UI needs.

use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{AuthStateChange, AuthStateStore, SubscriptionId};
use crate::error::{AuthTabsError, Result};
use crate::tabs::{selection, CompletionSignal, HostTabManager, Tab, TabId, TabLifecycleController};

/// Host-facing facade over the auth store and the tab lifecycle controller
///
/// The completion subscription lives as long as the facade and is removed
/// when it is dropped.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use authtabs::auth::{AuthAction, AuthStateStore, WindowId, WindowRegistry};
/// use authtabs::config::TabLifecycleConfig;
/// use authtabs::integration::IntegrationFacade;
/// use authtabs::tabs::fake::FakeTabManager;
/// use authtabs::tabs::TabLifecycleController;
/// use url::Url;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let host = Arc::new(FakeTabManager::new());
/// let store = Arc::new(AuthStateStore::new(Arc::new(WindowRegistry::new())));
/// let controller = TabLifecycleController::new(TabLifecycleConfig::default());
/// let facade = IntegrationFacade::new(host.clone(), controller, store.clone());
///
/// let tab = facade
///     .create_ephemeral_tab(&Url::parse("https://accounts.example.com/login")?, true)
///     .await?;
/// assert!(facade.controller().is_tracked(&tab.id));
///
/// store.dispatch(AuthAction::user_logged_in(WindowId::new()));
/// host.wait_for_removals(1).await;
/// assert!(facade.list_ephemeral_tabs().is_empty());
/// # Ok(())
/// # }
/// ```
pub struct IntegrationFacade {
    host: Arc<dyn HostTabManager>,
    controller: TabLifecycleController,
    store: Arc<AuthStateStore>,
    completion_subscription: SubscriptionId,
}

impl std::fmt::Debug for IntegrationFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationFacade")
            .field("controller", &self.controller)
            .field("store", &self.store)
            .field("completion_subscription", &self.completion_subscription)
            .finish()
    }
}

impl IntegrationFacade {
    /// Wires `host` into `controller` and subscribes the controller's
    /// completion handling to `store` broadcasts.
    pub fn new(
        host: Arc<dyn HostTabManager>,
        controller: TabLifecycleController,
        store: Arc<AuthStateStore>,
    ) -> Self {
        controller.set_host(Arc::clone(&host));

        let completion = controller.clone();
        let completion_subscription = store.subscribe(move |change: &AuthStateChange| {
            debug!(
                window = %change.window,
                action = %change.action_type,
                "Auth state changed, completing tracked tabs"
            );
            completion.handle_completion(&CompletionSignal::AuthStateChanged);
        });

        info!("Integration facade initialized");
        Self {
            host,
            controller,
            store,
            completion_subscription,
        }
    }

    /// The wired controller
    pub fn controller(&self) -> &TabLifecycleController {
        &self.controller
    }

    /// The wired auth store
    pub fn store(&self) -> &Arc<AuthStateStore> {
        &self.store
    }

    /// Opens a hidden tab for `url`, tracking it for auto-close when
    /// `auto_close` is set.
    ///
    /// # Errors
    ///
    /// Returns [`AuthTabsError::TabCreation`] if the host fails to open it.
    pub async fn create_ephemeral_tab(&self, url: &Url, auto_close: bool) -> Result<Tab> {
        let tab = self
            .host
            .open_tab(url, true)
            .await
            .map_err(|e| AuthTabsError::TabCreation(format!("{}: {}", url, e)))?;

        info!(tab_id = %tab.id, url = %url, auto_close, "Created ephemeral tab");

        if auto_close {
            self.controller
                .track_for_auto_close(&tab, CompletionSignal::AuthStateChanged, None);
        }
        Ok(tab)
    }

    /// Stops tracking `tab` and removes it. Removal failures are logged.
    ///
    /// If an auto-close of the tab is already in flight, that close performs
    /// the single removal and this call does nothing.
    pub async fn close_tab(&self, tab: &Tab) {
        if !self.controller.claim_for_close(&tab.id) {
            debug!(tab_id = %tab.id, "Auto-close in flight, leaving removal to it");
            return;
        }
        match self.host.remove_tab(&tab.id).await {
            Ok(()) => info!(tab_id = %tab.id, "Closed tab"),
            Err(e) => warn!(tab_id = %tab.id, error = %e, "Failed to close tab"),
        }
    }

    /// Ephemeral tabs currently open in the host
    pub fn list_ephemeral_tabs(&self) -> Vec<Tab> {
        selection::ephemeral_tabs(&self.host.list_tabs())
    }

    /// Tabs the user can see
    pub fn list_visible_tabs(&self) -> Vec<Tab> {
        selection::visible_tabs(&self.host.list_tabs())
    }

    /// Makes `tab` the selected tab in the host
    pub fn select_tab(&self, tab: &Tab) {
        self.host.select_tab(tab);
    }

    /// Promotes an ephemeral tab to a normal visible tab and stops tracking
    /// it, so it is never auto-closed.
    pub fn mark_tab_visible(&self, tab_id: &TabId) {
        self.host.set_ephemeral(tab_id, false);
        self.controller.cancel_auto_close(tab_id);
        info!(tab_id = %tab_id, "Marked tab as visible");
    }

    /// Stops tracking tabs the host no longer lists. Returns how many were
    /// dropped.
    pub fn cleanup_removed_tabs(&self) -> usize {
        let open: Vec<TabId> = self.host.list_tabs().into_iter().map(|t| t.id).collect();
        let vanished: Vec<TabId> = self
            .controller
            .tracked_tab_ids()
            .into_iter()
            .filter(|id| !open.contains(id))
            .collect();

        let cleaned = self.controller.cancel_auto_close_many(&vanished);
        if cleaned > 0 {
            info!(tabs = cleaned, "Cleaned up tracking for removed tabs");
        }
        cleaned
    }

    /// Forwards a content-load event to the controller
    pub fn content_loaded(&self, tab_id: &TabId, url: &Url) {
        self.controller.handle_content_loaded(tab_id, url);
    }

    /// Registers a UI observer for auth broadcasts
    pub fn subscribe_ui<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&AuthStateChange) + Send + Sync + 'static,
    {
        self.store.subscribe(observer)
    }

    /// Removes a UI observer. Returns whether it was still registered.
    pub fn unsubscribe_ui(&self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }
}

impl Drop for IntegrationFacade {
    fn drop(&mut self) {
        self.store.unsubscribe(self.completion_subscription);
        debug!("Integration facade dropped");
    }
}
