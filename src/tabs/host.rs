//! Host browser tab manager interface
//!
//! The lifecycle controller never creates or renders tabs itself. It only
//! needs to list, remove and select them, which the embedding browser
//! provides through [`HostTabManager`].

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

/// Identifier of a browser tab
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(String);

impl TabId {
    /// Wraps a host tab identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TabId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TabId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The host's view of a tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    /// Host identifier
    pub id: TabId,
    /// Currently loaded URL, if any
    pub url: Option<Url>,
    /// Background tab opened for a side effect, not meant to be seen
    pub is_ephemeral: bool,
    /// Whether the tab is shown in the tab strip
    pub is_visible: bool,
    /// Private browsing tab
    pub is_private: bool,
}

impl Tab {
    /// A visible, non-private, non-ephemeral tab
    pub fn normal(id: impl Into<TabId>) -> Self {
        Self {
            id: id.into(),
            url: None,
            is_ephemeral: false,
            is_visible: true,
            is_private: false,
        }
    }

    /// A hidden ephemeral tab
    pub fn ephemeral(id: impl Into<TabId>) -> Self {
        Self {
            id: id.into(),
            url: None,
            is_ephemeral: true,
            is_visible: false,
            is_private: false,
        }
    }

    /// Sets the URL
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Marks the tab as private
    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }

    /// Visible to the user: shown and not ephemeral
    pub fn is_user_visible(&self) -> bool {
        self.is_visible && !self.is_ephemeral
    }
}

/// Tab operations the host browser exposes to this crate
///
/// Implementations must be cheap to call from signal handlers; the
/// controller invokes them from spawned tasks, never while holding its own
/// lock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostTabManager: Send + Sync {
    /// Removes a tab from the browser
    async fn remove_tab(&self, tab_id: &TabId) -> Result<()>;

    /// Opens a tab for `url`. Ephemeral tabs are hidden from the tab strip.
    async fn open_tab(&self, url: &Url, ephemeral: bool) -> Result<Tab>;

    /// All tabs in host order
    fn list_tabs(&self) -> Vec<Tab>;

    /// Makes `tab` the selected tab
    fn select_tab(&self, tab: &Tab);

    /// The selected tab, if any
    fn current_selection(&self) -> Option<Tab>;

    /// Flips a tab between ephemeral and visible
    fn set_ephemeral(&self, tab_id: &TabId, ephemeral: bool);
}
