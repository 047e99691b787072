//! Per-window authentication state, actions, and the reducer
//!
//! Actions are the only way state changes. [`reduce`] is a pure function of
//! the previous state and the action; the store applies it under its lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of a browser window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(Uuid);

impl WindowId {
    /// Creates a fresh random window identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WindowId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for WindowId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Authentication state of a single window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    /// Whether the user is currently logged in
    pub is_logged_in: bool,

    /// Whether the initial auth state has been loaded for this window.
    /// Only ever moves from `false` to `true`.
    pub auth_state_loaded: bool,

    /// Timestamp of the action that produced this state
    pub last_updated: DateTime<Utc>,
}

impl Default for AuthState {
    /// Logged out and not yet loaded. `last_updated` is the Unix epoch so the
    /// default carries no wall-clock input.
    fn default() -> Self {
        Self {
            is_logged_in: false,
            auth_state_loaded: false,
            last_updated: DateTime::<Utc>::default(),
        }
    }
}

/// Tag identifying the kind of an [`AuthAction`]
///
/// Serializes to the camelCase names carried in broadcast payloads
/// (`"authStateLoaded"`, `"userLoggedIn"`, `"userLoggedOut"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionType {
    /// Initial auth state was determined
    AuthStateLoaded,
    /// The user logged in
    UserLoggedIn,
    /// The user logged out
    UserLoggedOut,
}

impl ActionType {
    /// The wire name of this action type
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::AuthStateLoaded => "authStateLoaded",
            ActionType::UserLoggedIn => "userLoggedIn",
            ActionType::UserLoggedOut => "userLoggedOut",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of an [`AuthAction`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthActionKind {
    /// Initial auth state was determined to be `is_logged_in`
    AuthStateLoaded {
        /// Logged-in status reported by the identity provider
        is_logged_in: bool,
    },
    /// The user completed a login
    UserLoggedIn,
    /// The user completed a logout
    UserLoggedOut,
}

impl AuthActionKind {
    /// Builds the kind for a tag. `is_logged_in` is only read for
    /// [`ActionType::AuthStateLoaded`].
    pub fn from_type(action_type: ActionType, is_logged_in: bool) -> Self {
        match action_type {
            ActionType::AuthStateLoaded => AuthActionKind::AuthStateLoaded { is_logged_in },
            ActionType::UserLoggedIn => AuthActionKind::UserLoggedIn,
            ActionType::UserLoggedOut => AuthActionKind::UserLoggedOut,
        }
    }

    /// The tag of this kind
    pub fn action_type(&self) -> ActionType {
        match self {
            AuthActionKind::AuthStateLoaded { .. } => ActionType::AuthStateLoaded,
            AuthActionKind::UserLoggedIn => ActionType::UserLoggedIn,
            AuthActionKind::UserLoggedOut => ActionType::UserLoggedOut,
        }
    }
}

/// A state transition request for one window
///
/// # Examples
///
/// ```
/// use authtabs::auth::{AuthAction, ActionType, WindowId};
///
/// let window = WindowId::new();
/// let action = AuthAction::auth_state_loaded(window, true);
/// assert_eq!(action.action_type(), ActionType::AuthStateLoaded);
/// assert_eq!(action.window, window);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthAction {
    /// Window whose state the action applies to
    pub window: WindowId,
    /// What happened
    pub kind: AuthActionKind,
    /// When it happened
    pub timestamp: DateTime<Utc>,
}

impl AuthAction {
    /// Creates an action stamped with the current time
    pub fn new(window: WindowId, kind: AuthActionKind) -> Self {
        Self {
            window,
            kind,
            timestamp: Utc::now(),
        }
    }

    /// Initial auth state load for `window`
    pub fn auth_state_loaded(window: WindowId, is_logged_in: bool) -> Self {
        Self::new(window, AuthActionKind::AuthStateLoaded { is_logged_in })
    }

    /// Login completed for `window`
    pub fn user_logged_in(window: WindowId) -> Self {
        Self::new(window, AuthActionKind::UserLoggedIn)
    }

    /// Logout completed for `window`
    pub fn user_logged_out(window: WindowId) -> Self {
        Self::new(window, AuthActionKind::UserLoggedOut)
    }

    /// Replaces the timestamp
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The tag of this action
    pub fn action_type(&self) -> ActionType {
        self.kind.action_type()
    }
}

/// A committed state change, as delivered to store subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStateChange {
    /// Window whose state changed
    pub window: WindowId,
    /// State after the action was applied
    pub state: AuthState,
    /// Kind of action that produced the change
    pub action_type: ActionType,
}

/// Computes the next state for a window.
///
/// When `current` is `None` the reducer starts from [`AuthState::default`].
/// Only `AuthStateLoaded` can set `auth_state_loaded`; login and logout carry
/// the existing flag forward.
///
/// # Examples
///
/// ```
/// use authtabs::auth::{reduce, AuthAction, WindowId};
///
/// let window = WindowId::new();
/// let loaded = reduce(None, &AuthAction::auth_state_loaded(window, true));
/// let state = reduce(Some(&loaded), &AuthAction::user_logged_out(window));
///
/// assert!(!state.is_logged_in);
/// assert!(state.auth_state_loaded);
/// ```
pub fn reduce(current: Option<&AuthState>, action: &AuthAction) -> AuthState {
    let existing = current.copied().unwrap_or_default();

    match action.kind {
        AuthActionKind::AuthStateLoaded { is_logged_in } => AuthState {
            is_logged_in,
            auth_state_loaded: true,
            last_updated: action.timestamp,
        },
        AuthActionKind::UserLoggedIn => AuthState {
            is_logged_in: true,
            auth_state_loaded: existing.auth_state_loaded,
            last_updated: action.timestamp,
        },
        AuthActionKind::UserLoggedOut => AuthState {
            is_logged_in: false,
            auth_state_loaded: existing.auth_state_loaded,
            last_updated: action.timestamp,
        },
    }
}
