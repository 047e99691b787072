//! Window-scoped authentication state
//!
//! # Module Layout
//!
//! - [`state`]    -- identifiers, state, actions and the pure reducer
//! - [`registry`] -- windows that want auth broadcasts
//! - [`store`]    -- serialized state store with asynchronous broadcast

pub mod registry;
pub mod state;
pub mod store;

pub use registry::WindowRegistry;
pub use state::{
    reduce, ActionType, AuthAction, AuthActionKind, AuthState, AuthStateChange, WindowId,
};
pub use store::{AuthObserver, AuthStateStore, SubscriptionId};
