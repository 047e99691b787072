//! Tab filtering helpers and the replacement-selection heuristic
//!
//! "Visible" here means [`Tab::is_user_visible`]: shown in the tab strip and
//! not ephemeral.

use crate::tabs::host::Tab;

/// Tabs the user can see
pub fn visible_tabs(tabs: &[Tab]) -> Vec<Tab> {
    tabs.iter().filter(|t| t.is_user_visible()).cloned().collect()
}

/// Ephemeral tabs
pub fn ephemeral_tabs(tabs: &[Tab]) -> Vec<Tab> {
    tabs.iter().filter(|t| t.is_ephemeral).cloned().collect()
}

/// Visible non-private tabs
pub fn visible_normal_tabs(tabs: &[Tab]) -> Vec<Tab> {
    tabs.iter()
        .filter(|t| t.is_user_visible() && !t.is_private)
        .cloned()
        .collect()
}

/// Picks the tab to select after an ephemeral tab was removed and the host
/// was left without a selection.
///
/// Prefers the last visible normal tab, then the last visible tab of any
/// kind. Returns `None` when nothing is visible.
///
/// # Examples
///
/// ```
/// use authtabs::tabs::{selection::replacement_selection, Tab};
///
/// let tabs = vec![
///     Tab::normal("a"),
///     Tab::normal("b").private(),
///     Tab::ephemeral("c"),
/// ];
/// assert_eq!(replacement_selection(&tabs).unwrap().id.as_str(), "a");
/// ```
pub fn replacement_selection(tabs: &[Tab]) -> Option<Tab> {
    visible_normal_tabs(tabs)
        .pop()
        .or_else(|| visible_tabs(tabs).pop())
}

/// One-line visibility breakdown for log output
pub fn visibility_summary(tabs: &[Tab]) -> String {
    let visible = tabs.iter().filter(|t| t.is_user_visible()).count();
    let ephemeral = tabs.iter().filter(|t| t.is_ephemeral).count();
    format!(
        "Tabs: {} total, {} visible, {} ephemeral",
        tabs.len(),
        visible,
        ephemeral
    )
}
