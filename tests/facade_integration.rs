//! Integration tests for the integration facade
//!
//! This test suite validates the full flow: an auth flow opens an ephemeral
//! tab, the identity result is dispatched into the store, and the broadcast
//! both reaches UI observers and closes the tab.

mod common;

use std::sync::Arc;
use std::time::Duration;

use authtabs::auth::{AuthAction, WindowId};
use authtabs::config::Config;
use authtabs::tabs::{HostTabManager, Tab, TabId, TabLifecycleController};
use authtabs::IntegrationFacade;
use common::{fast_config, new_store, next_change, temp_config_file};
use serial_test::serial;
use tokio::sync::mpsc;
use url::Url;

use authtabs::tabs::fake::FakeTabManager;

fn login_url() -> Url {
    Url::parse("https://accounts.example.com/signin").unwrap()
}

#[tokio::test]
async fn test_login_flow_closes_tab_and_notifies_ui() {
    let host = Arc::new(FakeTabManager::with_tabs(vec![Tab::normal("home")]));
    let (store, _registry) = new_store();
    let facade = IntegrationFacade::new(
        host.clone(),
        TabLifecycleController::new(fast_config()),
        Arc::clone(&store),
    );
    let (tx, mut ui) = mpsc::unbounded_channel();
    facade.subscribe_ui(move |change| {
        let _ = tx.send(*change);
    });
    let window = WindowId::new();
    facade.store().registry().register(window);

    let tab = facade.create_ephemeral_tab(&login_url(), true).await.unwrap();
    host.set_selected(Some(tab.id.clone()));
    store.dispatch(AuthAction::user_logged_in(window));

    let change = next_change(&mut ui).await;
    assert_eq!(change.window, window);
    assert!(change.state.is_logged_in);

    tokio::time::timeout(Duration::from_secs(2), host.wait_for_removals(1))
        .await
        .unwrap();
    assert_eq!(host.removed(), vec![tab.id]);
    assert!(facade.list_ephemeral_tabs().is_empty());
    assert_eq!(host.current_selection().unwrap().id, TabId::new("home"));
}

#[tokio::test]
async fn test_content_loaded_closes_only_that_tab() {
    let host = Arc::new(FakeTabManager::new());
    let (store, _registry) = new_store();
    let facade =
        IntegrationFacade::new(host.clone(), TabLifecycleController::new(fast_config()), store);

    let first = facade.create_ephemeral_tab(&login_url(), true).await.unwrap();
    let second = facade.create_ephemeral_tab(&login_url(), true).await.unwrap();
    facade.content_loaded(&first.id, &login_url());

    tokio::time::timeout(Duration::from_secs(2), host.wait_for_removals(1))
        .await
        .unwrap();
    assert_eq!(host.removed(), vec![first.id]);
    assert!(facade.controller().is_tracked(&second.id));
}

#[tokio::test]
async fn test_dropped_facade_stops_closing_on_broadcast() {
    let host = Arc::new(FakeTabManager::new());
    let (store, _registry) = new_store();
    let controller = TabLifecycleController::new(Default::default());
    let facade = IntegrationFacade::new(host.clone(), controller.clone(), Arc::clone(&store));
    let tab = facade.create_ephemeral_tab(&login_url(), true).await.unwrap();

    drop(facade);
    store.dispatch(AuthAction::user_logged_in(WindowId::new()));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(controller.is_tracked(&tab.id));
    assert!(host.removed().is_empty());
    controller.cleanup_all();
}

#[tokio::test]
async fn test_tab_removed_outside_controller_is_cleaned_up() {
    let host = Arc::new(FakeTabManager::new());
    let (store, _registry) = new_store();
    let facade = IntegrationFacade::new(
        host.clone(),
        TabLifecycleController::new(Default::default()),
        store,
    );
    let tab = facade.create_ephemeral_tab(&login_url(), true).await.unwrap();

    host.remove_tab(&tab.id).await.unwrap();

    assert_eq!(facade.cleanup_removed_tabs(), 1);
    assert_eq!(facade.controller().tracked_tab_count(), 0);
}

#[test]
#[serial]
fn test_config_file_drives_controller_timings() {
    let (_dir, path) = temp_config_file("tabs:\n  fallback_timeout_ms: 1200\n  debounce_ms: 40\n");

    let config = Config::load(&path).unwrap();
    config.validate().unwrap();
    let controller = TabLifecycleController::new(config.tabs.clone());

    assert_eq!(
        controller.config().fallback_timeout(),
        Duration::from_millis(1200)
    );
    assert_eq!(controller.config().debounce(), Duration::from_millis(40));
}
