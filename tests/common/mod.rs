use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use authtabs::auth::{AuthStateChange, AuthStateStore, WindowRegistry};
use authtabs::config::TabLifecycleConfig;
use authtabs::tabs::fake::FakeTabManager;
use authtabs::tabs::{Tab, TabLifecycleController};
use tempfile::TempDir;
use tokio::sync::mpsc;

#[allow(dead_code)]
pub fn fast_config() -> TabLifecycleConfig {
    TabLifecycleConfig::with_timings(Duration::from_millis(50), Duration::from_millis(5))
}

#[allow(dead_code)]
pub fn controller_with_host(tabs: Vec<Tab>) -> (TabLifecycleController, Arc<FakeTabManager>) {
    let host = Arc::new(FakeTabManager::with_tabs(tabs));
    let controller = TabLifecycleController::new(fast_config());
    controller.set_host(host.clone());
    (controller, host)
}

#[allow(dead_code)]
pub fn new_store() -> (Arc<AuthStateStore>, Arc<WindowRegistry>) {
    let registry = Arc::new(WindowRegistry::new());
    let store = Arc::new(AuthStateStore::new(Arc::clone(&registry)));
    (store, registry)
}

/// Subscribes a channel-backed observer and returns its receiving end
#[allow(dead_code)]
pub fn record_changes(store: &AuthStateStore) -> mpsc::UnboundedReceiver<AuthStateChange> {
    let (tx, rx) = mpsc::unbounded_channel();
    store.subscribe(move |change: &AuthStateChange| {
        let _ = tx.send(*change);
    });
    rx
}

#[allow(dead_code)]
pub async fn next_change(rx: &mut mpsc::UnboundedReceiver<AuthStateChange>) -> AuthStateChange {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for broadcast")
        .expect("broadcast channel closed")
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("authtabs.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
