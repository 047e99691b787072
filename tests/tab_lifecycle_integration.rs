//! Integration tests for the tab lifecycle controller
//!
//! This test suite validates:
//! - The fallback, completion and cancellation scenarios end to end
//! - At-most-once removal when close paths race on a multi-threaded runtime
//! - Capacity rejection of oversized batches

mod common;

use std::time::Duration;

use authtabs::tabs::{CompletionSignal, Tab, TabId};
use common::controller_with_host;

const SIGNAL: CompletionSignal = CompletionSignal::AuthStateChanged;

fn id(s: &str) -> TabId {
    TabId::new(s)
}

#[tokio::test(start_paused = true)]
async fn test_fallback_timeout_removes_tab_once() {
    let (controller, host) = controller_with_host(vec![Tab::ephemeral("T1")]);

    controller.track_for_auto_close(&Tab::ephemeral("T1"), SIGNAL, None);
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert!(!controller.tracked_tab_ids().contains(&id("T1")));
    assert_eq!(host.removal_count(&id("T1")), 1);
}

#[tokio::test(start_paused = true)]
async fn test_completion_before_timeout_removes_once() {
    let (controller, host) = controller_with_host(vec![Tab::ephemeral("T2")]);
    controller.track_for_auto_close(&Tab::ephemeral("T2"), SIGNAL, None);

    tokio::time::sleep(Duration::from_millis(10)).await;
    controller.handle_completion(&SIGNAL);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(host.removal_count(&id("T2")), 1);
}

#[tokio::test(start_paused = true)]
async fn test_oversized_batch_tracks_nothing() {
    let (controller, _host) = controller_with_host(vec![]);
    controller.track_for_auto_close(&Tab::ephemeral("existing"), SIGNAL, None);
    let batch: Vec<Tab> = (0..6).map(|i| Tab::ephemeral(format!("b{}", i))).collect();

    assert!(controller.track_multiple(&batch, SIGNAL, None).is_empty());
    assert_eq!(controller.tracked_tab_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_signal_never_removes() {
    let (controller, host) = controller_with_host(vec![Tab::ephemeral("T3")]);
    controller.track_for_auto_close(&Tab::ephemeral("T3"), SIGNAL, None);

    controller.cancel_auto_close(&id("T3"));
    controller.handle_completion(&SIGNAL);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(host.removal_count(&id("T3")), 0);
    assert!(!controller.tracked_tab_ids().contains(&id("T3")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_close_paths_remove_exactly_once() {
    const TABS: usize = 5;
    let tabs: Vec<Tab> = (0..TABS).map(|i| Tab::ephemeral(format!("race-{}", i))).collect();
    let (controller, host) = controller_with_host(tabs.clone());
    let tracked = controller.track_multiple(&tabs, SIGNAL, Some(Duration::from_secs(30)));
    assert_eq!(tracked.len(), TABS);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let completion = controller.clone();
        handles.push(tokio::spawn(async move {
            completion.handle_completion(&CompletionSignal::AuthStateChanged);
        }));
        for tab_id in tracked.clone() {
            let timeout = controller.clone();
            handles.push(tokio::spawn(async move {
                timeout.handle_fallback_timeout(&tab_id);
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap();
    }

    tokio::time::timeout(Duration::from_secs(2), host.wait_for_removals(TABS))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(controller.tracked_tab_count(), 0);
    for tab_id in &tracked {
        assert_eq!(host.removal_count(tab_id), 1);
    }
    assert_eq!(host.removed().len(), TABS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_racing_close_never_double_removes() {
    let (controller, host) = controller_with_host(vec![Tab::ephemeral("c")]);
    controller.track_for_auto_close(&Tab::ephemeral("c"), SIGNAL, None);

    let closer = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.handle_fallback_timeout(&TabId::new("c")) })
    };
    let canceller = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.cancel_auto_close(&TabId::new("c")) })
    };
    let closed = closer.await.unwrap();
    let cancelled = canceller.await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(closed ^ cancelled);
    assert_eq!(host.removal_count(&id("c")), usize::from(closed));
    assert!(!controller.cancel_auto_close(&id("c")));
}
