//! Interleavings of toggles, page changes and held fetches

use super::common::*;
use std::sync::Arc;
use treegrid::store::{FetchApplied, InsertOutcome};
use treegrid::{ChildState, RootLoad, Toggled};

#[tokio::test]
async fn test_second_toggle_while_loading_issues_no_fetch() {
    let fetcher = org_fetcher();
    let tree = Arc::new(loaded(&fetcher).await);
    fetcher.pause_children();

    let first = tokio::spawn({
        let tree = tree.clone();
        async move { tree.toggle_expand(&id("A")).await }
    });
    wait_for_children_call(&fetcher, &id("A"), 1).await;

    assert_eq!(tree.toggle_expand(&id("A")).await.unwrap(), Toggled::AlreadyLoading);
    fetcher.release_children(1);

    // The later toggle wins: children are cached, the node stays collapsed
    assert_eq!(
        first.await.unwrap().unwrap(),
        Toggled::Fetched(FetchApplied::Cached)
    );
    assert_eq!(fetcher.children_calls(&id("A")), 1);
    let (state, expanded) = tree.read(|store| {
        let node = store.node(&id("A")).unwrap();
        (node.child_state(), node.is_expanded())
    });
    assert_eq!(state, ChildState::Loaded);
    assert!(!expanded);

    assert_eq!(tree.toggle_expand(&id("A")).await.unwrap(), Toggled::Expanded);
    assert_eq!(fetcher.children_calls(&id("A")), 1);
}

#[tokio::test]
async fn test_concurrent_toggles_of_different_nodes() {
    let fetcher = org_fetcher();
    fetcher
        .add_child("A2", "A2x", serde_json::json!({ "name": "Growth" }))
        .unwrap();
    let tree = Arc::new(loaded(&fetcher).await);
    tree.toggle_expand(&id("A")).await.unwrap();
    fetcher.pause_children();

    let a1 = tokio::spawn({
        let tree = tree.clone();
        async move { tree.toggle_expand(&id("A1")).await }
    });
    wait_for_children_call(&fetcher, &id("A1"), 1).await;
    let a2 = tokio::spawn({
        let tree = tree.clone();
        async move { tree.toggle_expand(&id("A2")).await }
    });
    wait_for_children_call(&fetcher, &id("A2"), 1).await;

    fetcher.release_children(2);
    assert_eq!(
        a1.await.unwrap().unwrap(),
        Toggled::Fetched(FetchApplied::Expanded)
    );
    assert_eq!(
        a2.await.unwrap().unwrap(),
        Toggled::Fetched(FetchApplied::Expanded)
    );

    let state = tree.read(|store| store.node(&id("A2")).map(|node| node.child_state()));
    assert_eq!(state, Some(ChildState::Loaded));
    assert_eq!(
        shape(&tree.visible_rows()),
        expected(&[("A", 0), ("A1", 1), ("A1x", 2), ("A2", 1), ("A2x", 2), ("B", 0)])
    );
}

#[tokio::test]
async fn test_page_switch_discards_inflight_children() {
    let fetcher = org_fetcher();
    let tree = Arc::new(controller(&fetcher));
    tree.load_root_page(0, 1).await.unwrap();
    fetcher.pause_children();

    let pending = tokio::spawn({
        let tree = tree.clone();
        async move { tree.toggle_expand(&id("A")).await }
    });
    wait_for_children_call(&fetcher, &id("A"), 1).await;

    assert_eq!(
        tree.load_root_page(1, 1).await.unwrap(),
        RootLoad::Loaded { roots: 1, evicted: 1 }
    );
    fetcher.release_children(1);

    assert_eq!(
        pending.await.unwrap().unwrap(),
        Toggled::Fetched(FetchApplied::Discarded)
    );
    assert_eq!(shape(&tree.visible_rows()), expected(&[("B", 0)]));
    assert!(tree.read(|store| !store.contains(&id("A1"))));
    assert!(tree.read(|store| store.check_invariants().is_empty()));
}

#[tokio::test]
async fn test_fetch_for_evicted_incarnation_is_ignored() {
    let fetcher = org_fetcher();
    let tree = Arc::new(controller(&fetcher));
    tree.load_root_page(0, 1).await.unwrap();
    fetcher.pause_children();

    let stale = tokio::spawn({
        let tree = tree.clone();
        async move { tree.toggle_expand(&id("A")).await }
    });
    wait_for_children_call(&fetcher, &id("A"), 1).await;

    tree.load_root_page(1, 1).await.unwrap();
    tree.load_root_page(0, 1).await.unwrap();
    fetcher.release_children(1);
    assert_eq!(
        stale.await.unwrap().unwrap(),
        Toggled::Fetched(FetchApplied::Discarded)
    );

    let state = tree.read(|store| store.node(&id("A")).map(|node| node.child_state()));
    assert_eq!(state, Some(ChildState::Unloaded));

    fetcher.release_children(1);
    assert_eq!(
        tree.toggle_expand(&id("A")).await.unwrap(),
        Toggled::Fetched(FetchApplied::Expanded)
    );
    assert_eq!(fetcher.children_calls(&id("A")), 2);
}

#[tokio::test]
async fn test_delete_while_children_loading() {
    let fetcher = org_fetcher();
    let tree = Arc::new(loaded(&fetcher).await);
    fetcher.pause_children();

    let pending = tokio::spawn({
        let tree = tree.clone();
        async move { tree.toggle_expand(&id("A")).await }
    });
    wait_for_children_call(&fetcher, &id("A"), 1).await;

    assert_eq!(tree.delete_node(&id("A")).await.unwrap(), 1);
    fetcher.release_children(1);

    // The response lands on a node that is gone
    assert_eq!(
        pending.await.unwrap().unwrap(),
        Toggled::Fetched(FetchApplied::Discarded)
    );
    assert_eq!(shape(&tree.visible_rows()), expected(&[("B", 0)]));
}

#[tokio::test]
async fn test_child_created_during_older_fetch_is_kept() {
    let fetcher = org_fetcher();
    let tree = Arc::new(loaded(&fetcher).await);
    fetcher.pause_children();

    let pending = tokio::spawn({
        let tree = tree.clone();
        async move { tree.toggle_expand(&id("A")).await }
    });
    wait_for_children_call(&fetcher, &id("A"), 1).await;

    // The held fetch already answered with [A1, A2]
    assert_eq!(
        tree.create_child(&id("A"), serde_json::json!({ "name": "Security" }))
            .await
            .unwrap(),
        InsertOutcome::Deferred
    );
    fetcher.release_children(1);
    assert_eq!(
        pending.await.unwrap().unwrap(),
        Toggled::Fetched(FetchApplied::Expanded)
    );

    let rows = expected(&[("A", 0), ("A1", 1), ("A2", 1), ("A-1", 1), ("B", 0)]);
    assert_eq!(shape(&tree.visible_rows()), rows);

    assert_eq!(tree.toggle_expand(&id("A")).await.unwrap(), Toggled::Collapsed);
    assert_eq!(tree.toggle_expand(&id("A")).await.unwrap(), Toggled::Expanded);
    assert_eq!(shape(&tree.visible_rows()), rows);
    assert_eq!(fetcher.children_calls(&id("A")), 1);
    assert!(tree.read(|store| store.check_invariants().is_empty()));
}

#[tokio::test]
async fn test_superseded_root_page_failure_is_not_reported() {
    let fetcher = flat_fetcher(12);
    let tree = Arc::new(controller(&fetcher));
    tree.load_root_page(0, 5).await.unwrap();
    fetcher.pause_root_pages();

    let older = tokio::spawn({
        let tree = tree.clone();
        async move { tree.load_root_page(1, 5).await }
    });
    wait_for_root_page_calls(&fetcher, 2).await;
    let newer = tokio::spawn({
        let tree = tree.clone();
        async move { tree.load_root_page(2, 5).await }
    });
    wait_for_root_page_calls(&fetcher, 3).await;

    fetcher.fail_root_pages(true);
    fetcher.release_root_pages(1);
    assert_eq!(older.await.unwrap().unwrap(), RootLoad::Superseded);

    fetcher.fail_root_pages(false);
    fetcher.release_root_pages(1);
    assert_eq!(
        newer.await.unwrap().unwrap(),
        RootLoad::Loaded { roots: 2, evicted: 5 }
    );
    assert_eq!(tree.visible_rows()[0].node_id, id("R10"));
}
