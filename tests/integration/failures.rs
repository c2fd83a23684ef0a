//! Failure paths of the fetcher contract and the state they leave behind

use super::common::*;
use serde_json::json;
use treegrid::fetcher::FetchError;
use treegrid::store::PageStatus;
use treegrid::table::RowCommand;
use treegrid::{Dispatched, TreeError};

#[tokio::test]
async fn test_root_page_failure_keeps_current_page() {
    let fetcher = flat_fetcher(12);
    let tree = controller(&fetcher);
    tree.load_root_page(0, 5).await.unwrap();
    let before = tree.visible_rows();

    fetcher.fail_root_pages(true);
    let err = tree.load_root_page(1, 5).await.unwrap_err();
    assert!(matches!(
        err,
        TreeError::FetchRootPageFailed {
            page: 1,
            source: FetchError::Status { code: 503, .. }
        }
    ));

    assert_eq!(tree.visible_rows(), before);
    let (page, status) = tree.read(|store| (store.window().page, store.window().status));
    assert_eq!(page, 0);
    assert_eq!(status, PageStatus::Failed);

    fetcher.fail_root_pages(false);
    tree.load_root_page(1, 5).await.unwrap();
    assert_eq!(tree.read(|store| store.window().status), PageStatus::Loaded);
    assert_eq!(tree.visible_rows()[0].node_id, id("R5"));
}

#[tokio::test]
async fn test_create_failure_leaves_tree_untouched() {
    let fetcher = org_fetcher();
    let tree = loaded(&fetcher).await;
    tree.toggle_expand(&id("A")).await.unwrap();
    let before = tree.snapshot();

    fetcher.fail_create(true);
    let err = tree
        .create_child(&id("A"), json!({ "name": "Research" }))
        .await
        .unwrap_err();
    assert!(matches!(err, TreeError::CreateChildFailed { ref parent_id, .. } if *parent_id == id("A")));
    assert_eq!(tree.snapshot(), before);
}

#[tokio::test]
async fn test_delete_failure_leaves_subtree_untouched() {
    let fetcher = org_fetcher();
    let tree = loaded(&fetcher).await;
    tree.toggle_expand(&id("A")).await.unwrap();
    let before = tree.snapshot();

    fetcher.fail_delete(true);
    let err = tree.delete_node(&id("A")).await.unwrap_err();
    assert!(matches!(err, TreeError::DeleteNodeFailed { .. }));
    assert_eq!(err.node_id(), Some(&id("A")));
    assert_eq!(tree.snapshot(), before);
    assert!(fetcher.contains(&id("A1")));
}

#[tokio::test]
async fn test_unknown_node_rejected_before_any_call() {
    let fetcher = org_fetcher();
    let tree = loaded(&fetcher).await;

    assert!(matches!(
        tree.toggle_expand(&id("Z")).await,
        Err(TreeError::NodeNotFound(_))
    ));
    assert!(matches!(
        tree.delete_node(&id("Z")).await,
        Err(TreeError::NodeNotFound(_))
    ));
    assert!(matches!(
        tree.create_child(&id("Z"), json!({})).await,
        Err(TreeError::NodeNotFound(_))
    ));

    let calls = fetcher.calls();
    assert_eq!(calls.creates, 0);
    assert_eq!(calls.deletes, 0);
    assert_eq!(fetcher.total_children_calls(), 0);
}

#[tokio::test]
async fn test_create_under_unloaded_parent_loads_it() {
    let fetcher = org_fetcher();
    let tree = loaded(&fetcher).await;

    let outcome = tree
        .create_child(&id("B"), json!({ "name": "Audit" }))
        .await
        .unwrap();
    assert_eq!(outcome, treegrid::store::InsertOutcome::LoadedWithChild);
    assert_eq!(
        shape(&tree.visible_rows()),
        expected(&[("A", 0), ("B", 0), ("B-1", 1)])
    );
    assert_eq!(fetcher.children_calls(&id("B")), 0);
}

#[tokio::test]
async fn test_dispatch_routes_row_commands() {
    let fetcher = org_fetcher();
    let tree = loaded(&fetcher).await;

    let toggled = tree.dispatch(RowCommand::Toggle(id("A"))).await.unwrap();
    assert!(matches!(toggled, Dispatched::Toggled(_)));
    assert_eq!(
        tree.dispatch(RowCommand::Edit(id("A1"))).await.unwrap(),
        Dispatched::EditRequested(id("A1"))
    );
    assert_eq!(
        tree.dispatch(RowCommand::AddChild(id("B"))).await.unwrap(),
        Dispatched::AddChildRequested(id("B"))
    );
    assert_eq!(
        tree.dispatch(RowCommand::Delete(id("A2"))).await.unwrap(),
        Dispatched::Deleted { removed: 1 }
    );
    assert!(matches!(
        tree.dispatch(RowCommand::Edit(id("gone"))).await,
        Err(TreeError::NodeNotFound(_))
    ));
}
