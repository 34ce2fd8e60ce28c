//! Delete into the trash and restore out of it.

mod helpers;

use osfs_core::error::ErrorKind;
use osfs_core::types::PageRequest;
use osfs_service::RequestContext;

use helpers::{TestEnv, user};

#[tokio::test]
async fn test_delete_folder_trashes_every_descendant() {
    let env = TestEnv::new();
    let (container, root) = env.project("us-east-1").await;
    let folder = env.folder(&root, "P").await;
    let mut files = Vec::new();
    for i in 0..10 {
        files.push(env.file(&folder, &format!("f{i}.txt")).await);
    }
    let live_before = env.store.live_count().await;

    let trashed = env
        .services
        .trash
        .delete(&RequestContext::system(), folder.id)
        .await
        .unwrap();

    assert_eq!(trashed.id(), folder.id);
    assert_eq!(env.store.trashed_count().await, 11);
    assert_eq!(env.store.live_count().await, live_before - 11);
    for file in &files {
        let err = env.services.tree.get_node(file.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Gone);
    }

    let page = env
        .services
        .trash
        .list_trash(container.id, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total_items, 11);
}

#[tokio::test]
async fn test_delete_writes_one_audit_entry() {
    let env = TestEnv::new();
    let (container, root) = env.project("us-east-1").await;
    let folder = env.folder(&root, "P").await;
    env.file(&folder, "a").await;
    env.file(&folder, "b").await;
    let (u, ctx) = user();

    env.services.trash.delete(&ctx, folder.id).await.unwrap();

    let entries = env.audit.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "file_removed");
    assert_eq!(entries[0].container_id, container.id);
    assert_eq!(entries[0].user_id, Some(u));
    assert_eq!(entries[0].params["trashed"], 3);
    assert_eq!(entries[0].params["path"], "/P/");
}

#[tokio::test]
async fn test_restore_round_trip_keeps_identity() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let folder = env.folder(&root, "docs").await;
    let sub = env.folder(&folder, "sub").await;
    let file = env.file(&sub, "a.txt").await;
    env.upload(file.id, "a", 5).await;
    let ctx = RequestContext::system();

    env.services.trash.delete(&ctx, folder.id).await.unwrap();
    let restored = env.services.trash.restore(&ctx, folder.id).await.unwrap();

    assert_eq!(restored.id, folder.id);
    assert_eq!(restored.name, "docs");
    assert_eq!(restored.parent_id, Some(root.id));
    assert_eq!(restored.materialized_path, "/docs/");
    let file_now = env.reload(file.id).await;
    assert_eq!(file_now.parent_id, Some(sub.id));
    assert_eq!(file_now.materialized_path, "/docs/sub/a.txt");
    assert_eq!(env.store.trashed_count().await, 0);
    assert_eq!(
        env.services.versions.list_versions(file.id).await.unwrap().len(),
        1
    );

    let actions: Vec<String> = env
        .audit
        .entries()
        .await
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(actions, vec!["file_removed", "file_restored"]);
}

#[tokio::test]
async fn test_restore_falls_back_to_root() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let folder = env.folder(&root, "gone").await;
    let file = env.file(&folder, "a.txt").await;
    let ctx = RequestContext::system();

    env.services.trash.delete(&ctx, file.id).await.unwrap();
    env.services.trash.delete(&ctx, folder.id).await.unwrap();

    let restored = env.services.trash.restore(&ctx, file.id).await.unwrap();
    assert_eq!(restored.parent_id, Some(root.id));
    assert_eq!(restored.materialized_path, "/a.txt");
    assert_eq!(
        env.services.tree.get_node(folder.id).await.unwrap_err().kind,
        ErrorKind::Gone
    );
}

#[tokio::test]
async fn test_independently_trashed_child_stays_in_trash() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let folder = env.folder(&root, "P").await;
    let early = env.file(&folder, "early.txt").await;
    let late = env.file(&folder, "late.txt").await;
    let ctx = RequestContext::system();

    env.services.trash.delete(&ctx, early.id).await.unwrap();
    env.services.trash.delete(&ctx, folder.id).await.unwrap();
    env.services.trash.restore(&ctx, folder.id).await.unwrap();

    assert_eq!(env.reload(late.id).await.parent_id, Some(folder.id));
    assert_eq!(
        env.services.tree.get_node(early.id).await.unwrap_err().kind,
        ErrorKind::Gone
    );
    assert_eq!(env.store.trashed_count().await, 1);
}

#[tokio::test]
async fn test_restoring_live_node_is_duplicate() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let file = env.file(&root, "a.txt").await;

    let err = env
        .services
        .trash
        .restore(&RequestContext::system(), file.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Duplicate);
}

#[tokio::test]
async fn test_checkout_in_subtree_blocks_delete() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let folder = env.folder(&root, "P").await;
    let sub = env.folder(&folder, "sub").await;
    let held = env.file(&sub, "held.txt").await;
    let (u, ctx) = user();
    env.services
        .checkout
        .check_in_or_out(&ctx, held.id, Some(u))
        .await
        .unwrap();
    let live_before = env.store.live_count().await;

    let err = env.services.trash.delete(&ctx, folder.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::CheckedOut);
    assert_eq!(env.store.live_count().await, live_before);
    assert_eq!(env.store.trashed_count().await, 0);
    assert!(env.audit.entries().await.iter().all(|e| e.action != "file_removed"));
}

#[tokio::test]
async fn test_primary_file_blocks_delete() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let folder = env.folder(&root, "P").await;
    let file = env.file(&folder, "main.pdf").await;
    env.primary.designate(file.id, "preprint-9");
    let ctx = RequestContext::system();

    for target in [file.id, folder.id] {
        let err = env.services.trash.delete(&ctx, target).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PrimaryFileConstraint);
    }
    assert_eq!(env.store.trashed_count().await, 0);
}

#[tokio::test]
async fn test_root_cannot_be_deleted() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;

    let err = env
        .services
        .trash
        .delete(&RequestContext::system(), root.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}
