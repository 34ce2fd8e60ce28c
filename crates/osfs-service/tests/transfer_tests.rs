//! Move, rename and copy, within and across containers.

mod helpers;

use osfs_core::error::ErrorKind;
use osfs_service::RequestContext;

use helpers::{TestEnv, user};

#[tokio::test]
async fn test_move_into_own_subtree_is_a_cycle() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let a = env.folder(&root, "a").await;
    let b = env.folder(&a, "b").await;
    let c = env.folder(&b, "c").await;
    let ctx = RequestContext::system();

    for dest in [a.id, b.id, c.id] {
        let err = env
            .services
            .transfer
            .move_under(&ctx, a.id, dest, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cycle);
    }
    assert_eq!(env.reload(c.id).await.materialized_path, "/a/b/c/");
}

#[tokio::test]
async fn test_move_with_rename_updates_latest_version_name() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let fish = env.folder(&root, "fish").await;
    let carp = env.file(&fish, "Carp").await;
    env.upload(carp.id, "carp-1", 7).await;
    env.upload(carp.id, "carp-2", 9).await;

    let moved = env
        .services
        .transfer
        .move_under(&RequestContext::system(), carp.id, root.id, Some("Tuna"))
        .await
        .unwrap();
    assert_eq!(moved.id, carp.id);
    assert_eq!(moved.name, "Tuna");
    assert_eq!(moved.parent_id, Some(root.id));
    assert_eq!(moved.materialized_path, "/Tuna");

    let history = env.services.versions.list_versions(carp.id).await.unwrap();
    assert_eq!(history[0].link.version_name, "Tuna");
    assert_eq!(history[1].link.version_name, "Carp");
}

#[tokio::test]
async fn test_blank_name_keeps_current_name() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let dest = env.folder(&root, "dest").await;
    let file = env.file(&root, "keep.txt").await;

    let moved = env
        .services
        .transfer
        .move_under(&RequestContext::system(), file.id, dest.id, Some("   "))
        .await
        .unwrap();
    assert_eq!(moved.name, "keep.txt");
    assert_eq!(moved.materialized_path, "/dest/keep.txt");
}

#[tokio::test]
async fn test_move_rebases_whole_subtree() {
    let env = TestEnv::new();
    let (container, root) = env.project("us-east-1").await;
    let docs = env.folder(&root, "docs").await;
    let sub = env.folder(&docs, "sub").await;
    let file = env.file(&sub, "a.txt").await;
    let archive = env.folder(&root, "archive").await;

    env.services
        .transfer
        .move_under(&RequestContext::system(), docs.id, archive.id, Some("old"))
        .await
        .unwrap();

    assert_eq!(env.reload(sub.id).await.materialized_path, "/archive/old/sub/");
    assert_eq!(
        env.reload(file.id).await.materialized_path,
        "/archive/old/sub/a.txt"
    );
    let found = env
        .services
        .tree
        .resolve_path(container.id, None, "/archive/old/sub/a.txt")
        .await
        .unwrap();
    assert_eq!(found.id, file.id);
}

#[tokio::test]
async fn test_rename_in_place_and_root_is_rejected() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let file = env.file(&root, "a.txt").await;
    let ctx = RequestContext::system();

    let renamed = env.services.transfer.rename(&ctx, file.id, "b.txt").await.unwrap();
    assert_eq!(renamed.parent_id, Some(root.id));
    assert_eq!(renamed.materialized_path, "/b.txt");

    let err = env.services.transfer.rename(&ctx, root.id, "x").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    let err = env
        .services
        .transfer
        .move_under(&ctx, root.id, root.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    let err = env.services.transfer.rename(&ctx, file.id, "a/b").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_move_across_containers_moves_usage() {
    let env = TestEnv::new();
    let (from, from_root) = env.project("us-east-1").await;
    let (to, to_root) = env.project("us-east-1").await;
    let folder = env.folder(&from_root, "data").await;
    let file = env.file(&folder, "big.bin").await;
    env.upload(file.id, "big", 1000).await;
    let total = env.usage(&from).await + env.usage(&to).await;

    env.services
        .transfer
        .move_under(&RequestContext::system(), folder.id, to_root.id, None)
        .await
        .unwrap();

    assert_eq!(env.usage(&from).await, 0);
    assert_eq!(env.usage(&to).await, 1000);
    assert_eq!(env.usage(&from).await + env.usage(&to).await, total);
    assert_eq!(env.reload(file.id).await.container_id, to.id);
}

#[tokio::test]
async fn test_move_across_regions_retags_versions() {
    let env = TestEnv::new();
    let (_, us_root) = env.project("us-east-1").await;
    let (_, de_root) = env.project("de-1").await;
    let file = env.file(&us_root, "a.txt").await;
    let outcome = env.upload(file.id, "a", 3).await;
    assert_eq!(outcome.entry.version.region, "us-east-1");

    env.services
        .transfer
        .move_under(&RequestContext::system(), file.id, de_root.id, None)
        .await
        .unwrap();

    let latest = env
        .services
        .versions
        .latest_version(file.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.version.region, "de-1");
}

#[tokio::test]
async fn test_copy_shares_versions_and_adds_usage() {
    let env = TestEnv::new();
    let (from, from_root) = env.project("us-east-1").await;
    let (to, to_root) = env.project("us-east-1").await;
    let file = env.file(&from_root, "a.txt").await;
    let first = env.upload(file.id, "a1", 10).await;
    env.upload(file.id, "a2", 20).await;
    let versions_before = env.store.version_count().await;

    let copy = env
        .services
        .transfer
        .copy_under(&RequestContext::system(), file.id, to_root.id, None)
        .await
        .unwrap();

    assert_ne!(copy.id, file.id);
    assert_eq!(copy.name, "a.txt");
    assert_eq!(copy.container_id, to.id);
    assert_eq!(env.store.version_count().await, versions_before);
    assert_eq!(env.usage(&from).await, 30);
    assert_eq!(env.usage(&to).await, 30);

    let copied = env.services.versions.get_version(copy.id, 1).await.unwrap();
    assert_eq!(copied.version.id, first.entry.version.id);
    assert_eq!(copied.link.download_count, 0);
    assert_eq!(env.reload(file.id).await.row_version, file.row_version);
}

#[tokio::test]
async fn test_copy_folder_duplicates_subtree() {
    let env = TestEnv::new();
    let (container, root) = env.project("us-east-1").await;
    let docs = env.folder(&root, "docs").await;
    let sub = env.folder(&docs, "sub").await;
    env.file(&sub, "a.txt").await;
    env.file(&docs, "b.txt").await;
    let live_before = env.store.live_count().await;

    let copy = env
        .services
        .transfer
        .copy_under(&RequestContext::system(), docs.id, root.id, Some("docs 2"))
        .await
        .unwrap();

    assert_eq!(env.store.live_count().await, live_before + 4);
    let found = env
        .services
        .tree
        .resolve_path(container.id, None, "/docs 2/sub/a.txt")
        .await
        .unwrap();
    let descendants = env.services.tree.descendants(&copy).await.unwrap();
    assert!(descendants.iter().any(|n| n.id == found.id));
}

#[tokio::test]
async fn test_primary_file_cannot_leave_container() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let (_, other_root) = env.project("us-east-1").await;
    let folder = env.folder(&root, "paper").await;
    let file = env.file(&folder, "main.pdf").await;
    let local = env.folder(&root, "elsewhere").await;
    env.primary.designate(file.id, "preprint-1");
    let ctx = RequestContext::system();

    let err = env
        .services
        .transfer
        .move_under(&ctx, folder.id, other_root.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PrimaryFileConstraint);
    assert_eq!(env.reload(file.id).await.materialized_path, "/paper/main.pdf");

    env.services
        .transfer
        .move_under(&ctx, folder.id, local.id, None)
        .await
        .unwrap();
    env.primary.release(file.id);
    env.services
        .transfer
        .move_under(&ctx, folder.id, other_root.id, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_checkout_in_subtree_blocks_move() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let folder = env.folder(&root, "f").await;
    let free = env.file(&folder, "free.txt").await;
    let held = env.file(&folder, "held.txt").await;
    let dest = env.folder(&root, "dest").await;
    let (u, ctx) = user();
    env.services
        .checkout
        .check_in_or_out(&ctx, held.id, Some(u))
        .await
        .unwrap();

    let err = env
        .services
        .transfer
        .move_under(&ctx, folder.id, dest.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::CheckedOut);
    assert_eq!(env.reload(folder.id).await.parent_id, Some(root.id));
    assert_eq!(env.reload(free.id).await.materialized_path, "/f/free.txt");

    let copy = env
        .services
        .transfer
        .copy_under(&ctx, folder.id, dest.id, None)
        .await
        .unwrap();
    assert_eq!(copy.materialized_path, "/dest/f/");
}

#[tokio::test]
async fn test_move_target_must_be_folder() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let a = env.file(&root, "a.txt").await;
    let b = env.file(&root, "b.txt").await;

    let err = env
        .services
        .transfer
        .move_under(&RequestContext::system(), a.id, b.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
}
