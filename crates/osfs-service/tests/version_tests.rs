//! Version chain: identifiers, deduplication, history and archive backfill.

mod helpers;

use serde_json::json;

use osfs_core::error::ErrorKind;
use osfs_entity::version::CreateVersion;
use osfs_service::{BackgroundTask, RequestContext};

use helpers::{TestEnv, location, object_map, upload, user};

#[tokio::test]
async fn test_identifiers_increase_from_one() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let file = env.file(&root, "data.csv").await;

    let mut identifiers = Vec::new();
    for object in ["a", "b", "c", "d"] {
        let outcome = env.upload(file.id, object, 10).await;
        assert!(outcome.created);
        identifiers.push(outcome.entry.link.identifier);
    }
    assert_eq!(identifiers, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_identifiers_are_per_file_even_when_versions_are_shared() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let original = env.file(&root, "a.txt").await;
    env.upload(original.id, "v1", 5).await;
    env.upload(original.id, "v2", 5).await;

    let copy = env
        .services
        .transfer
        .copy_under(&RequestContext::system(), original.id, root.id, Some("b.txt"))
        .await
        .unwrap();
    let third = env.upload(copy.id, "v3", 5).await;
    assert_eq!(third.entry.link.identifier, 3);

    let fresh = env.file(&root, "c.txt").await;
    assert_eq!(env.upload(fresh.id, "v2", 5).await.entry.link.identifier, 1);
}

#[tokio::test]
async fn test_duplicate_upload_does_not_append() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let file = env.file(&root, "a.txt").await;
    let first = env.upload(file.id, "blob-1", 42).await;

    let again = env
        .services
        .versions
        .create_version(
            &RequestContext::system(),
            file.id,
            CreateVersion {
                creator: None,
                location: location("blob-1", "worker-7"),
                metadata: object_map(json!({ "size": 42 })),
            },
        )
        .await
        .unwrap();

    assert!(!again.created);
    assert_eq!(again.entry.version.id, first.entry.version.id);
    assert_eq!(env.services.versions.list_versions(file.id).await.unwrap().len(), 1);
    assert_eq!(env.store.version_count().await, 1);
}

#[tokio::test]
async fn test_matching_an_older_version_still_appends() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let file = env.file(&root, "a.txt").await;
    env.upload(file.id, "one", 1).await;
    env.upload(file.id, "two", 2).await;

    let back = env.upload(file.id, "one", 1).await;
    assert!(back.created);
    assert_eq!(back.entry.link.identifier, 3);
}

#[tokio::test]
async fn test_history_is_newest_first_and_addressable() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let file = env.file(&root, "a.txt").await;
    for object in ["a", "b", "c"] {
        env.upload(file.id, object, 1).await;
    }

    let versions = &env.services.versions;
    let history = versions.list_versions(file.id).await.unwrap();
    let ids: Vec<i64> = history.iter().map(|e| e.link.identifier).collect();
    assert_eq!(ids, vec![3, 2, 1]);

    let second = versions.get_version(file.id, 2).await.unwrap();
    assert_eq!(second.version.location.object(), Some("b"));
    assert_eq!(
        versions.latest_version(file.id).await.unwrap().unwrap().link.identifier,
        3
    );

    let err = versions.get_version(file.id, 9).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_version_name_survives_rename() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let file = env.file(&root, "draft.docx").await;
    let v1 = env.upload(file.id, "a", 1).await;
    env.upload(file.id, "b", 1).await;

    env.services
        .transfer
        .rename(&RequestContext::system(), file.id, "final.docx")
        .await
        .unwrap();

    let versions = &env.services.versions;
    let first = versions
        .get_basefilenode_version(file.id, v1.entry.version.id)
        .await
        .unwrap();
    assert_eq!(first.version_name, "draft.docx");
    let latest = versions.latest_version(file.id).await.unwrap().unwrap();
    assert_eq!(latest.link.version_name, "final.docx");
}

#[tokio::test]
async fn test_update_metadata_merges_and_keeps_location() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let file = env.file(&root, "a.txt").await;
    let outcome = env.upload(file.id, "blob", 1).await;

    let updated = env
        .services
        .versions
        .update_metadata(
            outcome.entry.version.id,
            &object_map(json!({ "size": 2048, "md5": "abc", "note": "x" })),
        )
        .await
        .unwrap();

    assert_eq!(updated.size, Some(2048));
    assert_eq!(updated.md5.as_deref(), Some("abc"));
    assert_eq!(updated.metadata.get("note"), Some(&json!("x")));
    assert_eq!(updated.location, outcome.entry.version.location);

    let stored = env.services.versions.get_version(file.id, 1).await.unwrap();
    assert_eq!(stored.version.size, Some(2048));
}

#[tokio::test]
async fn test_downloads_are_counted_per_file_and_version() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let file = env.file(&root, "a.txt").await;
    env.upload(file.id, "blob", 1).await;
    let copy = env
        .services
        .transfer
        .copy_under(&RequestContext::system(), file.id, root.id, Some("b.txt"))
        .await
        .unwrap();

    let versions = &env.services.versions;
    assert_eq!(versions.record_download(file.id, 1).await.unwrap(), 1);
    assert_eq!(versions.record_download(file.id, 1).await.unwrap(), 2);
    assert_eq!(versions.record_download(copy.id, 1).await.unwrap(), 1);
}

#[tokio::test]
async fn test_upload_blocked_by_another_users_checkout() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let file = env.file(&root, "a.txt").await;
    let (holder, holder_ctx) = user();
    let (_, other_ctx) = user();

    env.services
        .checkout
        .check_in_or_out(&holder_ctx, file.id, Some(holder))
        .await
        .unwrap();

    let err = env
        .services
        .versions
        .create_version(&other_ctx, file.id, upload("x", 1))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::CheckedOut);
    assert_eq!(err.detail.user_id, Some(holder.into_uuid()));

    let ok = env
        .services
        .versions
        .create_version(&holder_ctx, file.id, upload("x", 1))
        .await
        .unwrap();
    assert!(ok.created);
}

#[tokio::test]
async fn test_folders_have_no_versions() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let folder = env.folder(&root, "f").await;
    let err = env
        .services
        .versions
        .create_version(&RequestContext::system(), folder.id, upload("x", 1))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
}

#[tokio::test]
async fn test_new_version_queues_archive_match() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let file = env.file(&root, "a.txt").await;
    let outcome = env.upload(file.id, "blob", 1).await;

    let tasks = env.tasks.tasks.lock().await;
    assert_eq!(
        tasks.as_slice(),
        &[BackgroundTask::ArchiveMatch {
            version_id: outcome.entry.version.id
        }]
    );
}

#[tokio::test]
async fn test_archive_match_backfills_from_same_content() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let archived_file = env.file(&root, "old.bin").await;
    let archived = env.upload(archived_file.id, "content-hash", 8).await;
    env.services
        .versions
        .update_metadata(
            archived.entry.version.id,
            &object_map(json!({ "archive": "glacier-id", "vault": "vault-1" })),
        )
        .await
        .unwrap();

    let other = env.file(&root, "new.bin").await;
    let fresh = env
        .services
        .versions
        .create_version(
            &RequestContext::system(),
            other.id,
            CreateVersion {
                creator: None,
                location: location("elsewhere", "worker-2"),
                metadata: object_map(json!({ "size": 8, "sha256": "content-hash" })),
            },
        )
        .await
        .unwrap();

    let versions = &env.services.versions;
    assert!(versions
        .find_matching_archive(fresh.entry.version.id)
        .await
        .unwrap());
    let backfilled = versions.get_version(other.id, 1).await.unwrap();
    assert_eq!(backfilled.version.metadata.get("vault"), Some(&json!("vault-1")));
    assert_eq!(backfilled.version.location.object(), Some("elsewhere"));

    assert!(!versions
        .find_matching_archive(fresh.entry.version.id)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_archive_match_without_candidate_is_a_quiet_no() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let file = env.file(&root, "a.bin").await;
    let outcome = env.upload(file.id, "unique", 1).await;

    assert!(!env
        .services
        .versions
        .find_matching_archive(outcome.entry.version.id)
        .await
        .unwrap());
    assert_eq!(env.services.versions.archive_sweep(10).await.unwrap(), 0);
}

#[tokio::test]
async fn test_archive_match_ignores_later_versions() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let first = env.file(&root, "first.bin").await;
    let earlier = env.upload(first.id, "shared-hash", 8).await;

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = env.file(&root, "second.bin").await;
    let later = env.upload(second.id, "shared-hash", 8).await;
    env.services
        .versions
        .update_metadata(
            later.entry.version.id,
            &object_map(json!({ "archive": "glacier-id", "vault": "vault-1" })),
        )
        .await
        .unwrap();

    let versions = &env.services.versions;
    assert!(!versions
        .find_matching_archive(earlier.entry.version.id)
        .await
        .unwrap());
    let untouched = versions.get_version(first.id, 1).await.unwrap();
    assert!(!untouched.version.has_archive());
}
