//! Proxy hook handlers: payload validation and the operations behind them.

mod helpers;

use serde_json::json;

use osfs_core::error::ErrorKind;
use osfs_core::types::ContainerId;
use osfs_service::hooks::{DeletePayload, TransferPayload, UploadPayload};

use helpers::{TestEnv, user};

fn transfer(value: serde_json::Value) -> TransferPayload {
    serde_json::from_value(value).expect("transfer payload")
}

fn upload_payload(name: &str, object: &str, size: i64) -> UploadPayload {
    serde_json::from_value(json!({
        "name": name,
        "hashes": {"sha256": object, "md5": "m"},
        "worker": {"uname": "host-1"},
        "settings": {"service": "cloud", "bucket": "osf-storage"},
        "metadata": {"name": object, "size": size, "contentType": "text/plain"}
    }))
    .expect("upload payload")
}

#[tokio::test]
async fn test_move_hook_renames_and_moves() {
    let env = TestEnv::new();
    let (container, root) = env.project("us-east-1").await;
    let dest = env.folder(&root, "dest").await;
    let file = env.file(&root, "a.txt").await;

    let view = env
        .services
        .hooks
        .handle_move(transfer(json!({
            "source": file.id.to_string(),
            "target": container.id,
            "destination": {"parent": dest.id.to_string(), "target": container.id, "name": "b.txt"}
        })))
        .await
        .unwrap();

    assert_eq!(view.id, file.id);
    assert_eq!(view.name, "b.txt");
    assert_eq!(view.materialized_path, "/dest/b.txt");
    assert_eq!(view.path, format!("/{}", file.id));
}

#[tokio::test]
async fn test_copy_hook_with_blank_name_keeps_source_name() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let dest = env.folder(&root, "dest").await;
    let file = env.file(&root, "a.txt").await;
    env.upload(file.id, "a", 4).await;

    let view = env
        .services
        .hooks
        .handle_copy(transfer(json!({
            "source": file.id.to_string(),
            "destination": {"parent": dest.id.to_string(), "name": ""}
        })))
        .await
        .unwrap();

    assert_ne!(view.id, file.id);
    assert_eq!(view.name, "a.txt");
    assert_eq!(view.version_count, Some(1));
    assert_eq!(view.size, Some(4));
}

#[tokio::test]
async fn test_transfer_hook_validation() {
    let env = TestEnv::new();
    let (container, root) = env.project("us-east-1").await;
    let file = env.file(&root, "a.txt").await;
    let hooks = &env.services.hooks;

    let blank_source = transfer(json!({
        "source": " ",
        "destination": {"parent": root.id.to_string()}
    }));
    assert_eq!(
        hooks.handle_move(blank_source).await.unwrap_err().kind,
        ErrorKind::Validation
    );

    let no_destination = transfer(json!({"source": file.id.to_string()}));
    assert_eq!(
        hooks.handle_copy(no_destination).await.unwrap_err().kind,
        ErrorKind::Validation
    );

    let bad_id = transfer(json!({
        "source": "not-a-node",
        "destination": {"parent": root.id.to_string()}
    }));
    assert_eq!(
        hooks.handle_move(bad_id).await.unwrap_err().kind,
        ErrorKind::NotFound
    );

    let wrong_container = transfer(json!({
        "source": file.id.to_string(),
        "target": ContainerId::new(),
        "destination": {"parent": root.id.to_string(), "target": container.id}
    }));
    assert_eq!(
        hooks.handle_move(wrong_container).await.unwrap_err().kind,
        ErrorKind::Validation
    );
    assert_eq!(env.reload(file.id).await.row_version, file.row_version);
}

#[tokio::test]
async fn test_delete_hook() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let file = env.file(&root, "a.txt").await;
    let (u, _) = user();
    let hooks = &env.services.hooks;

    let err = hooks
        .handle_delete(None, DeletePayload::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let view = hooks
        .handle_delete(Some(&file.id.to_string()), DeletePayload { user: Some(u) })
        .await
        .unwrap();
    assert!(view.deleted);
    assert_eq!(view.id, file.id);

    let trashed = env.services.tree.get_trashed(file.id).await.unwrap();
    assert_eq!(trashed.deleted_by, Some(u));
}

#[tokio::test]
async fn test_upload_hook_creates_then_versions() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let (u, _) = user();
    let hooks = &env.services.hooks;

    let mut first = upload_payload("notes.txt", "obj-1", 12);
    first.user = Some(u);
    let created = hooks.handle_upload(root.id, first).await.unwrap();
    assert!(created.created_file);
    assert!(created.created_version);
    assert_eq!(created.version, 1);
    assert_eq!(created.node.size, Some(12));
    assert_eq!(created.node.sha256.as_deref(), Some("obj-1"));

    let second = hooks
        .handle_upload(root.id, upload_payload("notes.txt", "obj-2", 30))
        .await
        .unwrap();
    assert!(!second.created_file);
    assert!(second.created_version);
    assert_eq!(second.node.id, created.node.id);
    assert_eq!(second.version, 2);

    let mut repeat = upload_payload("notes.txt", "obj-2", 30);
    repeat.worker.insert("uname".to_string(), json!("host-2"));
    let repeated = hooks.handle_upload(root.id, repeat).await.unwrap();
    assert!(!repeated.created_version);
    assert_eq!(repeated.version, 2);

    let history = env
        .services
        .versions
        .list_versions(created.node.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].version.creator, Some(u));
    assert_eq!(history[0].version.location.object(), Some("obj-2"));
}

#[tokio::test]
async fn test_upload_hook_rejects_folders_and_blank_names() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    env.folder(&root, "docs").await;
    let hooks = &env.services.hooks;

    let mut folder = upload_payload("new", "x", 1);
    folder.kind = Some("folder".to_string());
    assert_eq!(
        hooks.handle_upload(root.id, folder).await.unwrap_err().kind,
        ErrorKind::TypeMismatch
    );

    assert_eq!(
        hooks
            .handle_upload(root.id, upload_payload("docs", "x", 1))
            .await
            .unwrap_err()
            .kind,
        ErrorKind::TypeMismatch
    );

    assert_eq!(
        hooks
            .handle_upload(root.id, upload_payload("  ", "x", 1))
            .await
            .unwrap_err()
            .kind,
        ErrorKind::Validation
    );
}
