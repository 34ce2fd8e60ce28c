mod helpers;

use osfs_core::error::ErrorKind;

use helpers::{TestEnv, user};

#[tokio::test]
async fn test_add_and_remove_tags() {
    let env = TestEnv::new();
    let (container, root) = env.project("us-east-1").await;
    let file = env.file(&root, "a.txt").await;
    let (_, ctx) = user();
    let tags = &env.services.tags;

    let tagged = tags.add_tag(&ctx, file.id, " survey ").await.unwrap();
    assert!(tagged.tags.contains("survey"));
    assert_eq!(
        tags.add_tag(&ctx, file.id, "survey").await.unwrap_err().kind,
        ErrorKind::Duplicate
    );

    let untagged = tags.remove_tag(&ctx, file.id, "survey").await.unwrap();
    assert!(untagged.tags.is_empty());
    assert_eq!(
        tags.remove_tag(&ctx, file.id, "survey").await.unwrap_err().kind,
        ErrorKind::NotFound
    );

    assert_eq!(
        env.audit.actions_for(container.id).await,
        vec!["file_tag_added".to_string(), "file_tag_removed".to_string()]
    );
}

#[tokio::test]
async fn test_tags_are_files_only_and_not_blank() {
    let env = TestEnv::new();
    let (_, root) = env.project("us-east-1").await;
    let folder = env.folder(&root, "f").await;
    let file = env.file(&root, "a.txt").await;
    let (_, ctx) = user();

    assert_eq!(
        env.services
            .tags
            .add_tag(&ctx, folder.id, "x")
            .await
            .unwrap_err()
            .kind,
        ErrorKind::TypeMismatch
    );
    assert_eq!(
        env.services
            .tags
            .add_tag(&ctx, file.id, "  ")
            .await
            .unwrap_err()
            .kind,
        ErrorKind::Validation
    );
}
