mod common;

use std::path::{Path, PathBuf};

use common::RecordingFs;
use tagshelf_lib::files::fs::{FsErrorKind, LocalFileSystem};
use tagshelf_lib::tags::index::build_index;
use tagshelf_lib::tags::mutation::{self, MutationState};
use tagshelf_lib::tags::resolve::TAG_PALETTE;
use tagshelf_lib::tags::types::{LibraryTag, TagGroup, TEMPORARY_GROUP_ID};

fn library() -> Vec<TagGroup> {
    let mut group = TagGroup::default_group();
    group.tags.push(LibraryTag {
        id: "t-urgent".to_string(),
        name: "urgent".to_string(),
        color: "#e53935".to_string(),
        text_color: "#ffffff".to_string(),
        group_id: group.id.clone(),
    });
    vec![group]
}

#[tokio::test]
async fn test_unchanged_tags_touch_nothing() {
    let fs = RecordingFs::with_files(&["/d/[a b] x.txt"]);
    let path = Path::new("/d/[a b] x.txt");

    let outcome = mutation::mutate_tags(&fs, path, &["a", "b"]).await;

    assert_eq!(outcome.state, MutationState::Committed);
    assert_eq!(outcome.new_path, outcome.old_path);
    assert!(!outcome.renamed());
    assert!(fs.calls().is_empty());
}

#[tokio::test]
async fn test_collision_is_conflicted_and_keeps_both_files() {
    let fs = RecordingFs::with_files(&["/d/x.txt", "/d/[a] x.txt"]);

    let outcome = mutation::mutate_tags(&fs, Path::new("/d/x.txt"), &["a"]).await;

    assert_eq!(outcome.state, MutationState::Conflicted);
    assert_eq!(outcome.new_path, PathBuf::from("/d/[a] x.txt"));
    assert_eq!(outcome.suggestion, Some(PathBuf::from("/d/[a] x (1).txt")));
    assert!(fs.has("/d/x.txt"));
    assert!(fs.has("/d/[a] x.txt"));
    assert!(!fs.calls().iter().any(|call| call.starts_with("rename:")));

    let suggestion = outcome.suggestion.unwrap();
    let accepted = mutation::confirm_suggestion(&fs, Path::new("/d/x.txt"), &suggestion).await;
    assert_eq!(accepted.state, MutationState::Committed);
    assert!(fs.has("/d/[a] x (1).txt"));
    assert!(!fs.has("/d/x.txt"));
}

#[tokio::test]
async fn test_distinct_target_is_not_a_collision() {
    let fs = RecordingFs::with_files(&["/d/[x] a.txt", "/d/b.txt"]);

    let outcome = mutation::add_tag(&fs, Path::new("/d/b.txt"), "x").await;

    assert_eq!(outcome.state, MutationState::Committed);
    assert!(fs.has("/d/[x] a.txt"));
    assert!(fs.has("/d/[x] b.txt"));
}

#[tokio::test]
async fn test_suggestion_skips_taken_names() {
    let fs = RecordingFs::with_files(&["/d/x.txt", "/d/[a] x.txt", "/d/[a] x (1).txt"]);

    let outcome = mutation::mutate_tags(&fs, Path::new("/d/x.txt"), &["a"]).await;

    assert_eq!(outcome.suggestion, Some(PathBuf::from("/d/[a] x (2).txt")));
}

#[tokio::test]
async fn test_suggestion_outside_the_folder_is_rejected() {
    let fs = RecordingFs::with_files(&["/d/x.txt"]);

    let outcome = mutation::confirm_suggestion(&fs, Path::new("/d/x.txt"), Path::new("/e/x (1).txt")).await;

    assert_eq!(outcome.state, MutationState::Failed);
    assert!(fs.has("/d/x.txt"));
}

#[tokio::test]
async fn test_missing_source_fails() {
    let fs = RecordingFs::default();

    let outcome = mutation::add_tag(&fs, Path::new("/d/gone.txt"), "a").await;

    assert_eq!(outcome.state, MutationState::Failed);
    assert_eq!(outcome.error_kind, Some(FsErrorKind::SourceMissing));
    assert!(outcome.error.is_some());
}

#[tokio::test]
async fn test_add_then_remove_on_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let fs = LocalFileSystem::new();
    let original = tmp.path().join("report.pdf");
    std::fs::write(&original, b"%PDF").unwrap();

    let first = mutation::add_tag(&fs, &original, "urgent").await;
    assert_eq!(first.state, MutationState::Committed);
    let second = mutation::add_tag(&fs, &first.new_path, "2024").await;
    assert_eq!(second.new_path, tmp.path().join("[urgent 2024] report.pdf"));

    let third = mutation::remove_tag(&fs, &second.new_path, "urgent").await;
    assert_eq!(third.new_path, tmp.path().join("[2024] report.pdf"));

    let last = mutation::remove_tag(&fs, &third.new_path, "2024").await;
    assert_eq!(last.new_path, original);
    assert!(original.exists());
    assert_eq!(std::fs::read(&original).unwrap(), b"%PDF");
}

#[tokio::test]
async fn test_adding_an_existing_tag_is_a_no_op() {
    let fs = RecordingFs::with_files(&["/d/[Urgent] x.txt"]);

    let outcome = mutation::add_tag(&fs, Path::new("/d/[Urgent] x.txt"), "urgent").await;

    assert_eq!(outcome.state, MutationState::Committed);
    assert!(!outcome.renamed());
    assert!(fs.calls().is_empty());
}

#[tokio::test]
async fn test_reorder_moves_one_tag() {
    let fs = RecordingFs::with_files(&["/d/[a b c] x.txt"]);

    let outcome = mutation::reorder_tag(&fs, Path::new("/d/[a b c] x.txt"), 2, 0).await;

    assert_eq!(outcome.new_path, PathBuf::from("/d/[c a b] x.txt"));
    assert!(fs.has("/d/[c a b] x.txt"));
}

#[tokio::test]
async fn test_unmatched_tokens_become_temporary_tags() {
    let fs = RecordingFs::with_files(&["/d/[urgent draft] x.txt", "/d/plain.txt"]);
    let files = tagshelf_lib::files::fs::FileSystem::list_directory(&fs, Path::new("/d"))
        .await
        .unwrap();

    let index = build_index(&files, &library());

    assert_eq!(index.len(), 1);
    let tags = &index[Path::new("/d/[urgent draft] x.txt")];
    assert_eq!(tags[0].id(), "t-urgent");
    assert!(!tags[0].is_temporary());
    assert!(tags[1].is_temporary());
    assert_eq!(tags[1].name(), "draft");
    assert_eq!(tags[1].group_id(), TEMPORARY_GROUP_ID);
    assert!(tags[1].id().starts_with("temp:draft:"));
    assert!(TAG_PALETTE.contains(&tags[1].color()));
}

#[tokio::test]
async fn test_leading_space_keeps_bracket_text_in_the_name() {
    let fs = RecordingFs::with_files(&["/d/ [a] photo.jpg"]);
    let none: [&str; 0] = [];

    let outcome = mutation::mutate_tags(&fs, Path::new("/d/ [a] photo.jpg"), &none).await;

    assert_eq!(outcome.state, MutationState::Committed);
    assert!(!outcome.renamed());
    assert!(fs.calls().is_empty());
}

#[tokio::test]
async fn test_case_only_collision_keeps_both_files() {
    let tmp = tempfile::tempdir().unwrap();
    let upper = tmp.path().join("[Work] x.txt");
    let lower = tmp.path().join("[work] x.txt");
    std::fs::write(&upper, b"AAA").unwrap();
    std::fs::write(&lower, b"BBB").unwrap();
    if std::fs::read_dir(tmp.path()).unwrap().count() < 2 {
        // case-insensitive volume, the two names are one file
        return;
    }

    let fs = LocalFileSystem::new();
    let outcome = mutation::mutate_tags(&fs, &upper, &["work"]).await;

    assert_eq!(outcome.state, MutationState::Conflicted);
    assert_eq!(std::fs::read(&upper).unwrap(), b"AAA");
    assert_eq!(std::fs::read(&lower).unwrap(), b"BBB");
}

#[tokio::test]
async fn test_case_only_tag_change_renames_a_lone_file() {
    let tmp = tempfile::tempdir().unwrap();
    let upper = tmp.path().join("[Work] x.txt");
    std::fs::write(&upper, b"AAA").unwrap();

    let fs = LocalFileSystem::new();
    let outcome = mutation::mutate_tags(&fs, &upper, &["work"]).await;

    assert_eq!(outcome.state, MutationState::Committed);
    assert_eq!(outcome.new_path, tmp.path().join("[work] x.txt"));
    assert_eq!(std::fs::read(&outcome.new_path).unwrap(), b"AAA");
}
