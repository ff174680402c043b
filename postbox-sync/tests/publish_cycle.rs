//! Publish-cycle behaviour against the in-memory store: conflict retries,
//! failure atomicity, merge ordering and the add/delete round trip.

use std::time::Duration;

use postbox_core::{Draft, LocalImage, Post, PostId, RepoConfig, RetryConfig};
use postbox_store::{MemoryStore, RemoteDocuments};
use postbox_sync::{PublishEngine, PublishError, Refresh, Staging};
use tokio::time::Instant;

const POSTS: &str = "posts.json";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn engine(store: &MemoryStore) -> PublishEngine<MemoryStore> {
    PublishEngine::new(
        RemoteDocuments::new(store.clone(), RepoConfig::new("neon", "blog")),
        RetryConfig::default(),
    )
}

fn post(id: &str) -> Post {
    Post {
        id: PostId::from(id),
        date: "14/02/25".to_string(),
        title: id.to_uppercase(),
        title_color: None,
        content: format!("{id} body"),
        color: "#ffffff".to_string(),
        images: vec![],
    }
}

fn seed(store: &MemoryStore, posts: &[Post]) {
    store.put_raw(POSTS, serde_json::to_vec_pretty(posts).expect("encode"));
}

fn remote_posts(store: &MemoryStore) -> Vec<Post> {
    serde_json::from_slice(&store.get_raw(POSTS).expect("document exists")).expect("decode")
}

fn ids(posts: &[Post]) -> Vec<String> {
    posts.iter().map(|p| p.id.0.clone()).collect()
}

/// Engine plus staging already rebased on the current remote.
async fn session(store: &MemoryStore) -> (PublishEngine<MemoryStore>, Staging) {
    let mut engine = engine(store);
    assert_eq!(engine.refresh().await, Refresh::Fresh);
    let staging = Staging::new(engine.snapshot().posts.clone());
    (engine, staging)
}

#[tokio::test(start_paused = true)]
async fn conflicting_write_refetches_and_merges_foreign_post() {
    init_logging();
    let store = MemoryStore::with_writer("tok");
    seed(&store, &[post("a")]);
    let (mut engine, mut staging) = session(&store).await;

    let id = staging.stage_add(Draft::new("Mine", "ours")).unwrap();
    store.interleave_write(
        POSTS,
        serde_json::to_vec(&[post("theirs"), post("a")]).unwrap(),
    );

    let report = engine.publish(&mut staging).await.expect("publish");
    assert_eq!(report.attempts, 2);
    assert_eq!(ids(&remote_posts(&store)), vec![id.0.clone(), "theirs".into(), "a".into()]);
    assert!(!staging.has_pending_changes());
    assert_eq!(report.version, store.version(POSTS));
}

#[tokio::test(start_paused = true)]
async fn succeeds_on_last_allowed_attempt() {
    let store = MemoryStore::with_writer("tok");
    let (mut engine, mut staging) = session(&store).await;
    staging.stage_add(Draft::new("Hello", "World")).unwrap();
    store.force_conflicts(2);

    let started = Instant::now();
    let report = engine.publish(&mut staging).await.expect("publish");
    assert_eq!(report.attempts, 3);
    assert_eq!(remote_posts(&store).len(), 1);
    assert!(started.elapsed() >= Duration::from_millis(500 + 1000));
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_leave_staging_and_remote_untouched() {
    let store = MemoryStore::with_writer("tok");
    seed(&store, &[post("a"), post("b")]);
    let (mut engine, mut staging) = session(&store).await;
    staging.stage_add(Draft::new("new", "")).unwrap();
    staging.stage_delete(&PostId::from("b")).unwrap();
    let before = staging.clone();
    let remote_before = store.get_raw(POSTS);

    store.force_conflicts(3);
    let err = engine.publish(&mut staging).await.unwrap_err();

    assert_eq!(err, PublishError::ConflictRetriesExhausted { attempts: 3 });
    assert_eq!(staging, before);
    assert_eq!(store.get_raw(POSTS), remote_before);

    // Nothing was lost: a manual retry goes through.
    let report = engine.publish(&mut staging).await.expect("manual retry");
    assert_eq!(report.posts.len(), 2);
}

#[tokio::test]
async fn add_then_cancel_touches_nothing() {
    let store = MemoryStore::with_writer("tok");
    seed(&store, &[post("a")]);
    let (_engine, mut staging) = session(&store).await;
    let requests = store.request_count();
    let before = staging.clone();

    let id = staging.stage_add(Draft::new("draft", "")).unwrap();
    staging.stage_delete(&id).unwrap();

    assert!(staging.pending_adds().is_empty());
    assert!(staging.pending_deletes().is_empty());
    assert_eq!(staging.working_view(), before.working_view());
    assert_eq!(store.request_count(), requests);
}

#[tokio::test]
async fn reorder_keeps_posts_added_by_another_session() {
    let store = MemoryStore::with_writer("tok");
    seed(&store, &[post("a"), post("b")]);
    let (mut engine, mut staging) = session(&store).await;
    staging
        .stage_reorder(vec![PostId::from("b"), PostId::from("a")])
        .unwrap();

    seed(&store, &[post("a"), post("b"), post("c")]);
    let report = engine.publish(&mut staging).await.expect("publish");

    assert!(report.reordered);
    assert_eq!(ids(&remote_posts(&store)), vec!["b", "a", "c"]);
    assert!(staging.pending_reorder().is_none());
}

#[tokio::test]
async fn adds_publish_newest_first() {
    let store = MemoryStore::with_writer("tok");
    let (mut engine, mut staging) = session(&store).await;
    let p1 = staging.stage_add(Draft::new("p1", "")).unwrap();
    let p2 = staging.stage_add(Draft::new("p2", "")).unwrap();

    engine.publish(&mut staging).await.expect("publish");
    assert_eq!(ids(&remote_posts(&store)), vec![p2.0, p1.0]);
}

#[tokio::test]
async fn add_publish_delete_publish_round_trip() {
    init_logging();
    let store = MemoryStore::with_writer("tok");
    let (mut engine, mut staging) = session(&store).await;

    let id = staging.stage_add(Draft::new("Hello", "World")).unwrap();
    engine.publish(&mut staging).await.expect("publish add");

    let remote = remote_posts(&store);
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].id, id);
    assert_eq!(remote[0].title, "Hello");
    assert_eq!(remote[0].content, "World");
    assert!(!staging.has_pending_changes());

    staging.stage_delete(&id).unwrap();
    engine.publish(&mut staging).await.expect("publish delete");
    assert!(remote_posts(&store).is_empty());
    assert!(!staging.has_pending_changes());
}

#[tokio::test]
async fn failed_image_upload_is_omitted_not_fatal() {
    let store = MemoryStore::with_writer("tok");
    store.fail_writes_under("blog-images/");
    let (mut engine, mut staging) = session(&store).await;
    let id = staging
        .stage_add(Draft::new("pic", "").with_local_image(LocalImage::new(vec![7; 16], "jpg")))
        .unwrap();

    let report = engine.publish(&mut staging).await.expect("publish");
    assert_eq!(report.images_attempted, 1);
    assert_eq!(report.images_uploaded, 0);
    assert_eq!(report.images_failed(), 1);

    let remote = remote_posts(&store);
    assert_eq!(remote[0].id, id);
    assert!(remote[0].images.is_empty());
}
