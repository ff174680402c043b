use postbox_core::{AdminConfig, Config, Draft, Post, PostId, RepoConfig};
use postbox_session::{digest_hex, GateError, Session, SessionError};
use postbox_store::{AccessToken, MemoryStore};
use postbox_sync::{PublishError, StatusKind};
use tokio::sync::mpsc;

fn config() -> Config {
    Config {
        repo: RepoConfig::new("neon", "blog"),
        admin: AdminConfig {
            username_digest: digest_hex("editor"),
            secret_digest: digest_hex("hunter2"),
        },
        ..Config::default()
    }
}

fn store_with_posts(titles: &[&str]) -> MemoryStore {
    let store = MemoryStore::new();
    store.grant("tok", "neon", true);
    let posts: Vec<Post> = titles
        .iter()
        .map(|t| Post {
            id: format!("post-{t}").into(),
            date: "01/06/25".to_string(),
            title: t.to_string(),
            title_color: None,
            content: String::new(),
            color: "#ffffff".to_string(),
            images: vec![],
        })
        .collect();
    store.put_raw("posts.json", serde_json::to_vec(&posts).unwrap());
    store
}

#[tokio::test]
async fn login_loads_posts_and_publishes() {
    let store = store_with_posts(&["first"]);
    let mut session = Session::new(store.clone(), config());

    let identity = session
        .login("editor", "hunter2", AccessToken::from("tok"))
        .await
        .expect("login");
    assert_eq!(identity.login, "neon");
    assert_eq!(session.context().unwrap().staging().base().len(), 1);

    session
        .context_mut()
        .unwrap()
        .staging_mut()
        .stage_add(Draft::new("second", "hello"))
        .unwrap();
    let report = session.publish().await.expect("publish");
    assert_eq!(report.posts.len(), 2);
    assert_eq!(report.posts[0].title, "second");
    assert!(!session.has_pending_changes());
}

#[tokio::test]
async fn token_without_push_is_refused() {
    let store = store_with_posts(&[]);
    store.grant("ro", "neon", false);
    let mut session = Session::new(store, config());

    let err = session
        .login("editor", "hunter2", AccessToken::from("ro"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SessionError::Gate(GateError::NoWriteAccess {
            login: "neon".to_string()
        })
    );
    assert!(!session.is_active());
}

#[tokio::test]
async fn revoked_token_on_publish_logs_out() {
    let store = store_with_posts(&["first"]);
    let mut session = Session::new(store.clone(), config());
    session
        .login("editor", "hunter2", AccessToken::from("tok"))
        .await
        .expect("login");
    session
        .context_mut()
        .unwrap()
        .staging_mut()
        .stage_add(Draft::new("late", ""))
        .unwrap();

    store.grant("tok", "neon", false);
    let err = session.publish().await.unwrap_err();

    assert!(matches!(err, SessionError::Publish(PublishError::Unauthorized(_))));
    assert!(!session.is_active());
    assert!(!session.has_pending_changes());
    assert_eq!(
        serde_json::from_slice::<Vec<Post>>(&store.get_raw("posts.json").unwrap())
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn refresh_rebases_working_view() {
    let store = store_with_posts(&["first"]);
    let mut session = Session::new(store.clone(), config());
    session
        .login("editor", "hunter2", AccessToken::from("tok"))
        .await
        .expect("login");

    let other = store_with_posts(&["first", "from-elsewhere"]);
    store.put_raw("posts.json", other.get_raw("posts.json").unwrap());
    session.refresh().await.expect("refresh");

    let view = session.context().unwrap().staging().working_view();
    assert_eq!(view.len(), 2);
}

#[tokio::test]
async fn refresh_forgets_delete_already_applied_elsewhere() {
    let store = store_with_posts(&["a", "b"]);
    let mut session = Session::new(store.clone(), config());
    session
        .login("editor", "hunter2", AccessToken::from("tok"))
        .await
        .expect("login");
    session
        .context_mut()
        .unwrap()
        .staging_mut()
        .stage_delete(&PostId::from("post-b"))
        .unwrap();
    assert!(session.has_pending_changes());

    let other = store_with_posts(&["a"]);
    store.put_raw("posts.json", other.get_raw("posts.json").unwrap());
    session.refresh().await.expect("refresh");

    assert!(!session.has_pending_changes());
}

#[tokio::test]
async fn status_events_reach_the_subscriber() {
    let store = store_with_posts(&[]);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = Session::new(store, config()).with_status(tx);
    session
        .login("editor", "hunter2", AccessToken::from("tok"))
        .await
        .expect("login");

    let first = rx.recv().await.expect("event");
    assert_eq!(first.kind, StatusKind::Loading);
}
