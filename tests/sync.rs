//! Integration tests for the synchronizer against an in-memory posts API.

mod support;

use luvhive_state::{
    new_record_id, FailurePolicy, MemoryBackend, MutationMode, Operation, PersistenceShadow,
    Reactable, Reaction, Remote, Session, SyncError, SyncStatus, Synchronizer, DEV_USER_HEADER,
    IDEMPOTENCY_HEADER, INIT_DATA_HEADER,
};
use support::records::Post;
use support::remote::{ApiError, PostsApi};

fn api() -> PostsApi {
    PostsApi::new(Session::new().with_init_data("query_id=1&hash=abc"))
}

#[test]
fn create_sends_auth_and_idempotency_headers() {
    let api = api();
    let mut feed = Synchronizer::new(api.clone());

    let id = new_record_id();
    feed.create(Post::new(id.clone(), "hello")).unwrap();

    let server = api.server();
    assert!(server
        .requests
        .contains(&format!("{}: query_id=1&hash=abc", INIT_DATA_HEADER)));
    assert!(server
        .requests
        .contains(&format!("{}: {}", IDEMPOTENCY_HEADER, id)));
}

#[test]
fn dev_user_header_when_no_init_data() {
    let api = PostsApi::new(Session::new().with_dev_user("1234"));
    let mut feed = Synchronizer::new(api.clone());
    feed.refresh().unwrap();

    assert_eq!(
        api.server().requests,
        vec![format!("{}: 1234", DEV_USER_HEADER)]
    );
}

#[test]
fn unauthenticated_create_is_marked_failed() {
    let mut feed = Synchronizer::new(PostsApi::new(Session::new()));
    let err = feed.create(Post::new("p1", "hello")).unwrap_err();

    assert!(matches!(err, SyncError::Remote(ApiError::Unauthorized(_))));
    assert_eq!(feed.store().status("p1"), Some(SyncStatus::Failed));
}

#[test]
fn server_assigned_id_replaces_local_one() {
    let api = api();
    api.server().assign_ids = true;
    let mut feed = Synchronizer::new(api.clone());

    let final_id = feed.create(Post::new("local-1", "hello")).unwrap();

    assert_eq!(final_id, "srv-1");
    assert!(!feed.store().contains("local-1"));
    assert_eq!(feed.store().status("srv-1"), Some(SyncStatus::Confirmed));
    assert_eq!(feed.store().len(), 1);
}

#[test]
fn retried_create_is_deduplicated_by_idempotency_key() {
    let api = api();
    api.server().assign_ids = true;
    let mut feed = Synchronizer::new(api.clone());

    // create lands on the server but the response is lost
    let mut other_client = api.clone();
    other_client
        .create(&Post::new("local-1", "hello"), "local-1")
        .unwrap();

    api.set_available(false);
    assert!(feed.create(Post::new("local-1", "hello")).is_err());
    assert_eq!(feed.failed_operation("local-1"), Some(Operation::Create));

    api.set_available(true);
    feed.retry("local-1").unwrap();

    assert_eq!(api.server().posts.len(), 1);
    assert_eq!(feed.store().to_vec().len(), 1);
    assert_eq!(feed.store().status("srv-1"), Some(SyncStatus::Confirmed));
}

#[test]
fn outage_with_rollback_restores_previous_reactions() {
    let api = api();
    let mut feed = Synchronizer::new(api.clone()).with_failure_policy(FailurePolicy::Rollback);
    feed.create(Post::new("p1", "hello")).unwrap();

    api.set_available(false);
    let err = feed
        .edit("p1", |post| post.toggle_reaction(Reaction::Glow))
        .unwrap_err();

    assert_eq!(err.to_string(), "remote error: service unavailable");
    assert_eq!(feed.store().get("p1").unwrap().reactions().glow_count, 0);
    assert_eq!(feed.store().status("p1"), Some(SyncStatus::Confirmed));
}

#[test]
fn pessimistic_edit_applies_only_after_server_accepts() {
    let api = api();
    let mut feed = Synchronizer::new(api.clone()).with_mode(MutationMode::Pessimistic);
    feed.create(Post::new("p1", "draft")).unwrap();

    api.set_available(false);
    assert!(feed.edit("p1", |post| post.content = "final".into()).is_err());
    assert_eq!(feed.store().get("p1").unwrap().content, "draft");

    api.set_available(true);
    feed.edit("p1", |post| post.content = "final".into()).unwrap();
    assert_eq!(feed.store().get("p1").unwrap().content, "final");
    assert_eq!(api.server().posts[0].content, "final");
}

#[test]
fn refresh_merges_other_clients_posts() {
    let api = api();
    let mut feed = Synchronizer::new(api.clone());
    feed.create(Post::new("mine", "from this device")).unwrap();

    api.server()
        .posts
        .insert(0, Post::new("theirs", "from another device"));

    let report = feed.refresh().unwrap();
    assert_eq!(report.inserted, vec!["theirs".to_string()]);
    assert_eq!(report.confirmed, vec!["mine".to_string()]);
    assert_eq!(feed.store().len(), 2);
}

#[test]
fn stale_fetch_after_invalidate_is_ignored() {
    let api = api();
    let mut feed = Synchronizer::new(api.clone());

    let token = feed.scope();
    let mut in_flight = api.clone();
    api.server().posts.push(Post::new("old", "stale"));
    let stale = in_flight.fetch().unwrap();

    // view switched users before the response arrived
    feed.invalidate();
    assert!(matches!(
        feed.apply_fetched(&token, stale),
        Err(SyncError::Cancelled)
    ));
    assert!(feed.store().is_empty());
}

#[test]
fn reload_from_shadow_keeps_failed_records_visible() {
    let api = api();
    let shadow = PersistenceShadow::with_defaults(MemoryBackend::new());

    let mut feed = Synchronizer::new(api.clone());
    feed.create(Post::new("p1", "sent")).unwrap();
    api.set_available(false);
    let _ = feed.create(Post::new("p2", "not sent"));
    feed.persist(&shadow, "alice").unwrap();

    let mut reloaded = Synchronizer::new(api.clone());
    assert_eq!(reloaded.restore(&shadow, "alice"), 2);
    assert_eq!(reloaded.store().status("p2"), Some(SyncStatus::Failed));
    assert_eq!(reloaded.store().status("p1"), Some(SyncStatus::Confirmed));
    assert!(reloaded.failed_operation("p2").is_none());
}

#[test]
fn unsent_post_edited_after_reconnect_is_published() {
    let api = api();
    let mut feed = Synchronizer::new(api.clone());

    api.set_available(false);
    assert!(feed.create(Post::new("p1", "draft")).is_err());

    api.set_available(true);
    feed.edit("p1", |post| post.content = "final".into()).unwrap();

    let server = api.server();
    assert_eq!(server.posts.len(), 1);
    assert_eq!(server.posts[0].content, "final");
    assert_eq!(feed.store().status("p1"), Some(SyncStatus::Confirmed));
}

#[test]
fn unsent_post_edited_offline_is_published_on_retry() {
    let api = api();
    let mut feed = Synchronizer::new(api.clone());

    api.set_available(false);
    assert!(feed.create(Post::new("p1", "draft")).is_err());
    assert!(feed.edit("p1", |post| post.content = "final".into()).is_err());
    assert_eq!(feed.failed_operation("p1"), Some(Operation::Create));

    api.set_available(true);
    feed.retry("p1").unwrap();

    assert_eq!(api.server().posts[0].content, "final");
    assert_eq!(feed.store().status("p1"), Some(SyncStatus::Confirmed));
}

#[test]
fn unsent_post_can_be_discarded() {
    let api = api();
    let mut feed = Synchronizer::new(api.clone());

    api.set_available(false);
    assert!(feed.create(Post::new("p1", "draft")).is_err());

    api.set_available(true);
    let requests_before = api.server().requests.len();
    assert!(feed.delete("p1").unwrap().is_some());

    assert!(feed.store().is_empty());
    assert!(feed.failed_operation("p1").is_none());
    assert_eq!(api.server().requests.len(), requests_before);
}

#[test]
fn pessimistic_delete_keeps_post_until_server_accepts() {
    let api = api();
    let mut feed = Synchronizer::new(api.clone()).with_mode(MutationMode::Pessimistic);
    feed.create(Post::new("p1", "hello")).unwrap();

    api.set_available(false);
    assert!(feed.delete("p1").is_err());
    assert!(feed.store().contains("p1"));
    assert_eq!(api.server().posts.len(), 1);

    api.set_available(true);
    feed.delete("p1").unwrap();
    assert!(feed.store().is_empty());
    assert!(api.server().posts.is_empty());
}
