//! Integration tests for the post store against a mock posts API.

use std::sync::Arc;

use serde_json::json;
use storefront_core::api::{ApiClient, RequestContext};
use storefront_core::auth::MemoryStore;
use storefront_core::cache::{CollectionStore, FetchOutcome, FetchStatus};
use storefront_core::config::Config;
use storefront_core::models::Post;
use storefront_core::Services;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn posts_body() -> serde_json::Value {
    json!([
        { "userId": 1, "id": 1, "title": "sunt aut facere", "body": "quia et suscipit" },
        { "userId": 1, "id": 2, "title": "qui est esse", "body": "est rerum tempore" },
        { "userId": 2, "id": 11, "title": "et ea vero quia", "body": "delectus reiciendis" }
    ])
}

fn store_for(server: &MockServer) -> CollectionStore<Post> {
    let api = ApiClient::with_base_urls(&server.uri(), &server.uri()).unwrap();
    CollectionStore::new("posts", Arc::new(api))
}

#[tokio::test]
async fn test_fetch_all_on_healthy_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(posts_body()))
        .expect(1)
        .mount(&server)
        .await;
    let store = store_for(&server);
    assert_eq!(store.snapshot().status, FetchStatus::Idle);
    assert!(store.snapshot().is_empty());

    let outcome = store.fetch_all(&RequestContext::anonymous()).await;

    assert_eq!(outcome, FetchOutcome::Fetched(3));
    let snapshot = store.snapshot();
    assert_eq!(snapshot.status, FetchStatus::Idle);
    let ids: Vec<i64> = snapshot.items.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2, 11]);
    assert_eq!(store.get_by_id(11).map(|p| p.owner_id), Some(2));
    assert_eq!(store.get_by_id(3), None);

    // Second call is served from memory; `expect(1)` verifies no second request
    assert_eq!(store.fetch_all(&RequestContext::anonymous()).await, FetchOutcome::Cached);
}

#[tokio::test]
async fn test_fetch_sends_session_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .and(header("authorization", "Bearer emily-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(posts_body()))
        .expect(1)
        .mount(&server)
        .await;
    let store = store_for(&server);

    let outcome = store.fetch_all(&RequestContext::with_bearer("emily-token")).await;

    assert_eq!(outcome, FetchOutcome::Fetched(3));
}

#[tokio::test]
async fn test_server_failure_sets_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "Database unavailable" })))
        .mount(&server)
        .await;
    let store = store_for(&server);

    let outcome = store.fetch_all(&RequestContext::anonymous()).await;

    assert_eq!(outcome, FetchOutcome::Failed("Database unavailable".to_string()));
    assert_eq!(store.snapshot().error(), Some("Database unavailable"));
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn test_network_failure_sets_error_status() {
    // Nothing listens on the discard port
    let api = ApiClient::with_base_urls("http://127.0.0.1:9", "http://127.0.0.1:9").unwrap();
    let store: CollectionStore<Post> = CollectionStore::new("posts", Arc::new(api));

    let outcome = store.fetch_all(&RequestContext::anonymous()).await;

    assert!(matches!(outcome, FetchOutcome::Failed(_)));
    let snapshot = store.snapshot();
    let message = snapshot.error().expect("error status");
    assert!(message.starts_with("Network error"), "unexpected message: {message}");
}

#[tokio::test]
async fn test_malformed_body_sets_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;
    let store = store_for(&server);

    assert!(matches!(
        store.fetch_all(&RequestContext::anonymous()).await,
        FetchOutcome::Failed(_)
    ));
    let snapshot = store.snapshot();
    assert!(snapshot.error().unwrap().starts_with("Invalid response"));
}

#[tokio::test]
async fn test_services_share_session_context() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .and(header("authorization", "Bearer saved-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(posts_body()))
        .expect(1)
        .mount(&server)
        .await;
    let config = Config {
        auth_base_url: server.uri(),
        posts_base_url: server.uri(),
        ..Config::default()
    };
    let services =
        Services::with_store(&config, Arc::new(MemoryStore::with_token("saved-token"))).unwrap();
    services.session.restore();

    let outcome = services
        .posts
        .fetch_all(&services.session.request_context())
        .await;

    assert_eq!(outcome, FetchOutcome::Fetched(3));
}
