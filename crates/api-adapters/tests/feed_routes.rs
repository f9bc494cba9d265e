//! Router-level tests on the in-memory adapters, driven through
//! `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::{Duration as ChronoDuration, Utc};
use tower::ServiceExt;
use uuid::Uuid;

use api_adapters::{router, AppState};
use auth_adapters::JwtSessions;
use domains::{BlogRepo, Post, Sessions, User};
use services::{EngageService, FeedService, PublishService};
use storage_adapters::{MemoryMediaStore, MemoryPageCache, MemoryRepo};

struct Harness {
    state: AppState,
    repo: Arc<MemoryRepo>,
    sessions: Arc<JwtSessions>,
}

fn harness() -> Harness {
    let repo = Arc::new(MemoryRepo::new());
    let repo_dyn: Arc<dyn BlogRepo> = repo.clone();
    let media = Arc::new(MemoryMediaStore::new());
    let sessions = Arc::new(JwtSessions::new(b"test-secret", 24));
    let state = AppState {
        repo: repo_dyn.clone(),
        feed: Arc::new(FeedService::new(repo_dyn.clone())),
        publish: Arc::new(PublishService::new(repo_dyn.clone(), media.clone())),
        engage: Arc::new(EngageService::new(repo_dyn)),
        cache: Arc::new(MemoryPageCache::new()),
        media,
        sessions: sessions.clone(),
        metrics: Arc::new(api_adapters::metrics::Metrics::new()),
        cache_ttl: Duration::from_secs(20),
    };
    Harness { state, repo, sessions }
}

fn app(h: &Harness) -> axum::Router {
    router(h.state.clone(), None)
}

async fn seed_user(repo: &MemoryRepo, username: &str) -> User {
    let user = User {
        id: Uuid::now_v7(),
        username: username.to_string(),
        display_name: None,
        created_at: Utc::now(),
    };
    repo.insert_user(user.clone()).await.unwrap();
    user
}

async fn seed_post(repo: &MemoryRepo, author_id: Uuid, text: &str, minutes_ago: i64) -> Post {
    let post = Post {
        id: Uuid::now_v7(),
        text: text.to_string(),
        group_id: None,
        author_id,
        image_id: None,
        created_at: Utc::now() - ChronoDuration::minutes(minutes_ago),
    };
    repo.insert_post(post.clone()).await.unwrap();
    post
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_as(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn home_serves_stale_cache_until_invalidated() {
    let h = harness();
    let author = seed_user(&h.repo, "ada").await;
    let post = seed_post(&h.repo, author.id, "cached words", 1).await;

    let first = body_string(app(&h).oneshot(get("/")).await.unwrap()).await;
    assert!(first.contains("cached words"));

    // delete the post; inside the TTL the cached bytes come back verbatim
    h.repo.remove_post(post.id).await.unwrap();
    let second = body_string(app(&h).oneshot(get("/")).await.unwrap()).await;
    assert_eq!(first, second);

    // after explicit invalidation the deleted post is gone
    use domains::PageCache;
    h.state.cache.invalidate("index_page").await.unwrap();
    let third = body_string(app(&h).oneshot(get("/")).await.unwrap()).await;
    assert!(!third.contains("cached words"));
}

#[tokio::test]
async fn explicit_page_param_bypasses_the_cache() {
    let h = harness();
    let author = seed_user(&h.repo, "ada").await;
    let post = seed_post(&h.repo, author.id, "fresh words", 1).await;

    let cached = body_string(app(&h).oneshot(get("/")).await.unwrap()).await;
    assert!(cached.contains("fresh words"));

    h.repo.remove_post(post.id).await.unwrap();
    let paged = body_string(app(&h).oneshot(get("/?page=1")).await.unwrap()).await;
    assert!(!paged.contains("fresh words"));
}

#[tokio::test]
async fn out_of_range_page_clamps_to_last() {
    let h = harness();
    let author = seed_user(&h.repo, "ada").await;
    for i in 0..13 {
        seed_post(&h.repo, author.id, &format!("post {i}"), i).await;
    }

    let html = body_string(app(&h).oneshot(get("/?page=999")).await.unwrap()).await;
    assert!(html.contains("Page 2 of 2"));

    let garbled = body_string(app(&h).oneshot(get("/?page=abc")).await.unwrap()).await;
    assert!(garbled.contains("Page 1 of 2"));
}

#[tokio::test]
async fn unknown_group_is_404() {
    let h = harness();
    let response = app(&h).oneshot(get("/group/no-such-slug/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_path_is_404() {
    let h = harness();
    let response = app(&h).oneshot(get("/definitely/not/a/route")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_form_redirects_anonymous_to_login() {
    let h = harness();
    let response = app(&h).oneshot(get("/create/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert_eq!(location, "/auth/login/?next=/create/");
}

#[tokio::test]
async fn follow_redirects_to_follow_feed_and_lists_posts() {
    let h = harness();
    let viewer = seed_user(&h.repo, "reader").await;
    let author = seed_user(&h.repo, "writer").await;
    seed_post(&h.repo, author.id, "followed content", 1).await;

    let token = h.sessions.issue(&viewer).unwrap();
    let cookie = format!("session={token}");

    let response = app(&h)
        .oneshot(post_as("/profile/writer/follow/", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[header::LOCATION].to_str().unwrap(),
        "/follow/"
    );

    let feed_request = Request::builder()
        .uri("/follow/")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let html = body_string(app(&h).oneshot(feed_request).await.unwrap()).await;
    assert!(html.contains("followed content"));
}

#[tokio::test]
async fn unfollow_without_edge_is_404() {
    let h = harness();
    let viewer = seed_user(&h.repo, "reader").await;
    seed_user(&h.repo, "writer").await;

    let token = h.sessions.issue(&viewer).unwrap();
    let response = app(&h)
        .oneshot(post_as(
            "/profile/writer/unfollow/",
            &format!("session={token}"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metrics_endpoint_exposes_request_counter() {
    let h = harness();
    let app = app(&h);
    app.clone().oneshot(get("/")).await.unwrap();
    let html = body_string(app.oneshot(get("/metrics")).await.unwrap()).await;
    assert!(html.contains("http_requests_total"));
}
