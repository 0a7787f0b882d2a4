//! HTTP-level tests against the in-memory store.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use actix_web::http::{StatusCode, header};
use actix_web::test::{self, TestRequest};
use actix_web::{App, web};
use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use serde_json::{Value, json};

use pulse_core::ports::{RateLimitError, RateLimitResult, RateLimiter};
use pulse_infra::{Argon2PasswordService, JwtConfig, JwtTokenService};

use crate::handlers::configure_routes;
use crate::observability::RequestIdMiddleware;
use crate::state::{AppState, Repositories};

fn state() -> AppState {
    let passwords = Arc::new(Argon2PasswordService::with_params(1024, 1, 1).unwrap());
    let tokens = Arc::new(JwtTokenService::new(JwtConfig {
        secret: "handler-test-secret".to_string(),
        ..JwtConfig::default()
    }));
    AppState::from_parts(Repositories::in_memory(), passwords, tokens)
}

/// Admits the first `budget` requests, then denies everything.
struct Budget(AtomicU32);

#[async_trait]
impl RateLimiter for Budget {
    async fn check(&self, _key: &str) -> Result<RateLimitResult, RateLimitError> {
        let left = self.0.load(Ordering::SeqCst);
        if left == 0 {
            return Ok(RateLimitResult::denied(Duration::from_secs(42)));
        }
        self.0.store(left - 1, Ordering::SeqCst);
        Ok(RateLimitResult::allowed())
    }
}

macro_rules! app {
    () => {
        app!(None)
    };
    ($limiter:expr) => {{
        let limiter: Option<Arc<dyn RateLimiter>> = $limiter;
        test::init_service(
            App::new()
                .wrap(RequestIdMiddleware)
                .app_data(web::Data::new(state()))
                .configure(|cfg| configure_routes(cfg, limiter)),
        )
        .await
    }};
}

/// Send a request and decode the JSON body.
macro_rules! send {
    ($app:expr, $req:expr) => {{
        let resp = test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }};
}

/// Register `$name` and return `(user_id, bearer)`.
macro_rules! register {
    ($app:expr, $name:expr) => {{
        let (status, body) = send!(
            $app,
            TestRequest::post().uri("/api/auth/register").set_json(json!({
                "username": $name,
                "email": format!("{}@example.com", $name),
                "password": "password123",
                "full_name": format!("{} Example", $name),
            }))
        );
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let id = body["data"]["user"]["id"].as_str().unwrap().to_string();
        let token = body["data"]["access_token"].as_str().unwrap().to_string();
        (id, format!("Bearer {token}"))
    }};
}

macro_rules! create_post {
    ($app:expr, $bearer:expr, $body:expr) => {{
        let (status, body) = send!(
            $app,
            TestRequest::post()
                .uri("/api/posts")
                .insert_header((header::AUTHORIZATION, $bearer.as_str()))
                .set_json($body)
        );
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }};
}

fn authed(req: TestRequest, bearer: &str) -> TestRequest {
    req.insert_header((header::AUTHORIZATION, bearer))
}

#[actix_web::test]
async fn test_health_reports_store() {
    let app = app!();
    let (status, body) = send!(app, TestRequest::get().uri("/api/health"));

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "memory");
}

#[actix_web::test]
async fn test_register_login_and_me() {
    let app = app!();
    let (id, _) = register!(app, "alice");

    let (status, body) = send!(
        app,
        TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"username": "alice", "password": "password123"}))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["token_type"], "Bearer");
    let bearer = format!("Bearer {}", body["data"]["access_token"].as_str().unwrap());

    let (status, body) = send!(app, authed(TestRequest::get().uri("/api/auth/me"), &bearer));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id.as_str());
    assert!(body["data"].get("password_hash").is_none());

    let (status, _) = send!(
        app,
        TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"username": "alice", "password": "wrong-password"}))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_invalid_registration_lists_field_errors() {
    let app = app!();
    let (status, body) = send!(
        app,
        TestRequest::post().uri("/api/auth/register").set_json(json!({
            "username": "a!",
            "email": "not-an-email",
            "password": "123",
            "full_name": "A",
        }))
    );

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["username"].is_array());
    assert!(body["errors"]["email"].is_array());
    assert!(body["errors"]["password"].is_array());
}

#[actix_web::test]
async fn test_duplicate_username_conflicts() {
    let app = app!();
    register!(app, "alice");

    let (status, _) = send!(
        app,
        TestRequest::post().uri("/api/auth/register").set_json(json!({
            "username": "alice",
            "email": "other@example.com",
            "password": "password123",
            "full_name": "Other Alice",
        }))
    );
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_protected_routes_require_a_token() {
    let app = app!();

    let (status, _) = send!(app, TestRequest::get().uri("/api/auth/me"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send!(
        app,
        authed(TestRequest::get().uri("/api/posts/feed"), "Bearer not-a-jwt")
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_feed_follows_the_graph_and_drops_deleted_posts() {
    let app = app!();
    let (alice_id, alice) = register!(app, "alice");
    let (_, bob) = register!(app, "bob");
    let post_id = create_post!(app, alice, json!({"content": "hello from alice"}));

    let (_, body) = send!(app, authed(TestRequest::get().uri("/api/posts/feed"), &bob));
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 0);

    let (status, _) = send!(
        app,
        authed(TestRequest::post().uri(&format!("/api/users/follow/{alice_id}")), &bob)
    );
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send!(app, authed(TestRequest::get().uri("/api/posts/feed"), &bob));
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], post_id.as_str());
    assert_eq!(items[0]["username"], "alice");
    assert_eq!(items[0]["like_count"], 0);

    let (status, _) = send!(
        app,
        authed(TestRequest::delete().uri(&format!("/api/posts/{post_id}")), &alice)
    );
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send!(app, authed(TestRequest::get().uri("/api/posts/feed"), &bob));
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 0);

    let (status, body) = send!(app, TestRequest::get().uri(&format!("/api/posts/{post_id}")));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "deleted");
}

#[actix_web::test]
async fn test_foreign_post_is_indistinguishable_from_missing() {
    let app = app!();
    let (_, alice) = register!(app, "alice");
    let (_, mallory) = register!(app, "mallory");
    let post_id = create_post!(app, alice, json!({"content": "mine"}));

    let (foreign_status, foreign) = send!(
        app,
        authed(TestRequest::delete().uri(&format!("/api/posts/{post_id}")), &mallory)
    );
    let (missing_status, missing) = send!(
        app,
        authed(
            TestRequest::delete().uri(&format!("/api/posts/{}", uuid::Uuid::new_v4())),
            &mallory
        )
    );

    assert_eq!(foreign_status, StatusCode::NOT_FOUND);
    assert_eq!(missing_status, StatusCode::NOT_FOUND);
    assert_eq!(foreign["detail"], missing["detail"]);
    assert_eq!(foreign["detail"], "Post not found or you're not authorized");

    let (status, _) = send!(
        app,
        authed(TestRequest::patch().uri(&format!("/api/posts/{post_id}")), &mallory)
            .set_json(json!({"content": "hijacked"}))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_partial_update_keeps_other_fields() {
    let app = app!();
    let (_, alice) = register!(app, "alice");
    let post_id = create_post!(
        app,
        alice,
        json!({"content": "original", "media_url": "https://cdn.example.com/a.png"})
    );

    let (status, body) = send!(
        app,
        authed(TestRequest::patch().uri(&format!("/api/posts/{post_id}")), &alice)
            .set_json(json!({"comments_enabled": false}))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "original");
    assert_eq!(body["data"]["media_url"], "https://cdn.example.com/a.png");
    assert_eq!(body["data"]["comments_enabled"], false);
}

#[actix_web::test]
async fn test_update_can_remove_media() {
    let app = app!();
    let (_, alice) = register!(app, "alice");
    let post_id = create_post!(
        app,
        alice,
        json!({"content": "with a picture", "media_url": "https://cdn.example.com/a.png"})
    );
    let uri = format!("/api/posts/{post_id}");

    let (status, _) = send!(
        app,
        authed(TestRequest::patch().uri(&uri), &alice)
            .set_json(json!({"media_url": "https://cdn.example.com/b.png", "remove_media": true}))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send!(
        app,
        authed(TestRequest::patch().uri(&uri), &alice).set_json(json!({"remove_media": true}))
    );
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["media_url"].is_null());
    assert_eq!(body["data"]["content"], "with a picture");

    let (_, body) = send!(app, TestRequest::get().uri(&uri));
    assert!(body["data"]["media_url"].is_null());
}

#[actix_web::test]
async fn test_posts_and_comments_carry_author_names() {
    let app = app!();
    let (alice_id, alice) = register!(app, "alice");
    let (_, bob) = register!(app, "bob");

    let (_, created) = send!(
        app,
        authed(TestRequest::post().uri("/api/posts"), &alice)
            .set_json(json!({"content": "Rust all the way down"}))
    );
    assert_eq!(created["data"]["username"], "alice");
    let post_id = created["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = send!(app, TestRequest::get().uri(&format!("/api/posts/{post_id}")));
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["full_name"], "alice Example");

    let (_, body) = send!(
        app,
        TestRequest::get().uri(&format!("/api/posts/user/{alice_id}"))
    );
    assert_eq!(body["data"]["items"][0]["username"], "alice");

    let (_, body) = send!(app, TestRequest::get().uri("/api/posts/search?q=rust"));
    assert_eq!(body["data"]["items"][0]["full_name"], "alice Example");

    let (status, body) = send!(
        app,
        authed(TestRequest::post().uri(&format!("/api/posts/{post_id}/comments")), &bob)
            .set_json(json!({"content": "agreed"}))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["username"], "bob");

    let (_, body) = send!(
        app,
        TestRequest::get().uri(&format!("/api/posts/{post_id}/comments"))
    );
    assert_eq!(body["data"]["items"][0]["username"], "bob");
    assert_eq!(body["data"]["items"][0]["full_name"], "bob Example");
}

#[actix_web::test]
async fn test_page_number_past_the_end_is_empty() {
    let app = app!();
    let (_, alice) = register!(app, "alice");
    create_post!(app, alice, json!({"content": "only post"}));

    let (status, body) = send!(
        app,
        authed(
            TestRequest::get().uri(&format!("/api/posts/feed?page={}", u64::MAX)),
            &alice
        )
    );
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 0);

    let (status, _) = send!(
        app,
        authed(
            TestRequest::get().uri(&format!("/api/posts/my?offset={}", u64::MAX)),
            &alice
        )
    );
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn test_scheduled_post_is_hidden_from_others_until_published() {
    let app = app!();
    let (alice_id, alice) = register!(app, "alice");
    let (_, bob) = register!(app, "bob");
    let at = Utc::now() + TimeDelta::hours(2);
    let post_id = create_post!(
        app,
        alice,
        json!({"content": "later", "scheduled_at": at.to_rfc3339()})
    );

    let (status, body) = send!(
        app,
        authed(TestRequest::get().uri(&format!("/api/posts/{post_id}")), &alice)
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "pending");

    let (status, _) = send!(
        app,
        authed(TestRequest::get().uri(&format!("/api/posts/{post_id}")), &bob)
    );
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send!(app, authed(TestRequest::get().uri("/api/posts/my"), &alice));
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

    let (_, body) = send!(
        app,
        TestRequest::get().uri(&format!("/api/posts/user/{alice_id}"))
    );
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn test_liking_twice_counts_once() {
    let app = app!();
    let (_, alice) = register!(app, "alice");
    let (_, bob) = register!(app, "bob");
    let post_id = create_post!(app, alice, json!({"content": "like me"}));
    let like_uri = format!("/api/likes/post/{post_id}/like");

    for _ in 0..2 {
        let (status, body) = send!(app, authed(TestRequest::post().uri(&like_uri), &bob));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["like_count"], 1);
    }

    let (_, body) = send!(app, TestRequest::get().uri(&format!("/api/likes/post/{post_id}")));
    assert_eq!(body["data"]["like_count"], 1);

    let (_, body) = send!(app, authed(TestRequest::get().uri("/api/likes/user/me"), &bob));
    assert_eq!(body["data"]["post_ids"][0], post_id.as_str());

    let (_, body) = send!(app, authed(TestRequest::delete().uri(&like_uri), &bob));
    assert_eq!(body["data"]["like_count"], 0);

    let (status, _) = send!(
        app,
        authed(
            TestRequest::post().uri(&format!("/api/likes/post/{}/like", uuid::Uuid::new_v4())),
            &bob
        )
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_follow_guard_rails() {
    let app = app!();
    let (alice_id, alice) = register!(app, "alice");
    let (bob_id, bob) = register!(app, "bob");
    let follow_uri = format!("/api/users/follow/{alice_id}");

    let (status, _) = send!(
        app,
        authed(TestRequest::post().uri(&format!("/api/users/follow/{bob_id}")), &bob)
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send!(
        app,
        authed(
            TestRequest::post().uri(&format!("/api/users/follow/{}", uuid::Uuid::new_v4())),
            &bob
        )
    );
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send!(app, authed(TestRequest::post().uri(&follow_uri), &bob));
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send!(app, authed(TestRequest::post().uri(&follow_uri), &bob));
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send!(app, authed(TestRequest::get().uri("/api/users/follow/stats"), &alice));
    assert_eq!(body["data"]["followers_count"], 1);
    assert_eq!(body["data"]["following_count"], 0);

    let (_, body) = send!(
        app,
        authed(TestRequest::get().uri("/api/users/follow/followers"), &alice)
    );
    assert_eq!(body["data"][0]["username"], "bob");

    let unfollow_uri = format!("/api/users/unfollow/{alice_id}");
    let (status, _) = send!(app, authed(TestRequest::delete().uri(&unfollow_uri), &bob));
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send!(app, authed(TestRequest::delete().uri(&unfollow_uri), &bob));
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_comments_respect_post_setting() {
    let app = app!();
    let (_, alice) = register!(app, "alice");
    let (_, bob) = register!(app, "bob");
    let open = create_post!(app, alice, json!({"content": "talk to me"}));
    let closed = create_post!(app, alice, json!({"content": "quiet", "comments_enabled": false}));

    let (status, body) = send!(
        app,
        authed(TestRequest::post().uri(&format!("/api/posts/{open}/comments")), &bob)
            .set_json(json!({"content": "hi"}))
    );
    assert_eq!(status, StatusCode::CREATED);
    let comment_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send!(
        app,
        authed(TestRequest::post().uri(&format!("/api/posts/{closed}/comments")), &bob)
            .set_json(json!({"content": "hi"}))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send!(
        app,
        authed(TestRequest::delete().uri(&format!("/api/comments/{comment_id}")), &alice)
    );
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send!(
        app,
        TestRequest::get().uri(&format!("/api/posts/{open}/comments?limit=10&offset=0"))
    );
    assert_eq!(body["data"]["items"][0]["content"], "hi");
}

#[actix_web::test]
async fn test_profile_combines_counts_and_recent_posts() {
    let app = app!();
    let (alice_id, alice) = register!(app, "alice");
    create_post!(app, alice, json!({"content": "one"}));
    create_post!(app, alice, json!({"content": "two"}));

    let (status, body) = send!(
        app,
        TestRequest::get().uri(&format!("/api/users/{alice_id}/profile"))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["username"], "alice");
    assert_eq!(body["data"]["recent_posts"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["recent_posts"][0]["content"], "two");
}

#[actix_web::test]
async fn test_auth_routes_are_rate_limited() {
    let app = app!(Some(Arc::new(Budget(AtomicU32::new(2))) as Arc<dyn RateLimiter>));
    let login = || {
        TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"username": "nobody", "password": "password123"}))
    };

    for _ in 0..2 {
        let (status, _) = send!(app, login());
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let resp = test::call_service(&app, login().to_request()).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(resp.headers().get(header::RETRY_AFTER).unwrap(), "42");

    let (status, _) = send!(app, TestRequest::get().uri("/api/health"));
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn test_request_id_is_echoed() {
    let app = app!();
    let req = TestRequest::get()
        .uri("/api/health")
        .insert_header(("x-request-id", "abc-123"))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.headers().get("x-request-id").unwrap(), "abc-123");
}
