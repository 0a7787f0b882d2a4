//! Service behaviour against the in-memory store.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use uuid::Uuid;

use pulse_core::domain::{AuthorPosts, NewPost, Page, PostState, PostUpdate, User};
use pulse_core::ports::{AuthError, FeedRepository, PostRepository};
use pulse_core::services::{
    AccountService, EngagementService, FeedService, FollowService, PostService, Registration,
};
use pulse_core::DomainError;
use pulse_infra::{Argon2PasswordService, InMemoryStore, JwtConfig, JwtTokenService};

struct Harness {
    store: Arc<InMemoryStore>,
    accounts: AccountService,
    posts: PostService,
    feed: FeedService,
    follows: FollowService,
    engagement: EngagementService,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let passwords = Arc::new(Argon2PasswordService::with_params(1024, 1, 1).unwrap());
    let tokens = Arc::new(JwtTokenService::new(JwtConfig {
        secret: "integration-secret".to_string(),
        ..JwtConfig::default()
    }));

    Harness {
        accounts: AccountService::new(store.clone(), passwords, tokens),
        posts: PostService::new(store.clone()),
        feed: FeedService::new(store.clone()),
        follows: FollowService::new(store.clone()),
        engagement: EngagementService::new(store.clone(), store.clone(), store.clone()),
        store,
    }
}

impl Harness {
    async fn user(&self, username: &str) -> User {
        self.accounts
            .register(Registration {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password: "password123".to_string(),
                full_name: format!("{username} Example"),
            })
            .await
            .unwrap()
            .user
    }

    async fn post(&self, author: &User, content: &str) -> Uuid {
        self.posts
            .create_post(author.id, NewPost::new(content))
            .await
            .unwrap()
            .id
    }

    async fn feed_ids(&self, viewer: &User) -> Vec<Uuid> {
        self.feed
            .feed(viewer.id, Page::default())
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.post.id)
            .collect()
    }
}

#[tokio::test]
async fn test_register_login_and_authenticate() {
    let h = harness();
    let alice = h.user("alice").await;

    let session = h.accounts.login("alice", "password123").await.unwrap();
    assert_eq!(session.user.id, alice.id);
    assert_eq!(session.expires_in, 24 * 3600);

    let resolved = h.accounts.authenticate(&session.access_token).await.unwrap();
    assert_eq!(resolved.username, "alice");

    let wrong = h.accounts.login("alice", "nope").await;
    assert!(matches!(
        wrong,
        Err(DomainError::Auth(AuthError::InvalidCredentials))
    ));
    let unknown = h.accounts.login("nobody", "password123").await;
    assert!(matches!(
        unknown,
        Err(DomainError::Auth(AuthError::InvalidCredentials))
    ));
}

#[tokio::test]
async fn test_duplicate_username_and_email_are_rejected() {
    let h = harness();
    h.user("alice").await;

    let same_name = h
        .accounts
        .register(Registration {
            username: "alice".to_string(),
            email: "other@example.com".to_string(),
            password: "password123".to_string(),
            full_name: "Other".to_string(),
        })
        .await;
    assert!(matches!(same_name, Err(DomainError::Duplicate(_))));

    let same_email = h
        .accounts
        .register(Registration {
            username: "alice2".to_string(),
            email: "alice@example.com".to_string(),
            password: "password123".to_string(),
            full_name: "Other".to_string(),
        })
        .await;
    assert!(matches!(same_email, Err(DomainError::Duplicate(_))));
}

#[tokio::test]
async fn test_follow_is_idempotent_and_self_follow_fails() {
    let h = harness();
    let a = h.user("alice").await;
    let b = h.user("bob").await;

    assert!(h.follows.follow(a.id, b.id).await.unwrap());
    assert!(!h.follows.follow(a.id, b.id).await.unwrap());

    let counts = h.follows.counts(a.id).await.unwrap();
    assert_eq!(counts.following_count, 1);
    assert_eq!(counts.followers_count, 0);
    assert_eq!(h.follows.counts(b.id).await.unwrap().followers_count, 1);

    let own = h.follows.follow(a.id, a.id).await;
    assert!(matches!(own, Err(DomainError::InvalidOperation(_))));
    assert!(!h.follows.is_following(a.id, a.id).await.unwrap());
}

#[tokio::test]
async fn test_unfollow_of_absent_edge_is_noop() {
    let h = harness();
    let a = h.user("alice").await;
    let b = h.user("bob").await;

    assert!(!h.follows.unfollow(a.id, b.id).await.unwrap());
    assert!(!h.follows.is_following(a.id, b.id).await.unwrap());
    assert_eq!(h.follows.counts(a.id).await.unwrap().following_count, 0);
}

#[tokio::test]
async fn test_follow_lists_are_summaries() {
    let h = harness();
    let a = h.user("alice").await;
    let b = h.user("bob").await;
    let c = h.user("carol").await;

    h.follows.follow(a.id, c.id).await.unwrap();
    h.follows.follow(a.id, b.id).await.unwrap();
    h.follows.follow(c.id, a.id).await.unwrap();

    let following: Vec<String> = h
        .follows
        .following(a.id)
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.username)
        .collect();
    assert_eq!(following, vec!["bob", "carol"]);

    let followers = h.follows.followers(a.id).await.unwrap();
    assert_eq!(followers.len(), 1);
    assert_eq!(followers[0].id, c.id);
}

#[tokio::test]
async fn test_feed_contains_only_viewer_and_followee_posts() {
    let h = harness();
    let a = h.user("alice").await;
    let b = h.user("bob").await;
    let c = h.user("carol").await;

    let own = h.post(&a, "mine").await;
    let followed = h.post(&b, "from bob").await;
    let stranger = h.post(&c, "from carol").await;

    h.follows.follow(a.id, b.id).await.unwrap();

    let ids = h.feed_ids(&a).await;
    assert!(ids.contains(&own));
    assert!(ids.contains(&followed));
    assert!(!ids.contains(&stranger));

    h.follows.unfollow(a.id, b.id).await.unwrap();

    let ids = h.feed_ids(&a).await;
    assert_eq!(ids, vec![own]);
}

#[tokio::test]
async fn test_feed_items_carry_author_and_counts() {
    let h = harness();
    let a = h.user("alice").await;
    let b = h.user("bob").await;
    let post = h.post(&b, "counted").await;
    h.follows.follow(a.id, b.id).await.unwrap();

    h.engagement.like(a.id, post).await.unwrap();
    h.engagement
        .create_comment(a.id, post, "nice".to_string())
        .await
        .unwrap();

    let feed = h.feed.feed(a.id, Page::default()).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].username, "bob");
    assert_eq!(feed[0].full_name, "bob Example");
    assert_eq!(feed[0].like_count, 1);
    assert_eq!(feed[0].comment_count, 1);
}

#[tokio::test]
async fn test_like_twice_counts_once() {
    let h = harness();
    let a = h.user("alice").await;
    let post = h.post(&a, "likeable").await;

    assert_eq!(h.engagement.like(a.id, post).await.unwrap(), 1);
    assert_eq!(h.engagement.like(a.id, post).await.unwrap(), 1);
    assert!(h.engagement.has_liked(a.id, post).await.unwrap());
    assert_eq!(h.engagement.liked_posts(a.id).await.unwrap(), vec![post]);

    assert_eq!(h.engagement.unlike(a.id, post).await.unwrap(), 0);
    assert_eq!(h.engagement.unlike(a.id, post).await.unwrap(), 0);
    assert_eq!(h.engagement.like_count(post).await.unwrap(), 0);
}

#[tokio::test]
async fn test_like_requires_existing_post() {
    let h = harness();
    let a = h.user("alice").await;

    let missing = h.engagement.like(a.id, Uuid::new_v4()).await;
    assert!(matches!(missing, Err(DomainError::NotFound { .. })));

    let post = h.post(&a, "soon gone").await;
    h.posts.delete_post(post, a.id).await.unwrap();
    let deleted = h.engagement.like(a.id, post).await;
    assert!(matches!(deleted, Err(DomainError::NotFound { .. })));
}

#[tokio::test]
async fn test_non_owner_post_mutation_looks_like_missing_post() {
    let h = harness();
    let owner = h.user("alice").await;
    let other = h.user("mallory").await;
    let post = h.post(&owner, "original").await;

    let update = PostUpdate {
        content: Some("hijacked".to_string()),
        ..Default::default()
    };
    let foreign = h
        .posts
        .update_post(post, other.id, update.clone())
        .await
        .unwrap_err();
    let missing = h
        .posts
        .update_post(Uuid::new_v4(), other.id, update)
        .await
        .unwrap_err();
    assert_eq!(foreign.to_string(), missing.to_string());
    assert!(matches!(foreign, DomainError::NotFoundOrForbidden { .. }));

    let foreign = h.posts.delete_post(post, other.id).await.unwrap_err();
    let missing = h.posts.delete_post(Uuid::new_v4(), other.id).await.unwrap_err();
    assert_eq!(foreign.to_string(), missing.to_string());

    let untouched = h.posts.get_post(post).await.unwrap().post;
    assert_eq!(untouched.content, "original");
    assert!(!untouched.is_deleted);
}

#[tokio::test]
async fn test_update_applies_only_supplied_fields() {
    let h = harness();
    let a = h.user("alice").await;
    let post = h
        .posts
        .create_post(a.id, NewPost::new("draft").with_media("https://img/x.png"))
        .await
        .unwrap();

    let updated = h
        .posts
        .update_post(
            post.id,
            a.id,
            PostUpdate {
                content: Some("final".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.content, "final");
    assert_eq!(updated.media_url.as_deref(), Some("https://img/x.png"));
    assert!(updated.updated_at.is_some());

    let cleared = h
        .posts
        .update_post(
            post.id,
            a.id,
            PostUpdate {
                media_url: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.media_url, None);
    assert_eq!(cleared.content, "final");

    let empty = h.posts.update_post(post.id, a.id, PostUpdate::default()).await;
    assert!(matches!(empty, Err(DomainError::Validation(_))));
}

#[tokio::test]
async fn test_deleted_post_cannot_be_updated() {
    let h = harness();
    let a = h.user("alice").await;
    let post = h.post(&a, "bye").await;
    h.posts.delete_post(post, a.id).await.unwrap();

    let result = h
        .posts
        .update_post(
            post,
            a.id,
            PostUpdate {
                comments_enabled: Some(false),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(DomainError::NotFoundOrForbidden { .. })));
}

#[tokio::test]
async fn test_deleting_twice_reports_missing_post() {
    let h = harness();
    let a = h.user("alice").await;
    let post = h.post(&a, "once").await;

    h.posts.delete_post(post, a.id).await.unwrap();
    let again = h.posts.delete_post(post, a.id).await;

    assert!(matches!(again, Err(DomainError::NotFoundOrForbidden { .. })));
    assert!(h.posts.get_post(post).await.unwrap().post.is_deleted);
}

#[tokio::test]
async fn test_create_follow_delete_scenario() {
    let h = harness();
    let a = h.user("alice").await;
    let b = h.user("bob").await;

    h.follows.follow(a.id, b.id).await.unwrap();
    let post = h.post(&b, "hello followers").await;
    assert_eq!(h.feed_ids(&a).await, vec![post]);

    h.posts.delete_post(post, b.id).await.unwrap();

    assert!(h.feed_ids(&a).await.is_empty());
    let resolved = h.posts.get_post(post).await.unwrap().post;
    assert!(resolved.is_deleted);
    assert_eq!(resolved.state_at(Utc::now()), PostState::Deleted);
}

#[tokio::test]
async fn test_scheduled_post_appears_exactly_once_after_sweep() {
    let h = harness();
    let a = h.user("alice").await;
    let b = h.user("bob").await;
    h.follows.follow(a.id, b.id).await.unwrap();

    let at = Utc::now() + TimeDelta::hours(1);
    let post = h
        .posts
        .create_post(b.id, NewPost::new("from the future").scheduled_for(at))
        .await
        .unwrap();
    assert!(!post.is_published);
    assert!(h.feed_ids(&a).await.is_empty());

    // The author still sees their pending post.
    let own = h
        .posts
        .posts_by_author(b.id, AuthorPosts::Own, Page::default())
        .await
        .unwrap();
    assert_eq!(own.len(), 1);

    let later = at + TimeDelta::minutes(1);
    let before_sweep = h.store.feed(a.id, Page::default(), later).await.unwrap();
    assert!(before_sweep.is_empty());

    assert_eq!(h.store.publish_due(later).await.unwrap(), vec![post.id]);
    assert!(h.store.publish_due(later).await.unwrap().is_empty());

    let after_sweep = h.store.feed(a.id, Page::default(), later).await.unwrap();
    let ids: Vec<Uuid> = after_sweep.into_iter().map(|i| i.post.id).collect();
    assert_eq!(ids, vec![post.id]);
}

#[tokio::test]
async fn test_sweep_never_publishes_deleted_post() {
    let h = harness();
    let a = h.user("alice").await;

    let at = Utc::now() + TimeDelta::hours(1);
    let post = h
        .posts
        .create_post(a.id, NewPost::new("cancelled").scheduled_for(at))
        .await
        .unwrap();
    h.posts.delete_post(post.id, a.id).await.unwrap();

    let later = at + TimeDelta::hours(1);
    assert!(h.store.publish_due(later).await.unwrap().is_empty());
    assert!(h.store.feed(a.id, Page::default(), later).await.unwrap().is_empty());
    assert!(h.posts.get_post(post.id).await.unwrap().post.is_deleted);
}

#[tokio::test]
async fn test_author_pages_are_disjoint_and_newest_first() {
    let h = harness();
    let a = h.user("alice").await;
    for i in 0..5 {
        h.post(&a, &format!("post {i}")).await;
    }

    let mut seen = Vec::new();
    for number in 1..=3 {
        let page = h
            .posts
            .posts_by_author(a.id, AuthorPosts::Visible, Page::numbered(number, 2))
            .await
            .unwrap();
        seen.extend(page.into_iter().map(|authored| authored.post));
    }

    assert_eq!(seen.len(), 5);
    let mut ids: Vec<Uuid> = seen.iter().map(|p| p.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 5);
    assert!(
        seen.windows(2)
            .all(|w| (w[0].created_at, w[0].id) > (w[1].created_at, w[1].id))
    );
}

#[tokio::test]
async fn test_comments_respect_post_settings_and_ownership() {
    let h = harness();
    let a = h.user("alice").await;
    let b = h.user("bob").await;

    let closed = h
        .posts
        .create_post(a.id, NewPost::new("quiet please").without_comments())
        .await
        .unwrap();
    let rejected = h
        .engagement
        .create_comment(b.id, closed.id, "hi".to_string())
        .await;
    assert!(matches!(rejected, Err(DomainError::InvalidOperation(_))));

    let open = h.post(&a, "talk to me").await;
    let first = h
        .engagement
        .create_comment(b.id, open, "first".to_string())
        .await
        .unwrap();
    h.engagement
        .create_comment(a.id, open, "second".to_string())
        .await
        .unwrap();

    let foreign = h
        .engagement
        .update_comment(first.id, a.id, "edited")
        .await
        .unwrap_err();
    let missing = h
        .engagement
        .update_comment(Uuid::new_v4(), a.id, "edited")
        .await
        .unwrap_err();
    assert_eq!(foreign.to_string(), missing.to_string());

    let edited = h
        .engagement
        .update_comment(first.id, b.id, "first, edited")
        .await
        .unwrap();
    assert_eq!(edited.content, "first, edited");

    let listed = h
        .engagement
        .comments_for_post(open, Page::default())
        .await
        .unwrap();
    let contents: Vec<&str> = listed.iter().map(|c| c.comment.content.as_str()).collect();
    assert_eq!(contents, vec!["first, edited", "second"]);
    let authors: Vec<&str> = listed.iter().map(|c| c.author.username.as_str()).collect();
    assert_eq!(authors, vec!["bob", "alice"]);

    assert!(h.engagement.delete_comment(first.id, a.id).await.is_err());
    h.engagement.delete_comment(first.id, b.id).await.unwrap();
    assert_eq!(
        h.engagement
            .comments_for_post(open, Page::default())
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_search_finds_visible_posts_and_users() {
    let h = harness();
    let a = h.user("alice").await;
    let hit = h.post(&a, "Learning Rust today").await;
    h.post(&a, "something else").await;
    h.posts
        .create_post(
            a.id,
            NewPost::new("rust in the future").scheduled_for(Utc::now() + TimeDelta::days(1)),
        )
        .await
        .unwrap();

    let found = h.posts.search_posts("RUST", Page::default()).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].post.id, hit);
    assert_eq!(found[0].author.username, "alice");
    assert_eq!(found[0].author.id, a.id);

    let blank = h.posts.search_posts("  ", Page::default()).await;
    assert!(matches!(blank, Err(DomainError::Validation(_))));

    h.user("alicia").await;
    h.user("bob").await;
    let users: Vec<String> = h
        .accounts
        .search_users("ALI")
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.username)
        .collect();
    assert_eq!(users, vec!["alice", "alicia"]);
}
