//! In-memory store - used when no database is configured, and in tests.
//!
//! Mirrors the semantics of the PostgreSQL repositories: unique keys for
//! users, follows and likes, conditional updates for ownership checks, and
//! the same visibility predicate for feeds and listings.
//! Note: Data is lost on process restart.

use std::cmp::Reverse;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use pulse_core::domain::{
    AuthorPosts, AuthoredComment, AuthoredPost, Comment, FeedItem, Page, Post, PostUpdate, User,
    UserSummary,
};
use pulse_core::error::RepoError;
use pulse_core::ports::{
    CommentRepository, FeedRepository, FollowRepository, LikeRepository, PostRepository,
    UserRepository,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
    /// (follower, followee) -> created_at
    follows: HashMap<(Uuid, Uuid), DateTime<Utc>>,
    /// (user, post) -> created_at
    likes: HashMap<(Uuid, Uuid), DateTime<Utc>>,
    comments: HashMap<Uuid, Comment>,
}

impl Tables {
    fn summaries<'a>(&self, ids: impl Iterator<Item = &'a Uuid>) -> Vec<UserSummary> {
        let mut users: Vec<UserSummary> = ids
            .filter_map(|id| self.users.get(id))
            .map(User::summary)
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users
    }

    /// Attach the author, as the SQL join would. Posts by unknown users drop out.
    fn authored(&self, post: Post) -> Option<AuthoredPost> {
        let author = self.users.get(&post.user_id)?.summary();
        Some(AuthoredPost { post, author })
    }
}

/// Newest first, ties broken by id so pages are stable.
fn newest_first(posts: &mut [Post]) {
    posts.sort_by_key(|p| Reverse((p.created_at, p.id)));
}

fn paginate<T>(items: Vec<T>, page: Page) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}

/// In-memory implementation of every repository port.
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken {
            return Err(RepoError::Constraint(
                "username or email already exists".to_string(),
            ));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn search(&self, query: &str, limit: u64) -> Result<Vec<UserSummary>, RepoError> {
        let needle = query.to_lowercase();
        let tables = self.tables.read().await;
        let matches = tables.users.values().filter(|u| {
            u.username.to_lowercase().contains(&needle)
                || u.full_name.to_lowercase().contains(&needle)
        });
        let mut users: Vec<UserSummary> = matches.map(User::summary).collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users.truncate(limit as usize);
        Ok(users)
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn create(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&post.user_id) {
            return Err(RepoError::Constraint("author does not exist".to_string()));
        }
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn find_authored(&self, id: Uuid) -> Result<Option<AuthoredPost>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.get(&id).cloned().and_then(|p| tables.authored(p)))
    }

    async fn find_by_author(
        &self,
        author_id: Uuid,
        scope: AuthorPosts,
        page: Page,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<AuthoredPost>, RepoError> {
        let tables = self.tables.read().await;
        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|p| p.user_id == author_id && !p.is_deleted)
            .filter(|p| scope == AuthorPosts::Own || p.is_visible_at(as_of))
            .cloned()
            .collect();
        newest_first(&mut posts);
        Ok(paginate(posts, page)
            .into_iter()
            .filter_map(|p| tables.authored(p))
            .collect())
    }

    async fn update_owned(
        &self,
        id: Uuid,
        author_id: Uuid,
        update: &PostUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Post>, RepoError> {
        let mut tables = self.tables.write().await;
        match tables.posts.get_mut(&id) {
            Some(post) if post.is_owned_by(author_id) && !post.is_deleted => {
                post.apply(update, now);
                Ok(Some(post.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn soft_delete_owned(&self, id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        match tables.posts.get_mut(&id) {
            Some(post) if post.is_owned_by(author_id) && !post.is_deleted => {
                post.is_deleted = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn search(
        &self,
        query: &str,
        page: Page,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<AuthoredPost>, RepoError> {
        let needle = query.to_lowercase();
        let tables = self.tables.read().await;
        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|p| p.is_visible_at(as_of) && p.content.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        newest_first(&mut posts);
        Ok(paginate(posts, page)
            .into_iter()
            .filter_map(|p| tables.authored(p))
            .collect())
    }

    async fn publish_due(&self, as_of: DateTime<Utc>) -> Result<Vec<Uuid>, RepoError> {
        let mut tables = self.tables.write().await;
        let mut published = Vec::new();
        for post in tables.posts.values_mut().filter(|p| p.is_due(as_of)) {
            post.is_published = true;
            published.push(post.id);
        }
        Ok(published)
    }
}

#[async_trait]
impl FeedRepository for InMemoryStore {
    async fn feed(
        &self,
        viewer: Uuid,
        page: Page,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<FeedItem>, RepoError> {
        let tables = self.tables.read().await;
        let in_feed = |author: Uuid| author == viewer || tables.follows.contains_key(&(viewer, author));

        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|p| in_feed(p.user_id) && p.is_visible_at(as_of))
            .cloned()
            .collect();
        newest_first(&mut posts);

        let items = paginate(posts, page)
            .into_iter()
            .filter_map(|post| {
                let author = tables.users.get(&post.user_id)?;
                let like_count = tables.likes.keys().filter(|(_, p)| *p == post.id).count();
                let comment_count = tables
                    .comments
                    .values()
                    .filter(|c| c.post_id == post.id)
                    .count();
                Some(FeedItem {
                    username: author.username.clone(),
                    full_name: author.full_name.clone(),
                    like_count: like_count as i64,
                    comment_count: comment_count as i64,
                    post,
                })
            })
            .collect();
        Ok(items)
    }
}

#[async_trait]
impl FollowRepository for InMemoryStore {
    async fn insert(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        if follower_id == followee_id {
            return Err(RepoError::Constraint("follows_no_self_follow".to_string()));
        }
        if !tables.users.contains_key(&followee_id) {
            return Err(RepoError::Constraint("followee does not exist".to_string()));
        }
        let key = (follower_id, followee_id);
        if tables.follows.contains_key(&key) {
            return Ok(false);
        }
        tables.follows.insert(key, Utc::now());
        Ok(true)
    }

    async fn delete(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        Ok(tables.follows.remove(&(follower_id, followee_id)).is_some())
    }

    async fn exists(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.follows.contains_key(&(follower_id, followee_id)))
    }

    async fn following(&self, user_id: Uuid) -> Result<Vec<UserSummary>, RepoError> {
        let tables = self.tables.read().await;
        let ids = tables
            .follows
            .keys()
            .filter(|(follower, _)| *follower == user_id)
            .map(|(_, followee)| followee);
        Ok(tables.summaries(ids))
    }

    async fn followers(&self, user_id: Uuid) -> Result<Vec<UserSummary>, RepoError> {
        let tables = self.tables.read().await;
        let ids = tables
            .follows
            .keys()
            .filter(|(_, followee)| *followee == user_id)
            .map(|(follower, _)| follower);
        Ok(tables.summaries(ids))
    }

    async fn count_following(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.follows.keys().filter(|(f, _)| *f == user_id).count() as u64)
    }

    async fn count_followers(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.follows.keys().filter(|(_, f)| *f == user_id).count() as u64)
    }
}

#[async_trait]
impl LikeRepository for InMemoryStore {
    async fn insert(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&post_id) {
            return Err(RepoError::Constraint("post does not exist".to_string()));
        }
        let key = (user_id, post_id);
        if tables.likes.contains_key(&key) {
            return Ok(false);
        }
        tables.likes.insert(key, Utc::now());
        Ok(true)
    }

    async fn delete(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        Ok(tables.likes.remove(&(user_id, post_id)).is_some())
    }

    async fn exists(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.likes.contains_key(&(user_id, post_id)))
    }

    async fn count_for_post(&self, post_id: Uuid) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.likes.keys().filter(|(_, p)| *p == post_id).count() as u64)
    }

    async fn posts_liked_by(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        let tables = self.tables.read().await;
        let mut liked: Vec<(DateTime<Utc>, Uuid)> = tables
            .likes
            .iter()
            .filter(|((user, _), _)| *user == user_id)
            .map(|((_, post), at)| (*at, *post))
            .collect();
        liked.sort_by_key(|entry| Reverse(*entry));
        Ok(liked.into_iter().map(|(_, post)| post).collect())
    }
}

#[async_trait]
impl CommentRepository for InMemoryStore {
    async fn create(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(RepoError::Constraint("post does not exist".to_string()));
        }
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update_owned(
        &self,
        id: Uuid,
        author_id: Uuid,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Comment>, RepoError> {
        let mut tables = self.tables.write().await;
        match tables.comments.get_mut(&id) {
            Some(comment) if comment.user_id == author_id => {
                comment.content = content.to_string();
                comment.updated_at = Some(now);
                Ok(Some(comment.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_owned(&self, id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .comments
            .get(&id)
            .is_some_and(|comment| comment.user_id == author_id);
        if owned {
            tables.comments.remove(&id);
        }
        Ok(owned)
    }

    async fn list_for_post(
        &self,
        post_id: Uuid,
        page: Page,
    ) -> Result<Vec<AuthoredComment>, RepoError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.id));

        Ok(paginate(comments, page)
            .into_iter()
            .filter_map(|comment| {
                let author = tables.users.get(&comment.user_id)?.summary();
                Some(AuthoredComment { comment, author })
            })
            .collect())
    }
}
