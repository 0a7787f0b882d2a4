use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AuthorPosts, AuthoredComment, AuthoredPost, Comment, FeedItem, Page, Post, PostUpdate, User,
    UserSummary,
};
use crate::error::RepoError;

/// User repository.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails with [`RepoError::Constraint`] when the
    /// username or email is already taken.
    async fn create(&self, user: User) -> Result<User, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Case-insensitive substring match on username or full name.
    async fn search(&self, query: &str, limit: u64) -> Result<Vec<UserSummary>, RepoError>;
}

/// Post repository. Posts are never physically removed.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: Post) -> Result<Post, RepoError>;

    /// Fetch a post regardless of its lifecycle state.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError>;

    /// Like [`find_by_id`](Self::find_by_id), joined with the author.
    async fn find_authored(&self, id: Uuid) -> Result<Option<AuthoredPost>, RepoError>;

    /// An author's posts, newest first.
    async fn find_by_author(
        &self,
        author_id: Uuid,
        scope: AuthorPosts,
        page: Page,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<AuthoredPost>, RepoError>;

    /// Apply `update` to a non-deleted post owned by `author_id`.
    /// Returns `None` when no such post exists.
    async fn update_owned(
        &self,
        id: Uuid,
        author_id: Uuid,
        update: &PostUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Post>, RepoError>;

    /// Set the deleted flag on a non-deleted post owned by `author_id`.
    /// Returns `false` when no such post exists.
    async fn soft_delete_owned(&self, id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;

    /// Visible posts whose content contains `query`, newest first.
    async fn search(
        &self,
        query: &str,
        page: Page,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<AuthoredPost>, RepoError>;

    /// Publish every non-deleted, unpublished post whose schedule matured by
    /// `as_of`, in one conditional update. Returns the published ids.
    async fn publish_due(&self, as_of: DateTime<Utc>) -> Result<Vec<Uuid>, RepoError>;
}

/// Read model joining posts, follows and engagement counts.
#[async_trait]
pub trait FeedRepository: Send + Sync {
    /// Visible posts by `viewer` or anyone `viewer` follows, newest first.
    async fn feed(
        &self,
        viewer: Uuid,
        page: Page,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<FeedItem>, RepoError>;
}

/// Directed follow edges.
#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Insert the edge unless present. Returns whether a row was written.
    async fn insert(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool, RepoError>;

    /// Remove the edge if present. Returns whether a row was removed.
    async fn delete(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool, RepoError>;

    async fn exists(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool, RepoError>;

    /// Users followed by `user_id`.
    async fn following(&self, user_id: Uuid) -> Result<Vec<UserSummary>, RepoError>;

    /// Users following `user_id`.
    async fn followers(&self, user_id: Uuid) -> Result<Vec<UserSummary>, RepoError>;

    async fn count_following(&self, user_id: Uuid) -> Result<u64, RepoError>;

    async fn count_followers(&self, user_id: Uuid) -> Result<u64, RepoError>;
}

/// Likes keyed by (user, post).
#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Insert the like unless present. Returns whether a row was written.
    async fn insert(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError>;

    async fn delete(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError>;

    async fn exists(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError>;

    async fn count_for_post(&self, post_id: Uuid) -> Result<u64, RepoError>;

    /// Ids of posts liked by `user_id`, most recent like first.
    async fn posts_liked_by(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError>;
}

/// Comment repository.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: Comment) -> Result<Comment, RepoError>;

    /// Replace the content of a comment owned by `author_id`.
    /// Returns `None` when no such comment exists.
    async fn update_owned(
        &self,
        id: Uuid,
        author_id: Uuid,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Comment>, RepoError>;

    /// Delete a comment owned by `author_id`. Returns `false` when no such comment exists.
    async fn delete_owned(&self, id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;

    /// Comments on a post with their authors, oldest first.
    async fn list_for_post(
        &self,
        post_id: Uuid,
        page: Page,
    ) -> Result<Vec<AuthoredComment>, RepoError>;
}
